//! Catalog browsing and search.
//!
//! The full product list is cached with `moka` (5 minute TTL) so search and
//! cart resolution do not hit the store on every request.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, instrument};

use furnish_core::{CategoryId, ProductId};

use crate::db::{ProductStore, RepositoryError};
use crate::models::{Category, Product};
use crate::search::{self, FilterState, SearchResults};

/// Read-side access to categories and products.
#[derive(Clone)]
pub struct CatalogService {
    inner: Arc<CatalogServiceInner>,
}

struct CatalogServiceInner {
    products: Arc<dyn ProductStore>,
    cache: Cache<(), Arc<Vec<Product>>>,
}

impl CatalogService {
    #[must_use]
    pub fn new(products: Arc<dyn ProductStore>) -> Self {
        let cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self {
            inner: Arc::new(CatalogServiceInner { products, cache }),
        }
    }

    /// Every product, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be read.
    pub async fn products(&self) -> Result<Arc<Vec<Product>>, RepositoryError> {
        if let Some(cached) = self.inner.cache.get(&()).await {
            return Ok(cached);
        }

        let products = Arc::new(self.inner.products.products().await?);
        debug!(count = products.len(), "Loaded product catalog");
        self.inner.cache.insert((), Arc::clone(&products)).await;
        Ok(products)
    }

    /// Drop the cached product list.
    pub async fn invalidate(&self) {
        self.inner.cache.invalidate(&()).await;
    }

    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be read.
    pub async fn categories(&self) -> Result<Vec<Category>, RepositoryError> {
        self.inner.products.categories().await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be read.
    pub async fn product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.products().await?.iter().find(|p| p.id == id).cloned())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be read.
    pub async fn product_by_handle(&self, handle: &str) -> Result<Option<Product>, RepositoryError> {
        self.inner.products.product_by_handle(handle).await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be read.
    pub async fn products_in_category(
        &self,
        category: CategoryId,
    ) -> Result<Vec<Product>, RepositoryError> {
        self.inner.products.products_in_category(category).await
    }

    /// Products in a category looked up by handle, or `None` if there is no
    /// such category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be read.
    pub async fn category_products(
        &self,
        handle: &str,
    ) -> Result<Option<(Category, Vec<Product>)>, RepositoryError> {
        let Some(category) = self
            .categories()
            .await?
            .into_iter()
            .find(|c| c.handle == handle)
        else {
            return Ok(None);
        };
        let products = self.products_in_category(category.id).await?;
        Ok(Some((category, products)))
    }

    /// Substring search with filters over the whole catalog.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be read.
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        query: &str,
        filters: &FilterState,
    ) -> Result<SearchResults, RepositoryError> {
        let products = self.products().await?;
        Ok(search::search(&products, query, filters))
    }
}
