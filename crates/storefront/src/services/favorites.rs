//! Favorites service.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::instrument;

use furnish_core::{ProductId, UserId};

use super::{CatalogService, Feed, RecordError};
use crate::db::FavoriteStore;
use crate::models::Product;

/// A user's favorite products, most recent first, with a change feed.
#[derive(Clone)]
pub struct FavoriteService {
    favorites: Arc<dyn FavoriteStore>,
    catalog: CatalogService,
    feed: Feed<Vec<Product>>,
}

impl FavoriteService {
    #[must_use]
    pub fn new(favorites: Arc<dyn FavoriteStore>, catalog: CatalogService) -> Self {
        Self {
            favorites,
            catalog,
            feed: Feed::new(),
        }
    }

    /// Favorite products, skipping any no longer in the catalog.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::Repository` if a store cannot be read.
    pub async fn list(&self, user: UserId) -> Result<Vec<Product>, RecordError> {
        let ids = self.favorites.product_ids(user).await?;
        let products = self.catalog.products().await?;
        let by_id: HashMap<ProductId, &Product> = products.iter().map(|p| (p.id, p)).collect();

        Ok(ids
            .iter()
            .filter_map(|id| by_id.get(id).map(|p| (*p).clone()))
            .collect())
    }

    /// # Errors
    ///
    /// Returns `RecordError::Repository` if the store cannot be read.
    pub async fn contains(&self, user: UserId, product: ProductId) -> Result<bool, RecordError> {
        Ok(self.favorites.product_ids(user).await?.contains(&product))
    }

    /// Flip a product in or out of favorites. Returns the new state.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::NotFound` when adding an unknown product.
    #[instrument(skip(self))]
    pub async fn toggle(&self, user: UserId, product: ProductId) -> Result<bool, RecordError> {
        let now_favorite = self.favorites.toggle(user, product).await?;
        self.publish(user).await?;
        Ok(now_favorite)
    }

    /// # Errors
    ///
    /// Returns `RecordError::Repository` if the store fails.
    pub async fn remove(&self, user: UserId, product: ProductId) -> Result<(), RecordError> {
        self.favorites.remove(user, product).await?;
        self.publish(user).await
    }

    /// Watch the user's favorites. The receiver starts with the current list.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::Repository` if the list cannot be loaded.
    pub async fn subscribe(
        &self,
        user: UserId,
    ) -> Result<watch::Receiver<Arc<Vec<Product>>>, RecordError> {
        let current = self.list(user).await?;
        Ok(self.feed.subscribe(user, current))
    }

    async fn publish(&self, user: UserId) -> Result<(), RecordError> {
        let current = self.list(user).await?;
        self.feed.publish(user, current);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::db::{MemoryStore, ProductStore, UserStore};
    use crate::models::{NewCategory, NewProduct};

    async fn setup() -> (FavoriteService, UserId, Vec<ProductId>) {
        let store = Arc::new(MemoryStore::new());
        let user = store
            .create_with_password(
                &furnish_core::Email::parse("ada@example.com").unwrap(),
                "Ada",
                "hash",
            )
            .await
            .unwrap();
        store
            .upsert_category(&NewCategory {
                handle: "lighting".to_owned(),
                name: "Lighting".to_owned(),
                image: None,
            })
            .await
            .unwrap();

        let mut ids = Vec::new();
        for handle in ["hektar", "ranarp"] {
            let product = store
                .upsert_product(&NewProduct {
                    handle: handle.to_owned(),
                    name: handle.to_uppercase(),
                    description: "Lamp".to_owned(),
                    price: Decimal::new(2999, 2),
                    category: "lighting".to_owned(),
                    image: None,
                    ar_model: None,
                    in_stock: true,
                })
                .await
                .unwrap();
            ids.push(product.id);
        }

        let service = FavoriteService::new(store.clone(), CatalogService::new(store));
        (service, user.id, ids)
    }

    #[tokio::test]
    async fn test_toggle_twice_restores_state() {
        let (favorites, user, ids) = setup().await;
        assert!(favorites.toggle(user, ids[0]).await.unwrap());
        assert!(favorites.contains(user, ids[0]).await.unwrap());
        assert!(!favorites.toggle(user, ids[0]).await.unwrap());
        assert!(!favorites.contains(user, ids[0]).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_is_most_recent_first() {
        let (favorites, user, ids) = setup().await;
        favorites.toggle(user, ids[0]).await.unwrap();
        favorites.toggle(user, ids[1]).await.unwrap();
        let listed: Vec<ProductId> = favorites
            .list(user)
            .await
            .unwrap()
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(listed, vec![ids[1], ids[0]]);
    }

    #[tokio::test]
    async fn test_toggle_unknown_product() {
        let (favorites, user, _) = setup().await;
        assert!(matches!(
            favorites.toggle(user, ProductId::new(404)).await,
            Err(RecordError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_feed_receives_updates() {
        let (favorites, user, ids) = setup().await;
        let mut rx = favorites.subscribe(user).await.unwrap();
        favorites.toggle(user, ids[1]).await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().len(), 1);
    }
}
