//! Cart service.
//!
//! Every write reloads the cart and publishes it to the user's feed, so
//! subscribers always hold the full current cart.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::instrument;

use furnish_core::{ProductId, UserId};

use super::{CatalogService, Feed, RecordError};
use crate::db::CartStore;
use crate::models::{Cart, ValidationError};

#[derive(Clone)]
pub struct CartService {
    carts: Arc<dyn CartStore>,
    catalog: CatalogService,
    feed: Feed<Cart>,
}

impl CartService {
    #[must_use]
    pub fn new(carts: Arc<dyn CartStore>, catalog: CatalogService) -> Self {
        Self {
            carts,
            catalog,
            feed: Feed::new(),
        }
    }

    /// The user's cart resolved against the catalog.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::Repository` if a store cannot be read.
    pub async fn snapshot(&self, user: UserId) -> Result<Cart, RecordError> {
        let lines = self.carts.lines(user).await?;
        let products = self.catalog.products().await?;
        Ok(Cart::resolve(&lines, &products))
    }

    /// Sum of quantities in the cart.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::Repository` if a store cannot be read.
    pub async fn item_count(&self, user: UserId) -> Result<u32, RecordError> {
        Ok(self.snapshot(user).await?.item_count)
    }

    /// Add `quantity` of a product, on top of any already in the cart.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::Validation` for a zero quantity and
    /// `RecordError::NotFound` for an unknown product.
    #[instrument(skip(self))]
    pub async fn add(
        &self,
        user: UserId,
        product: ProductId,
        quantity: u32,
    ) -> Result<Cart, RecordError> {
        if quantity == 0 {
            return Err(ValidationError::Invalid("quantity must be at least 1".to_owned()).into());
        }
        if self.catalog.product(product).await?.is_none() {
            return Err(RecordError::NotFound);
        }

        self.carts.add(user, product, quantity).await?;
        self.publish(user).await
    }

    /// Set a line's quantity. Zero or less removes the line.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::NotFound` for an unknown product.
    #[instrument(skip(self))]
    pub async fn set_quantity(
        &self,
        user: UserId,
        product: ProductId,
        quantity: i64,
    ) -> Result<Cart, RecordError> {
        if quantity <= 0 {
            self.carts.remove(user, product).await?;
            return self.publish(user).await;
        }

        let quantity = u32::try_from(quantity).map_err(|_| {
            ValidationError::Invalid(format!("quantity {quantity} is too large"))
        })?;
        if self.catalog.product(product).await?.is_none() {
            return Err(RecordError::NotFound);
        }
        self.carts.set_quantity(user, product, quantity).await?;
        self.publish(user).await
    }

    /// # Errors
    ///
    /// Returns `RecordError::Repository` if the store fails.
    pub async fn remove(&self, user: UserId, product: ProductId) -> Result<Cart, RecordError> {
        self.carts.remove(user, product).await?;
        self.publish(user).await
    }

    /// # Errors
    ///
    /// Returns `RecordError::Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn clear(&self, user: UserId) -> Result<Cart, RecordError> {
        self.carts.clear(user).await?;
        self.publish(user).await
    }

    /// Watch the user's cart. The receiver starts with the current cart.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::Repository` if the cart cannot be loaded.
    pub async fn subscribe(&self, user: UserId) -> Result<watch::Receiver<Arc<Cart>>, RecordError> {
        let current = self.snapshot(user).await?;
        Ok(self.feed.subscribe(user, current))
    }

    async fn publish(&self, user: UserId) -> Result<Cart, RecordError> {
        let cart = self.snapshot(user).await?;
        self.feed.publish(user, cart.clone());
        Ok(cart)
    }
}
