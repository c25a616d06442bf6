//! Address book service.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::instrument;

use furnish_core::{AddressId, UserId};

use super::{Feed, RecordError};
use crate::db::AddressStore;
use crate::models::{Address, AddressInput};

/// Validates address forms and keeps subscribers in sync with the book.
#[derive(Clone)]
pub struct AddressService {
    addresses: Arc<dyn AddressStore>,
    feed: Feed<Vec<Address>>,
}

impl AddressService {
    #[must_use]
    pub fn new(addresses: Arc<dyn AddressStore>) -> Self {
        Self {
            addresses,
            feed: Feed::new(),
        }
    }

    /// # Errors
    ///
    /// Returns `RecordError::Repository` if the store cannot be read.
    pub async fn list(&self, user: UserId) -> Result<Vec<Address>, RecordError> {
        Ok(self.addresses.list(user).await?)
    }

    /// # Errors
    ///
    /// Returns `RecordError::NotFound` if the user has no such address.
    pub async fn get(&self, user: UserId, id: AddressId) -> Result<Address, RecordError> {
        self.addresses
            .get(user, id)
            .await?
            .ok_or(RecordError::NotFound)
    }

    /// The default address, or the first one if none is flagged.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::Repository` if the store cannot be read.
    pub async fn preferred(&self, user: UserId) -> Result<Option<Address>, RecordError> {
        let addresses = self.list(user).await?;
        Ok(addresses
            .iter()
            .find(|a| a.is_default)
            .or_else(|| addresses.first())
            .cloned())
    }

    /// # Errors
    ///
    /// Returns `RecordError::Validation` if the form is invalid.
    #[instrument(skip(self, input))]
    pub async fn add(&self, user: UserId, input: AddressInput) -> Result<Address, RecordError> {
        let draft = input.validate()?;
        let address = self.addresses.insert(user, &draft).await?;
        tracing::info!(address_id = %address.id, is_default = address.is_default, "address added");
        self.publish(user).await?;
        Ok(address)
    }

    /// # Errors
    ///
    /// Returns `RecordError::Validation` if the form is invalid and
    /// `RecordError::NotFound` if the user has no such address.
    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        user: UserId,
        id: AddressId,
        input: AddressInput,
    ) -> Result<Address, RecordError> {
        let draft = input.validate()?;
        let address = self.addresses.update(user, id, &draft).await?;
        self.publish(user).await?;
        Ok(address)
    }

    /// # Errors
    ///
    /// Returns `RecordError::NotFound` if the user has no such address.
    #[instrument(skip(self))]
    pub async fn delete(&self, user: UserId, id: AddressId) -> Result<(), RecordError> {
        self.addresses.delete(user, id).await?;
        self.publish(user).await
    }

    /// # Errors
    ///
    /// Returns `RecordError::NotFound` if the user has no such address.
    #[instrument(skip(self))]
    pub async fn set_default(&self, user: UserId, id: AddressId) -> Result<(), RecordError> {
        self.addresses.set_default(user, id).await?;
        self.publish(user).await
    }

    /// Watch the address book. The receiver starts with the current list.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::Repository` if the list cannot be loaded.
    pub async fn subscribe(
        &self,
        user: UserId,
    ) -> Result<watch::Receiver<Arc<Vec<Address>>>, RecordError> {
        let current = self.list(user).await?;
        Ok(self.feed.subscribe(user, current))
    }

    async fn publish(&self, user: UserId) -> Result<(), RecordError> {
        let current = self.list(user).await?;
        self.feed.publish(user, current);
        Ok(())
    }
}
