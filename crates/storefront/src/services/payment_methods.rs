//! Saved card service.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tracing::instrument;

use furnish_core::{PaymentMethodId, UserId};

use super::{Feed, RecordError};
use crate::db::{AddressStore, PaymentMethodStore};
use crate::models::{PaymentMethod, PaymentMethodDraft, PaymentMethodInput, ValidationError};

/// Validates card forms, checks billing address ownership and keeps
/// subscribers in sync with the saved cards.
#[derive(Clone)]
pub struct PaymentMethodService {
    payment_methods: Arc<dyn PaymentMethodStore>,
    addresses: Arc<dyn AddressStore>,
    feed: Feed<Vec<PaymentMethod>>,
}

impl PaymentMethodService {
    #[must_use]
    pub fn new(
        payment_methods: Arc<dyn PaymentMethodStore>,
        addresses: Arc<dyn AddressStore>,
    ) -> Self {
        Self {
            payment_methods,
            addresses,
            feed: Feed::new(),
        }
    }

    /// # Errors
    ///
    /// Returns `RecordError::Repository` if the store cannot be read.
    pub async fn list(&self, user: UserId) -> Result<Vec<PaymentMethod>, RecordError> {
        Ok(self.payment_methods.list(user).await?)
    }

    /// # Errors
    ///
    /// Returns `RecordError::NotFound` if the user has no such card.
    pub async fn get(&self, user: UserId, id: PaymentMethodId) -> Result<PaymentMethod, RecordError> {
        self.payment_methods
            .get(user, id)
            .await?
            .ok_or(RecordError::NotFound)
    }

    /// The default card, or the first one if none is flagged.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::Repository` if the store cannot be read.
    pub async fn preferred(&self, user: UserId) -> Result<Option<PaymentMethod>, RecordError> {
        let cards = self.list(user).await?;
        Ok(cards
            .iter()
            .find(|p| p.is_default)
            .or_else(|| cards.first())
            .cloned())
    }

    /// # Errors
    ///
    /// Returns `RecordError::Validation` if the card is invalid or the
    /// billing address is not one of the user's.
    #[instrument(skip(self, input))]
    pub async fn add(
        &self,
        user: UserId,
        input: PaymentMethodInput,
    ) -> Result<PaymentMethod, RecordError> {
        let draft = self.validate(user, input).await?;
        let card = self.payment_methods.insert(user, &draft).await?;
        tracing::info!(payment_method_id = %card.id, network = %card.network, "card saved");
        self.publish(user).await?;
        Ok(card)
    }

    /// # Errors
    ///
    /// Returns `RecordError::Validation` if the card is invalid and
    /// `RecordError::NotFound` if the user has no such card.
    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        user: UserId,
        id: PaymentMethodId,
        input: PaymentMethodInput,
    ) -> Result<PaymentMethod, RecordError> {
        let draft = self.validate(user, input).await?;
        let card = self.payment_methods.update(user, id, &draft).await?;
        self.publish(user).await?;
        Ok(card)
    }

    /// # Errors
    ///
    /// Returns `RecordError::NotFound` if the user has no such card.
    #[instrument(skip(self))]
    pub async fn delete(&self, user: UserId, id: PaymentMethodId) -> Result<(), RecordError> {
        self.payment_methods.delete(user, id).await?;
        self.publish(user).await
    }

    /// # Errors
    ///
    /// Returns `RecordError::NotFound` if the user has no such card.
    #[instrument(skip(self))]
    pub async fn set_default(&self, user: UserId, id: PaymentMethodId) -> Result<(), RecordError> {
        self.payment_methods.set_default(user, id).await?;
        self.publish(user).await
    }

    /// Watch the saved cards. The receiver starts with the current list.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::Repository` if the list cannot be loaded.
    pub async fn subscribe(
        &self,
        user: UserId,
    ) -> Result<watch::Receiver<Arc<Vec<PaymentMethod>>>, RecordError> {
        let current = self.list(user).await?;
        Ok(self.feed.subscribe(user, current))
    }

    async fn validate(
        &self,
        user: UserId,
        input: PaymentMethodInput,
    ) -> Result<PaymentMethodDraft, RecordError> {
        let draft = input.validate(Utc::now().date_naive())?;
        if let Some(billing) = draft.billing_address_id
            && self.addresses.get(user, billing).await?.is_none()
        {
            return Err(
                ValidationError::Invalid(format!("billing address {billing} not found")).into(),
            );
        }
        Ok(draft)
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
    use furnish_core::{AddressId, CardNetwork, Email};

    use super::*;
    use crate::db::{MemoryStore, UserStore};

    async fn setup() -> (PaymentMethodService, UserId) {
        let store = Arc::new(MemoryStore::new());
        let user = store
            .create_with_password(&Email::parse("ada@example.com").unwrap(), "Ada", "hash")
            .await
            .unwrap();
        (PaymentMethodService::new(store.clone(), store), user.id)
    }

    fn card(number: &str, is_default: bool) -> PaymentMethodInput {
        PaymentMethodInput {
            card_holder_name: "Ada Lovelace".to_owned(),
            card_number: number.to_owned(),
            expiry_date: "12/35".to_owned(),
            cvv: "123".to_owned(),
            is_default,
            ..PaymentMethodInput::default()
        }
    }

    #[tokio::test]
    async fn test_add_masks_card() {
        let (service, user) = setup().await;
        let saved = service.add(user, card("5555 5555 5555 4444", false)).await.unwrap();
        assert_eq!(saved.last4, "4444");
        assert_eq!(saved.masked_number, "•••• •••• •••• 4444");
        assert_eq!(saved.network, CardNetwork::Mastercard);
        assert!(saved.is_default);
    }

    #[tokio::test]
    async fn test_unknown_billing_address_rejected() {
        let (service, user) = setup().await;
        let mut form = card("4111111111111111", false);
        form.billing_address_id = Some(AddressId::new(77));
        assert!(matches!(
            service.add(user, form).await,
            Err(RecordError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_set_default_and_delete_promotes() {
        let (service, user) = setup().await;
        let first = service.add(user, card("4111111111111111", false)).await.unwrap();
        let second = service.add(user, card("4000056655665556", false)).await.unwrap();

        service.set_default(user, second.id).await.unwrap();
        assert_eq!(service.preferred(user).await.unwrap().unwrap().id, second.id);

        service.delete(user, second.id).await.unwrap();
        let remaining = service.list(user).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, first.id);
        assert!(remaining[0].is_default);
    }
}
