//! Saved payment cards.
//!
//! Only the last four digits, network and expiry are kept. The security code
//! is validated on input and then replaced with [`furnish_core::MASKED_CVV`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use furnish_core::{
    AddressId, CardNetwork, CardNumber, Cvv, ExpiryDate, PaymentMethodId, UserId, mask_last4,
};

use super::{ValidationError, required};

/// A saved card belonging to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: PaymentMethodId,
    pub user_id: UserId,
    pub card_holder_name: String,
    pub last4: String,
    /// `•••• •••• •••• 1234`
    pub masked_number: String,
    /// `MM/YY`
    pub expiry_date: String,
    pub network: CardNetwork,
    pub billing_address_id: Option<AddressId>,
    /// Pre-selected at checkout. At most one per user.
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

impl PaymentMethod {
    /// Short label, e.g. `Visa ending 1234`.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} ending {}", self.network, self.last4)
    }

    #[must_use]
    pub fn masked(last4: &str) -> String {
        mask_last4(last4)
    }
}

/// Card form submission.
#[derive(Clone, Default, Deserialize)]
pub struct PaymentMethodInput {
    pub card_holder_name: String,
    pub card_number: String,
    pub expiry_date: String,
    pub cvv: String,
    /// Overrides network detection when the client already knows it.
    #[serde(default)]
    pub network: Option<CardNetwork>,
    #[serde(default)]
    pub billing_address_id: Option<AddressId>,
    #[serde(default)]
    pub is_default: bool,
}

impl std::fmt::Debug for PaymentMethodInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentMethodInput")
            .field("card_holder_name", &self.card_holder_name)
            .field("card_number", &"[REDACTED]")
            .field("expiry_date", &self.expiry_date)
            .field("cvv", &"[REDACTED]")
            .field("network", &self.network)
            .field("billing_address_id", &self.billing_address_id)
            .field("is_default", &self.is_default)
            .finish()
    }
}

/// Validated card fields, ready to store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentMethodDraft {
    pub card_holder_name: String,
    pub last4: String,
    pub expiry_date: String,
    pub network: CardNetwork,
    /// Always [`furnish_core::MASKED_CVV`].
    pub cvv: &'static str,
    pub billing_address_id: Option<AddressId>,
    pub is_default: bool,
}

impl PaymentMethodInput {
    /// Validate the card against `today` and drop the sensitive fields.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for a blank holder name, a card number that
    /// is not 13-19 digits, a malformed or past expiry, or a bad CVV.
    pub fn validate(self, today: NaiveDate) -> Result<PaymentMethodDraft, ValidationError> {
        let card_holder_name = required(&self.card_holder_name, "card holder name")?;
        let number = CardNumber::parse(&self.card_number)?;
        let expiry = ExpiryDate::parse(&self.expiry_date, today)?;
        let cvv = Cvv::parse(&self.cvv)?;

        Ok(PaymentMethodDraft {
            card_holder_name,
            last4: number.last4().to_owned(),
            expiry_date: expiry.to_string(),
            network: self.network.unwrap_or_else(|| number.network()),
            cvv: cvv.masked(),
            billing_address_id: self.billing_address_id,
            is_default: self.is_default,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use furnish_core::CardError;

    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn input() -> PaymentMethodInput {
        PaymentMethodInput {
            card_holder_name: "Ada Lovelace".to_owned(),
            card_number: "4111 1111 1111 1234".to_owned(),
            expiry_date: "04/28".to_owned(),
            cvv: "737".to_owned(),
            ..PaymentMethodInput::default()
        }
    }

    #[test]
    fn test_validate_keeps_only_last4_and_masks_cvv() {
        let draft = input().validate(today()).unwrap();
        assert_eq!(draft.last4, "1234");
        assert_eq!(draft.cvv, "***");
        assert_eq!(draft.network, CardNetwork::Visa);
        assert_eq!(draft.expiry_date, "04/28");
    }

    #[test]
    fn test_validate_network_override() {
        let mut form = input();
        form.network = Some(CardNetwork::Other);
        assert_eq!(form.validate(today()).unwrap().network, CardNetwork::Other);
    }

    #[test]
    fn test_validate_rejects_expired_card() {
        let mut form = input();
        form.expiry_date = "09/26".to_owned();
        assert!(matches!(
            form.validate(today()),
            Err(ValidationError::Card(CardError::Expired))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_number_and_cvv() {
        let mut form = input();
        form.card_number = "1234".to_owned();
        assert!(matches!(
            form.validate(today()),
            Err(ValidationError::Card(CardError::InvalidNumber))
        ));

        let mut form = input();
        form.cvv = "1".to_owned();
        assert!(matches!(
            form.validate(today()),
            Err(ValidationError::Card(CardError::InvalidCvv))
        ));
    }

    #[test]
    fn test_input_debug_redacts_card_data() {
        let debug = format!("{:?}", input());
        assert!(!debug.contains("4111"));
        assert!(!debug.contains("737"));
    }

    #[test]
    fn test_masked_number() {
        assert_eq!(PaymentMethod::masked("4242"), "•••• •••• •••• 4242");
    }
}
