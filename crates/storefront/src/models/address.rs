//! Delivery addresses.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use furnish_core::{AddressId, Postcode, UserId};

use super::{ValidationError, optional, required};

/// Country used when the form leaves it blank.
pub const DEFAULT_COUNTRY: &str = "United Kingdom";

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9][0-9 ()\-]{6,19}$").expect("Invalid regex"));

/// Free-text label shown next to an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, sqlx::Type)]
#[sqlx(type_name = "address_label", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AddressLabel {
    #[default]
    Home,
    Work,
    Other,
}

/// A saved address belonging to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    pub full_name: String,
    pub phone_number: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub town: String,
    pub county: Option<String>,
    pub postcode: Postcode,
    pub country: String,
    /// Pre-selected at checkout. At most one per user.
    pub is_default: bool,
    pub label: AddressLabel,
    pub created_at: DateTime<Utc>,
}

impl Address {
    /// Copy of the postal fields, as recorded on an order.
    #[must_use]
    pub fn snapshot(&self) -> AddressSnapshot {
        AddressSnapshot {
            full_name: self.full_name.clone(),
            phone_number: self.phone_number.clone(),
            address_line1: self.address_line1.clone(),
            address_line2: self.address_line2.clone(),
            town: self.town.clone(),
            county: self.county.clone(),
            postcode: self.postcode.clone(),
            country: self.country.clone(),
        }
    }
}

/// Postal fields frozen onto an order at placement time.
///
/// Later edits to the saved address do not change past orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressSnapshot {
    pub full_name: String,
    pub phone_number: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub town: String,
    pub county: Option<String>,
    pub postcode: Postcode,
    pub country: String,
}

impl AddressSnapshot {
    /// Single-line rendering for confirmations.
    #[must_use]
    pub fn one_line(&self) -> String {
        [
            Some(self.address_line1.as_str()),
            self.address_line2.as_deref(),
            Some(self.town.as_str()),
            self.county.as_deref(),
            Some(self.postcode.as_str()),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(", ")
    }
}

/// Address form submission.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressInput {
    pub full_name: String,
    pub phone_number: String,
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: Option<String>,
    pub town: String,
    #[serde(default)]
    pub county: Option<String>,
    pub postcode: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub label: AddressLabel,
    #[serde(default)]
    pub is_default: bool,
}

/// Validated address fields, ready to store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressDraft {
    pub full_name: String,
    pub phone_number: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub town: String,
    pub county: Option<String>,
    pub postcode: Postcode,
    pub country: String,
    pub label: AddressLabel,
    pub is_default: bool,
}

impl AddressInput {
    /// Validate and normalize the form.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for blank required fields, a malformed phone
    /// number or a postcode that is not a UK postcode.
    pub fn validate(self) -> Result<AddressDraft, ValidationError> {
        let full_name = required(&self.full_name, "full name")?;
        let phone_number = required(&self.phone_number, "phone number")?;
        if !PHONE_RE.is_match(&phone_number) {
            return Err(ValidationError::Invalid(format!(
                "'{phone_number}' is not a valid phone number"
            )));
        }
        let address_line1 = required(&self.address_line1, "address line 1")?;
        let town = required(&self.town, "town")?;
        let postcode = Postcode::parse(&self.postcode)?;

        Ok(AddressDraft {
            full_name,
            phone_number,
            address_line1,
            address_line2: optional(self.address_line2.as_deref()),
            town,
            county: optional(self.county.as_deref()),
            postcode,
            country: optional(self.country.as_deref()).unwrap_or_else(|| DEFAULT_COUNTRY.to_owned()),
            label: self.label,
            is_default: self.is_default,
        })
    }
}
