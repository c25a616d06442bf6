//! Payment card input types.
//!
//! Full card numbers and security codes only exist while a request is being
//! validated. What gets stored is the network, the last four digits and the
//! expiry; the CVV is replaced by [`MASKED_CVV`].

use core::fmt;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Stored in place of the real security code.
pub const MASKED_CVV: &str = "***";

static EXPIRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(0[1-9]|1[0-2])/([0-9]{2})$").expect("Invalid regex"));

static CVV_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{3,4}$").expect("Invalid regex"));

/// Errors that can occur when parsing card details.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CardError {
    #[error("card number must be 13 to 19 digits")]
    InvalidNumber,
    #[error("expiry date must be in MM/YY format")]
    InvalidExpiry,
    #[error("card has expired")]
    Expired,
    #[error("security code must be 3 or 4 digits")]
    InvalidCvv,
}

/// Card scheme, detected from the leading digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "card_network", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum CardNetwork {
    Visa,
    Mastercard,
    Amex,
    Discover,
    #[default]
    Other,
}

impl CardNetwork {
    /// Detect the network from a digits-only card number.
    #[must_use]
    pub fn detect(digits: &str) -> Self {
        let prefix = |n: usize| digits.get(..n).and_then(|p| p.parse::<u32>().ok());

        if digits.starts_with('4') {
            Self::Visa
        } else if matches!(prefix(2), Some(51..=55)) || matches!(prefix(4), Some(2221..=2720)) {
            Self::Mastercard
        } else if matches!(prefix(2), Some(34 | 37)) {
            Self::Amex
        } else if digits.starts_with("6011") || digits.starts_with("65") {
            Self::Discover
        } else {
            Self::Other
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Visa => "Visa",
            Self::Mastercard => "Mastercard",
            Self::Amex => "American Express",
            Self::Discover => "Discover",
            Self::Other => "Card",
        }
    }
}

impl fmt::Display for CardNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A full card number, digits only.
///
/// `Debug` and `Display` only ever show the masked form.
///
/// ```
/// use furnish_core::{CardNetwork, CardNumber};
///
/// let card = CardNumber::parse("4111 1111 1111 1234").unwrap();
/// assert_eq!(card.last4(), "1234");
/// assert_eq!(card.masked(), "•••• •••• •••• 1234");
/// assert_eq!(card.network(), CardNetwork::Visa);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct CardNumber(String);

impl CardNumber {
    /// Parse a card number, ignoring spaces and dashes.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::InvalidNumber`] unless 13-19 digits remain.
    pub fn parse(s: &str) -> Result<Self, CardError> {
        let digits: String = s.chars().filter(|c| !matches!(c, ' ' | '-')).collect();
        if !(13..=19).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(CardError::InvalidNumber);
        }
        Ok(Self(digits))
    }

    #[must_use]
    pub fn last4(&self) -> &str {
        // At least 13 ASCII digits, so the slice is always in bounds.
        self.0.get(self.0.len() - 4..).unwrap_or_default()
    }

    #[must_use]
    pub fn masked(&self) -> String {
        mask_last4(self.last4())
    }

    #[must_use]
    pub fn network(&self) -> CardNetwork {
        CardNetwork::detect(&self.0)
    }
}

/// Render last-four digits as a masked card number.
#[must_use]
pub fn mask_last4(last4: &str) -> String {
    format!("•••• •••• •••• {last4}")
}

impl fmt::Debug for CardNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CardNumber").field(&self.masked()).finish()
    }
}

impl fmt::Display for CardNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

/// Card expiry month, `MM/YY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExpiryDate {
    year: i32,
    month: u32,
}

impl ExpiryDate {
    /// Parse an expiry date and reject cards that expired before `today`.
    ///
    /// A card is valid through the last day of its expiry month.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::InvalidExpiry`] for malformed input and
    /// [`CardError::Expired`] for a month already in the past.
    pub fn parse(s: &str, today: NaiveDate) -> Result<Self, CardError> {
        let caps = EXPIRY_RE
            .captures(s.trim())
            .ok_or(CardError::InvalidExpiry)?;
        let month: u32 = caps[1].parse().map_err(|_| CardError::InvalidExpiry)?;
        let yy: i32 = caps[2].parse().map_err(|_| CardError::InvalidExpiry)?;

        let expiry = Self {
            year: 2000 + yy,
            month,
        };
        let current = Self {
            year: today.year(),
            month: today.month(),
        };
        if expiry < current {
            return Err(CardError::Expired);
        }
        Ok(expiry)
    }

    #[must_use]
    pub const fn month(self) -> u32 {
        self.month
    }

    #[must_use]
    pub const fn year(self) -> i32 {
        self.year
    }
}

impl fmt::Display for ExpiryDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{:02}", self.month, self.year % 100)
    }
}

/// Card security code. Never displayed or stored.
#[derive(Clone, PartialEq, Eq)]
pub struct Cvv(String);

impl Cvv {
    /// # Errors
    ///
    /// Returns [`CardError::InvalidCvv`] unless the input is 3 or 4 digits.
    pub fn parse(s: &str) -> Result<Self, CardError> {
        let s = s.trim();
        if !CVV_RE.is_match(s) {
            return Err(CardError::InvalidCvv);
        }
        Ok(Self(s.to_owned()))
    }

    /// The value to persist in place of the code.
    #[must_use]
    pub const fn masked(&self) -> &'static str {
        MASKED_CVV
    }
}

impl fmt::Debug for Cvv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Cvv(***)")
    }
}
