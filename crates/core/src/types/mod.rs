//! Core types for Furnish.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod card;
pub mod email;
pub mod id;
pub mod postcode;
pub mod price;
pub mod status;

pub use card::{CardError, CardNetwork, CardNumber, Cvv, ExpiryDate, MASKED_CVV, mask_last4};
pub use email::{Email, EmailError};
pub use id::*;
pub use postcode::{Postcode, PostcodeError};
pub use price::{CurrencyCode, Price};
pub use status::*;
