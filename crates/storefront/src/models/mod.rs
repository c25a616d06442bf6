//! Domain models for the shop.
//!
//! These are validated domain objects, separate from database row types.
//! Input structs (`*Input`) carry raw request data; `validate` turns them into
//! drafts that the repositories accept.

pub mod address;
pub mod cart;
pub mod order;
pub mod payment;
pub mod product;
pub mod session;
pub mod user;

pub use address::{Address, AddressDraft, AddressInput, AddressLabel, AddressSnapshot};
pub use cart::{Cart, CartItem, CartLine};
pub use order::{NewOrder, Order, OrderItem, OrderTotals};
pub use payment::{PaymentMethod, PaymentMethodDraft, PaymentMethodInput};
pub use product::{ArModel, Category, NewCategory, NewProduct, Product};
pub use session::{CurrentUser, keys as session_keys};
pub use user::User;

use furnish_core::{CardError, EmailError, PostcodeError};

/// Errors raised while validating user input.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// A required field was blank.
    #[error("{0} is required")]
    Required(&'static str),

    #[error(transparent)]
    Postcode(#[from] PostcodeError),

    #[error(transparent)]
    Card(#[from] CardError),

    #[error(transparent)]
    Email(#[from] EmailError),

    /// Any other field-level problem.
    #[error("{0}")]
    Invalid(String),
}

/// Trim a required text field, rejecting blank input.
pub(crate) fn required(value: &str, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required(field));
    }
    Ok(trimmed.to_owned())
}

/// Trim an optional text field, mapping blank input to `None`.
pub(crate) fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned)
}
