//! Business logic services for the shop.
//!
//! # Services
//!
//! - `auth` - Registration, login and profile edits (argon2)
//! - `catalog` - Categories, products and search
//! - `cart` / `favorites` - Per-user collections with change feeds
//! - `addresses` / `payment_methods` - Address book and saved cards
//! - `orders` - Order placement, history and status changes
//! - `checkout` - The five-step checkout wizard
//!
//! Services are cheap to clone and hold their stores as `Arc<dyn …>`.

pub mod addresses;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod favorites;
pub mod feed;
pub mod orders;
pub mod payment_methods;

pub use addresses::AddressService;
pub use auth::{AuthError, AuthService};
pub use cart::CartService;
pub use catalog::CatalogService;
pub use checkout::{CheckoutError, CheckoutService, CheckoutStep, CheckoutView, CheckoutWizard};
pub use favorites::FavoriteService;
pub use feed::Feed;
pub use orders::{OrderError, OrderService, PlaceOrder};
pub use payment_methods::PaymentMethodService;

use crate::db::RepositoryError;
use crate::models::ValidationError;

/// Errors from the per-user collection services (cart, favorites, address
/// book, saved cards).
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The record, or a product it refers to, does not exist for this user.
    #[error("not found")]
    NotFound,

    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for RecordError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => Self::NotFound,
            other => Self::Repository(other),
        }
    }
}
