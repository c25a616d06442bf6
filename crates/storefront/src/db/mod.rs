//! Persistence for the shop.
//!
//! Every collection sits behind an `async` store trait so that services take
//! their repositories as injected `Arc<dyn …>` values. Two implementations
//! exist:
//!
//! - `Pg*Store` types backed by `PostgreSQL` (production)
//! - [`MemoryStore`], a single in-process store implementing every trait
//!   (tests and local development)
//!
//! # Tables
//!
//! - `users`, `user_passwords` - Accounts and argon2 hashes
//! - `categories`, `products` - Catalog
//! - `cart_items`, `favorites` - Per-user product maps
//! - `addresses`, `payment_methods` - Address book and saved cards, each with
//!   a partial unique index allowing one default per user
//! - `orders`, `order_items` - Placed orders and their lines
//! - `tower_sessions.session` - Session storage
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p furnish-cli -- migrate
//! ```

pub mod addresses;
pub mod carts;
mod defaults;
pub mod favorites;
pub mod memory;
pub mod orders;
pub mod payment_methods;
pub mod products;
pub mod users;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use furnish_core::{
    AddressId, CategoryId, Email, OrderId, OrderStatus, PaymentMethodId, ProductId, UserId,
};

use crate::models::{
    Address, AddressDraft, CartLine, Category, NewCategory, NewOrder, NewProduct, Order,
    PaymentMethod, PaymentMethodDraft, Product, User,
};

pub use addresses::PgAddressStore;
pub use carts::PgCartStore;
pub use favorites::PgFavoriteStore;
pub use memory::MemoryStore;
pub use orders::PgOrderStore;
pub use payment_methods::PgPaymentMethodStore;
pub use products::PgProductStore;
pub use users::PgUserStore;

/// Errors returned by every store.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email, stale status).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map a unique-constraint violation to [`RepositoryError::Conflict`].
pub(crate) fn conflict_on_unique(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(what.to_owned());
    }
    RepositoryError::Database(e)
}

/// Referencing a row that does not exist (e.g. an unknown product) trips a
/// foreign key; report it as [`RepositoryError::NotFound`].
pub(crate) fn not_found_on_foreign_key(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_foreign_key_violation()
    {
        return RepositoryError::NotFound;
    }
    RepositoryError::Database(e)
}

/// Quantities are `u32` in the domain and `INTEGER` in the database.
pub(crate) fn db_quantity(quantity: u32) -> Result<i32, RepositoryError> {
    i32::try_from(quantity)
        .map_err(|_| RepositoryError::Conflict(format!("quantity {quantity} is too large")))
}

pub(crate) fn model_quantity(quantity: i32) -> Result<u32, RepositoryError> {
    u32::try_from(quantity)
        .map_err(|_| RepositoryError::DataCorruption(format!("negative quantity {quantity}")))
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

// =============================================================================
// Store traits
// =============================================================================

/// Accounts and password hashes.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create a user and their password hash together.
    ///
    /// Returns `Conflict` if the email is taken.
    async fn create_with_password(
        &self,
        email: &Email,
        name: &str,
        password_hash: &str,
    ) -> Result<User, RepositoryError>;

    async fn get(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Look up a user with their stored hash, for login.
    async fn get_with_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    async fn update_profile(
        &self,
        id: UserId,
        name: &str,
        phone: Option<&str>,
    ) -> Result<User, RepositoryError>;
}

/// Categories and products.
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn categories(&self) -> Result<Vec<Category>, RepositoryError>;

    /// Every product, ordered by id.
    async fn products(&self) -> Result<Vec<Product>, RepositoryError>;

    async fn product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    async fn product_by_handle(&self, handle: &str) -> Result<Option<Product>, RepositoryError>;

    async fn products_in_category(
        &self,
        category: CategoryId,
    ) -> Result<Vec<Product>, RepositoryError>;

    /// Insert or update a category by handle.
    async fn upsert_category(&self, category: &NewCategory) -> Result<Category, RepositoryError>;

    /// Insert or update a product by handle.
    ///
    /// Returns `NotFound` if its category handle does not exist.
    async fn upsert_product(&self, product: &NewProduct) -> Result<Product, RepositoryError>;
}

/// Per-user product-to-quantity map.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Lines in the order they were first added.
    async fn lines(&self, user: UserId) -> Result<Vec<CartLine>, RepositoryError>;

    /// Add `quantity` to the line, creating it if needed.
    async fn add(
        &self,
        user: UserId,
        product: ProductId,
        quantity: u32,
    ) -> Result<(), RepositoryError>;

    /// Set the quantity of a line. Zero removes it.
    async fn set_quantity(
        &self,
        user: UserId,
        product: ProductId,
        quantity: u32,
    ) -> Result<(), RepositoryError>;

    async fn remove(&self, user: UserId, product: ProductId) -> Result<(), RepositoryError>;

    async fn clear(&self, user: UserId) -> Result<(), RepositoryError>;
}

/// Per-user set of favorite products.
#[async_trait]
pub trait FavoriteStore: Send + Sync {
    /// Favorite products, most recent first.
    async fn product_ids(&self, user: UserId) -> Result<Vec<ProductId>, RepositoryError>;

    /// Flip membership and return whether the product is now a favorite.
    async fn toggle(&self, user: UserId, product: ProductId) -> Result<bool, RepositoryError>;

    async fn remove(&self, user: UserId, product: ProductId) -> Result<(), RepositoryError>;
}

/// Address book.
///
/// Every mutation keeps at most one default per user and is atomic: the
/// invariant holds after each call returns, whether it succeeded or failed.
#[async_trait]
pub trait AddressStore: Send + Sync {
    /// All addresses of a user, ordered by id.
    async fn list(&self, user: UserId) -> Result<Vec<Address>, RepositoryError>;

    async fn get(&self, user: UserId, id: AddressId) -> Result<Option<Address>, RepositoryError>;

    /// Insert an address. It becomes the default if the draft asks for it or
    /// if it is the user's first address.
    async fn insert(&self, user: UserId, draft: &AddressDraft) -> Result<Address, RepositoryError>;

    /// Replace an address's fields. Setting `is_default` moves the default
    /// here; clearing it on the current default is ignored.
    async fn update(
        &self,
        user: UserId,
        id: AddressId,
        draft: &AddressDraft,
    ) -> Result<Address, RepositoryError>;

    /// Delete an address, promoting the lowest-id survivor if it was the
    /// default.
    async fn delete(&self, user: UserId, id: AddressId) -> Result<(), RepositoryError>;

    /// Make `id` the only default.
    async fn set_default(&self, user: UserId, id: AddressId) -> Result<(), RepositoryError>;
}

/// Saved cards. Same default rules as [`AddressStore`].
#[async_trait]
pub trait PaymentMethodStore: Send + Sync {
    async fn list(&self, user: UserId) -> Result<Vec<PaymentMethod>, RepositoryError>;

    async fn get(
        &self,
        user: UserId,
        id: PaymentMethodId,
    ) -> Result<Option<PaymentMethod>, RepositoryError>;

    async fn insert(
        &self,
        user: UserId,
        draft: &PaymentMethodDraft,
    ) -> Result<PaymentMethod, RepositoryError>;

    async fn update(
        &self,
        user: UserId,
        id: PaymentMethodId,
        draft: &PaymentMethodDraft,
    ) -> Result<PaymentMethod, RepositoryError>;

    async fn delete(&self, user: UserId, id: PaymentMethodId) -> Result<(), RepositoryError>;

    async fn set_default(&self, user: UserId, id: PaymentMethodId)
    -> Result<(), RepositoryError>;
}

/// Placed orders.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert an order.
    ///
    /// Idempotent on `(user_id, checkout_key)`: a second insert with the same
    /// key returns the order created by the first.
    async fn create(&self, order: NewOrder) -> Result<Order, RepositoryError>;

    /// Orders of a user, newest first, optionally filtered by status.
    async fn list_for_user(
        &self,
        user: UserId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, RepositoryError>;

    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    async fn find_by_checkout_key(
        &self,
        user: UserId,
        checkout_key: Uuid,
    ) -> Result<Option<Order>, RepositoryError>;

    /// Move an order from `from` to `to`.
    ///
    /// Returns `Conflict` if the stored status is no longer `from`.
    async fn update_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Order, RepositoryError>;

    /// Newest orders across all users.
    async fn recent(&self, limit: u32) -> Result<Vec<Order>, RepositoryError>;
}

// =============================================================================
// Store bundle
// =============================================================================

/// One handle per collection, injected into the services.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub products: Arc<dyn ProductStore>,
    pub carts: Arc<dyn CartStore>,
    pub favorites: Arc<dyn FavoriteStore>,
    pub addresses: Arc<dyn AddressStore>,
    pub payment_methods: Arc<dyn PaymentMethodStore>,
    pub orders: Arc<dyn OrderStore>,
}

impl Stores {
    /// Postgres-backed stores sharing one pool.
    #[must_use]
    pub fn postgres(pool: &PgPool) -> Self {
        Self {
            users: Arc::new(PgUserStore::new(pool.clone())),
            products: Arc::new(PgProductStore::new(pool.clone())),
            carts: Arc::new(PgCartStore::new(pool.clone())),
            favorites: Arc::new(PgFavoriteStore::new(pool.clone())),
            addresses: Arc::new(PgAddressStore::new(pool.clone())),
            payment_methods: Arc::new(PgPaymentMethodStore::new(pool.clone())),
            orders: Arc::new(PgOrderStore::new(pool.clone())),
        }
    }

    /// Every collection backed by the same in-memory store.
    #[must_use]
    pub fn in_memory(store: Arc<MemoryStore>) -> Self {
        Self {
            users: store.clone(),
            products: store.clone(),
            carts: store.clone(),
            favorites: store.clone(),
            addresses: store.clone(),
            payment_methods: store.clone(),
            orders: store,
        }
    }
}
