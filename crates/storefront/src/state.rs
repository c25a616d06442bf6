//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::db::Stores;
use crate::services::{
    AddressService, AuthService, CartService, CatalogService, CheckoutService, FavoriteService,
    OrderService, PaymentMethodService,
};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`; holds the configuration, the optional pool
/// (for readiness checks) and every service.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: Option<PgPool>,
    auth: AuthService,
    catalog: CatalogService,
    cart: CartService,
    favorites: FavoriteService,
    addresses: AddressService,
    payment_methods: PaymentMethodService,
    orders: OrderService,
    checkout: CheckoutService,
}

impl AppState {
    /// Wire the services over `stores`.
    ///
    /// `pool` is `None` when running against in-memory stores.
    #[must_use]
    pub fn new(config: StorefrontConfig, stores: Stores, pool: Option<PgPool>) -> Self {
        let catalog = CatalogService::new(stores.products);
        let cart = CartService::new(stores.carts, catalog.clone());
        let favorites = FavoriteService::new(stores.favorites, catalog.clone());
        let addresses = AddressService::new(Arc::clone(&stores.addresses));
        let payment_methods = PaymentMethodService::new(stores.payment_methods, stores.addresses);
        let orders = OrderService::new(stores.orders);
        let checkout = CheckoutService::new(
            cart.clone(),
            addresses.clone(),
            payment_methods.clone(),
            orders.clone(),
            config.checkout_idle,
        );

        Self {
            inner: Arc::new(AppStateInner {
                auth: AuthService::new(stores.users),
                config,
                pool,
                catalog,
                cart,
                favorites,
                addresses,
                payment_methods,
                orders,
                checkout,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// The database pool, if the stores are Postgres-backed.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    #[must_use]
    pub fn auth(&self) -> &AuthService {
        &self.inner.auth
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }

    #[must_use]
    pub fn cart(&self) -> &CartService {
        &self.inner.cart
    }

    #[must_use]
    pub fn favorites(&self) -> &FavoriteService {
        &self.inner.favorites
    }

    #[must_use]
    pub fn addresses(&self) -> &AddressService {
        &self.inner.addresses
    }

    #[must_use]
    pub fn payment_methods(&self) -> &PaymentMethodService {
        &self.inner.payment_methods
    }

    #[must_use]
    pub fn orders(&self) -> &OrderService {
        &self.inner.orders
    }

    #[must_use]
    pub fn checkout(&self) -> &CheckoutService {
        &self.inner.checkout
    }
}
