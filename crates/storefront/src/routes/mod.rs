//! HTTP route handlers for the storefront API.
//!
//! All bodies are JSON. Routes marked (auth) need a logged-in session.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                              - Liveness
//! GET    /health/ready                        - Readiness (database)
//!
//! # Auth (rate limited)
//! POST   /api/auth/register                   - Create account and log in
//! POST   /api/auth/login                      - Log in
//! POST   /api/auth/logout                     - Log out
//! GET    /api/auth/me                         - Current user (auth)
//! PATCH  /api/auth/me                         - Update name and phone (auth)
//!
//! # Catalog
//! GET    /api/categories                      - All categories
//! GET    /api/products?category=handle        - Products, optionally by category
//! GET    /api/products/{handle}               - One product
//! GET    /api/search?q=&min_price=&max_price=&sort=&in_stock_only=
//!
//! # Cart (auth)
//! GET    /api/cart                            - Cart with totals
//! DELETE /api/cart                            - Empty the cart
//! GET    /api/cart/count                      - Item count badge
//! POST   /api/cart/items                      - Add a product
//! PUT    /api/cart/items/{product_id}         - Set quantity (<= 0 removes)
//! DELETE /api/cart/items/{product_id}         - Remove a line
//! GET    /api/cart/events                     - SSE feed of the cart
//!
//! # Favorites (auth)
//! GET    /api/favorites                       - Favorite products
//! GET    /api/favorites/{product_id}          - Is it a favorite?
//! POST   /api/favorites/{product_id}/toggle   - Toggle
//! DELETE /api/favorites/{product_id}          - Remove
//! GET    /api/favorites/events                - SSE feed of favorites
//!
//! # Address book and saved cards (auth)
//! GET|POST              /api/addresses
//! GET|PUT|DELETE        /api/addresses/{id}
//! POST                  /api/addresses/{id}/default
//! GET                   /api/addresses/events
//! GET|POST              /api/payment-methods
//! GET|PUT|DELETE        /api/payment-methods/{id}
//! POST                  /api/payment-methods/{id}/default
//! GET                   /api/payment-methods/events
//!
//! # Checkout wizard (auth)
//! GET    /api/checkout                        - Current step
//! POST   /api/checkout/start                  - Fresh checkout
//! POST   /api/checkout/next                   - Next step
//! POST   /api/checkout/previous               - Previous step
//! PUT    /api/checkout/address                - Select shipping address
//! PUT    /api/checkout/payment-method         - Select card
//! POST   /api/checkout/place-order            - Place the order
//! POST   /api/checkout/finish                 - Leave checkout
//!
//! # Orders (auth)
//! GET    /api/orders?status=                  - Order history
//! GET    /api/orders/{id}                     - One order
//! POST   /api/orders/{id}/cancel              - Cancel before shipping
//! ```

pub mod addresses;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod favorites;
pub mod health;
pub mod orders;
pub mod payment_methods;

use std::convert::Infallible;
use std::sync::Arc;

use axum::response::Sse;
use axum::response::sse::{Event, KeepAlive};
use axum::{
    Router,
    routing::{get, post, put},
};
use futures::Stream;
use serde::Serialize;
use tokio::sync::watch;

use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me).patch(auth::update_me))
        .layer(auth_rate_limiter())
}

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(catalog::categories))
        .route("/products", get(catalog::products))
        .route("/products/{handle}", get(catalog::product))
        .route("/search", get(catalog::search))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route("/count", get(cart::count))
        .route("/items", post(cart::add))
        .route(
            "/items/{product_id}",
            put(cart::set_quantity).delete(cart::remove),
        )
        .route("/events", get(cart::events))
}

/// Create the favorites routes router.
pub fn favorite_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(favorites::index))
        .route("/events", get(favorites::events))
        .route(
            "/{product_id}",
            get(favorites::contains).delete(favorites::remove),
        )
        .route("/{product_id}/toggle", post(favorites::toggle))
}

/// Create the address book routes router.
pub fn address_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(addresses::index).post(addresses::create))
        .route("/events", get(addresses::events))
        .route(
            "/{id}",
            get(addresses::show)
                .put(addresses::update)
                .delete(addresses::delete),
        )
        .route("/{id}/default", post(addresses::set_default))
}

/// Create the saved card routes router.
pub fn payment_method_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(payment_methods::index).post(payment_methods::create))
        .route("/events", get(payment_methods::events))
        .route(
            "/{id}",
            get(payment_methods::show)
                .put(payment_methods::update)
                .delete(payment_methods::delete),
        )
        .route("/{id}/default", post(payment_methods::set_default))
}

/// Create the checkout wizard routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::show))
        .route("/start", post(checkout::start))
        .route("/next", post(checkout::next))
        .route("/previous", post(checkout::previous))
        .route("/address", put(checkout::select_address))
        .route("/payment-method", put(checkout::select_payment_method))
        .route("/place-order", post(checkout::place_order))
        .route("/finish", post(checkout::finish))
}

/// Create the order history routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}", get(orders::show))
        .route("/{id}/cancel", post(orders::cancel))
}

/// Create the main router with all routes.
pub fn routes() -> Router<AppState> {
    let api = Router::new()
        .merge(catalog_routes())
        .nest("/cart", cart_routes())
        .nest("/favorites", favorite_routes())
        .nest("/addresses", address_routes())
        .nest("/payment-methods", payment_method_routes())
        .nest("/checkout", checkout_routes())
        .nest("/orders", order_routes())
        .layer(api_rate_limiter())
        .nest("/auth", auth_routes());

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api", api)
}

/// Stream a per-user feed as server-sent events.
///
/// The first event carries the current value; each later event carries the
/// whole replacement value. The stream ends when the feed is dropped.
pub fn live<T>(
    receiver: watch::Receiver<Arc<T>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    T: Serialize + Send + Sync + 'static,
{
    let stream = futures::stream::unfold((receiver, true), |(mut receiver, first)| async move {
        if !first && receiver.changed().await.is_err() {
            return None;
        }
        let value = Arc::clone(&*receiver.borrow_and_update());
        let event = Event::default()
            .event("update")
            .json_data(&*value)
            .unwrap_or_else(|e| Event::default().event("error").data(e.to_string()));
        Some((Ok(event), (receiver, false)))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
