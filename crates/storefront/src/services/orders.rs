//! Order placement and history.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::Rng;
use tracing::instrument;
use uuid::Uuid;

use furnish_core::{OrderId, OrderStatus, UserId};

use crate::db::{OrderStore, RepositoryError};
use crate::models::{Address, Cart, NewOrder, Order, OrderItem, OrderTotals, PaymentMethod};

/// Days from placement to the estimated delivery date.
pub const DELIVERY_DAYS: i64 = 7;

const TRACKING_PREFIX: &str = "TRK";
const TRACKING_LEN: usize = 12;

/// Errors from order operations.
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("cannot place an order for an empty cart")]
    EmptyCart,

    #[error("order not found")]
    NotFound,

    #[error("cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// The order changed status while we were updating it.
    #[error("order status changed concurrently")]
    StaleStatus,

    /// The store rejected the new order. Details are logged, not returned.
    #[error("failed to place order")]
    PlacementFailed,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Everything checkout hands over to create an order.
#[derive(Debug, Clone)]
pub struct PlaceOrder<'a> {
    pub user: UserId,
    /// Idempotency key; placing twice with the same key yields one order.
    pub checkout_key: Uuid,
    pub cart: &'a Cart,
    /// Used for both shipping and billing.
    pub address: &'a Address,
    pub payment: &'a PaymentMethod,
    pub notes: Option<String>,
}

/// Generate a tracking code, e.g. `TRK4F7Q2Z8M1K0B`.
#[must_use]
pub fn tracking_code() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..TRACKING_LEN)
        .map(|_| {
            // Uppercase letters then digits.
            let n: u8 = rng.random_range(0..36);
            char::from(if n < 26 { b'A' + n } else { b'0' + (n - 26) })
        })
        .collect();
    format!("{TRACKING_PREFIX}{suffix}")
}

#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrderStore>,
}

impl OrderService {
    #[must_use]
    pub fn new(orders: Arc<dyn OrderStore>) -> Self {
        Self { orders }
    }

    /// Turn a cart into a persisted order.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::EmptyCart` for an empty cart and
    /// `OrderError::PlacementFailed` if the store fails.
    #[instrument(skip(self, request), fields(user_id = %request.user, checkout_key = %request.checkout_key))]
    pub async fn place(&self, request: PlaceOrder<'_>) -> Result<Order, OrderError> {
        if request.cart.is_empty() {
            return Err(OrderError::EmptyCart);
        }

        let placed_at = Utc::now();
        let snapshot = request.address.snapshot();
        let new_order = NewOrder {
            user_id: request.user,
            checkout_key: request.checkout_key,
            items: OrderItem::from_cart(request.cart),
            totals: OrderTotals::for_subtotal(request.cart.subtotal),
            billing_address: snapshot.clone(),
            shipping_address: snapshot,
            payment_method_id: request.payment.id,
            payment_last4: request.payment.last4.clone(),
            status: OrderStatus::Processing,
            placed_at,
            estimated_delivery: placed_at + Duration::days(DELIVERY_DAYS),
            tracking_code: tracking_code(),
            notes: request.notes,
        };

        let order = self.orders.create(new_order).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to place order");
            OrderError::PlacementFailed
        })?;

        tracing::info!(order_id = %order.id, total = %order.totals.total, "order placed");
        Ok(order)
    }

    /// A user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the store cannot be read.
    pub async fn list(
        &self,
        user: UserId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, OrderError> {
        Ok(self.orders.list_for_user(user, status).await?)
    }

    /// One of the user's orders.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if it does not exist or belongs to
    /// someone else.
    pub async fn get(&self, user: UserId, id: OrderId) -> Result<Order, OrderError> {
        self.orders
            .get(id)
            .await?
            .filter(|o| o.user_id == user)
            .ok_or(OrderError::NotFound)
    }

    /// Cancel one of the user's orders before it ships.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidTransition` once the order has shipped.
    #[instrument(skip(self))]
    pub async fn cancel(&self, user: UserId, id: OrderId) -> Result<Order, OrderError> {
        let order = self.get(user, id).await?;
        self.transition(&order, OrderStatus::Cancelled).await
    }

    /// Move any order to `to` (back office).
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidTransition` if the lifecycle forbids it and
    /// `OrderError::StaleStatus` if the order changed in the meantime.
    #[instrument(skip(self))]
    pub async fn update_status(&self, id: OrderId, to: OrderStatus) -> Result<Order, OrderError> {
        let order = self.orders.get(id).await?.ok_or(OrderError::NotFound)?;
        self.transition(&order, to).await
    }

    /// Newest orders across all users.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the store cannot be read.
    pub async fn recent(&self, limit: u32) -> Result<Vec<Order>, OrderError> {
        Ok(self.orders.recent(limit).await?)
    }

    async fn transition(&self, order: &Order, to: OrderStatus) -> Result<Order, OrderError> {
        if !order.status.can_transition_to(to) {
            return Err(OrderError::InvalidTransition {
                from: order.status,
                to,
            });
        }

        let updated = self
            .orders
            .update_status(order.id, order.status, to)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => OrderError::StaleStatus,
                RepositoryError::NotFound => OrderError::NotFound,
                other => OrderError::Repository(other),
            })?;

        tracing::info!(order_id = %order.id, from = %order.status, to = %to, "order status changed");
        Ok(updated)
    }
}
