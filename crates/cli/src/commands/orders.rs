//! Back-office order commands.
//!
//! ```bash
//! furnish orders recent --limit 20
//! furnish orders set-status --id 42 --status shipped
//! ```

use furnish_core::{OrderId, OrderStatus};
use furnish_storefront::db::Stores;
use furnish_storefront::services::OrderService;
use tracing::info;

use super::{CliError, connect};

async fn service() -> Result<OrderService, CliError> {
    let pool = connect().await?;
    Ok(OrderService::new(Stores::postgres(&pool).orders))
}

/// Log the newest orders across all customers.
///
/// # Errors
///
/// Returns an error if the database cannot be read.
pub async fn recent(limit: u32) -> Result<(), CliError> {
    let orders = service().await?.recent(limit).await?;
    if orders.is_empty() {
        info!("No orders yet");
    }
    for order in &orders {
        info!(
            "#{} {} user={} total={} status={} tracking={}",
            order.id,
            order.placed_at.format("%Y-%m-%d %H:%M"),
            order.user_id,
            order.totals.total,
            order.status,
            order.tracking_code,
        );
    }
    Ok(())
}

/// Move an order along its lifecycle.
///
/// # Errors
///
/// Returns `OrderError::InvalidTransition` if the lifecycle forbids the move.
pub async fn set_status(id: i32, status: OrderStatus) -> Result<(), CliError> {
    let order = service()
        .await?
        .update_status(OrderId::new(id), status)
        .await?;
    info!(order_id = %order.id, status = %order.status, "Order updated");
    Ok(())
}
