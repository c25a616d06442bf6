//! Order history route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use furnish_core::{OrderId, OrderStatus};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::Order;
use crate::state::AppState;

/// Query parameters for the order list.
#[derive(Debug, Deserialize)]
pub struct OrdersQuery {
    pub status: Option<OrderStatus>,
}

/// The user's orders, newest first, optionally of one status.
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<OrdersQuery>,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(state.orders().list(user.id, query.status).await?))
}

pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    Ok(Json(state.orders().get(user.id, id).await?))
}

/// Cancel an order that has not shipped yet.
pub async fn cancel(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    Ok(Json(state.orders().cancel(user.id, id).await?))
}
