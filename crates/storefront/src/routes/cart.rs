//! Cart route handlers.
//!
//! Every write returns the whole cart; `/events` streams the same snapshots.

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use furnish_core::ProductId;

use super::live;
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::Cart;
use crate::state::AppState;

const fn one() -> u32 {
    1
}

/// Add-to-cart form data.
#[derive(Debug, Deserialize)]
pub struct AddRequest {
    pub product_id: ProductId,
    #[serde(default = "one")]
    pub quantity: u32,
}

/// Quantity update form data.
#[derive(Debug, Deserialize)]
pub struct QuantityRequest {
    pub quantity: i64,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: u32,
}

pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Cart>> {
    Ok(Json(state.cart().snapshot(user.id).await?))
}

pub async fn count(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CountResponse>> {
    let count = state.cart().item_count(user.id).await?;
    Ok(Json(CountResponse { count }))
}

pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<AddRequest>,
) -> Result<Json<Cart>> {
    let cart = state
        .cart()
        .add(user.id, request.product_id, request.quantity)
        .await?;
    Ok(Json(cart))
}

pub async fn set_quantity(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
    Json(request): Json<QuantityRequest>,
) -> Result<Json<Cart>> {
    let cart = state
        .cart()
        .set_quantity(user.id, product_id, request.quantity)
        .await?;
    Ok(Json(cart))
}

pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
) -> Result<Json<Cart>> {
    Ok(Json(state.cart().remove(user.id, product_id).await?))
}

pub async fn clear(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Cart>> {
    Ok(Json(state.cart().clear(user.id).await?))
}

/// Server-sent events with the full cart after every change.
pub async fn events(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse> {
    let receiver = state.cart().subscribe(user.id).await?;
    Ok(live(receiver))
}
