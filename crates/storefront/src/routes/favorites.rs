//! Favorites route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;

use furnish_core::ProductId;

use super::live;
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::Product;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct FavoriteResponse {
    pub product_id: ProductId,
    pub favorite: bool,
}

/// Favorite products, most recently added first.
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Product>>> {
    Ok(Json(state.favorites().list(user.id).await?))
}

pub async fn contains(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
) -> Result<Json<FavoriteResponse>> {
    let favorite = state.favorites().contains(user.id, product_id).await?;
    Ok(Json(FavoriteResponse {
        product_id,
        favorite,
    }))
}

/// Flip the favorite flag and return the new state.
pub async fn toggle(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
) -> Result<Json<FavoriteResponse>> {
    let favorite = state.favorites().toggle(user.id, product_id).await?;
    Ok(Json(FavoriteResponse {
        product_id,
        favorite,
    }))
}

pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
) -> Result<StatusCode> {
    state.favorites().remove(user.id, product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn events(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse> {
    let receiver = state.favorites().subscribe(user.id).await?;
    Ok(live(receiver))
}
