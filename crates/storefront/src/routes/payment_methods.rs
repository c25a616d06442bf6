//! Saved card route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use furnish_core::PaymentMethodId;

use super::live;
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::{PaymentMethod, PaymentMethodInput};
use crate::state::AppState;

pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<PaymentMethod>>> {
    Ok(Json(state.payment_methods().list(user.id).await?))
}

pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<PaymentMethodId>,
) -> Result<Json<PaymentMethod>> {
    Ok(Json(state.payment_methods().get(user.id, id).await?))
}

/// Save a new card. The first one becomes the default.
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(input): Json<PaymentMethodInput>,
) -> Result<impl IntoResponse> {
    let card = state.payment_methods().add(user.id, input).await?;
    Ok((StatusCode::CREATED, Json(card)))
}

pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<PaymentMethodId>,
    Json(input): Json<PaymentMethodInput>,
) -> Result<Json<PaymentMethod>> {
    Ok(Json(state.payment_methods().update(user.id, id, input).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<PaymentMethodId>,
) -> Result<StatusCode> {
    state.payment_methods().delete(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Make this the only default card; returns the updated list.
pub async fn set_default(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<PaymentMethodId>,
) -> Result<Json<Vec<PaymentMethod>>> {
    state.payment_methods().set_default(user.id, id).await?;
    Ok(Json(state.payment_methods().list(user.id).await?))
}

pub async fn events(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse> {
    let receiver = state.payment_methods().subscribe(user.id).await?;
    Ok(live(receiver))
}
