//! Address book route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use furnish_core::AddressId;

use super::live;
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::{Address, AddressInput};
use crate::state::AppState;

pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Address>>> {
    Ok(Json(state.addresses().list(user.id).await?))
}

pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
) -> Result<Json<Address>> {
    Ok(Json(state.addresses().get(user.id, id).await?))
}

/// Save a new address. The first one becomes the default.
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(input): Json<AddressInput>,
) -> Result<impl IntoResponse> {
    let address = state.addresses().add(user.id, input).await?;
    Ok((StatusCode::CREATED, Json(address)))
}

pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
    Json(input): Json<AddressInput>,
) -> Result<Json<Address>> {
    Ok(Json(state.addresses().update(user.id, id, input).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
) -> Result<StatusCode> {
    state.addresses().delete(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Make this the only default address; returns the updated book.
pub async fn set_default(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
) -> Result<Json<Vec<Address>>> {
    state.addresses().set_default(user.id, id).await?;
    Ok(Json(state.addresses().list(user.id).await?))
}

pub async fn events(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse> {
    let receiver = state.addresses().subscribe(user.id).await?;
    Ok(live(receiver))
}
