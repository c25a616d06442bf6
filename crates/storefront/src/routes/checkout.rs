//! Checkout wizard route handlers.
//!
//! Each action returns the [`CheckoutView`] for the resulting step. A refused
//! action answers with the error and leaves the wizard where it was.

use axum::{Json, extract::State};
use serde::Deserialize;
use tracing::instrument;

use furnish_core::{AddressId, PaymentMethodId};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::services::CheckoutView;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SelectAddressRequest {
    pub address_id: AddressId,
}

#[derive(Debug, Deserialize)]
pub struct SelectPaymentMethodRequest {
    pub payment_method_id: PaymentMethodId,
}

#[derive(Debug, Default, Deserialize)]
pub struct PlaceOrderRequest {
    #[serde(default)]
    pub notes: Option<String>,
}

pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CheckoutView>> {
    Ok(Json(state.checkout().view(user.id).await?))
}

/// Begin a fresh checkout with the default address and card selected.
pub async fn start(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CheckoutView>> {
    Ok(Json(state.checkout().start(user.id).await?))
}

pub async fn next(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CheckoutView>> {
    Ok(Json(state.checkout().next(user.id).await?))
}

pub async fn previous(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CheckoutView>> {
    Ok(Json(state.checkout().previous(user.id).await?))
}

pub async fn select_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<SelectAddressRequest>,
) -> Result<Json<CheckoutView>> {
    let view = state
        .checkout()
        .select_address(user.id, request.address_id)
        .await?;
    Ok(Json(view))
}

pub async fn select_payment_method(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<SelectPaymentMethodRequest>,
) -> Result<Json<CheckoutView>> {
    let view = state
        .checkout()
        .select_payment_method(user.id, request.payment_method_id)
        .await?;
    Ok(Json(view))
}

/// Place the order from the summary step.
#[instrument(skip(state, user, request), fields(user_id = %user.id))]
pub async fn place_order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<PlaceOrderRequest>,
) -> Result<Json<CheckoutView>> {
    let view = state.checkout().place_order(user.id, request.notes).await?;
    if let Some(confirmation) = &view.confirmation {
        tracing::info!(order_id = %confirmation.order_id, "checkout complete");
    }
    Ok(Json(view))
}

pub async fn finish(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CheckoutView>> {
    Ok(Json(state.checkout().finish(user.id).await?))
}
