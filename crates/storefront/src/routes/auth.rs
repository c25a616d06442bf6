//! Account route handlers: register, login, logout and profile.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::state::AppState;

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Profile edit form data.
#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

async fn log_in(session: &Session, user: &User) -> Result<()> {
    set_current_user(session, &CurrentUser::from(user))
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

/// Create an account and log it in.
#[instrument(skip(state, session, request), fields(email = %request.email))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse> {
    let user = state
        .auth()
        .register(&request.name, &request.email, &request.password)
        .await?;
    log_in(&session, &user).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Verify credentials and start a session.
#[instrument(skip(state, session, request), fields(email = %request.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<LoginRequest>,
) -> Result<Json<User>> {
    let user = state.auth().login(&request.email, &request.password).await?;
    log_in(&session, &user).await?;
    tracing::info!(user_id = %user.id, "user logged in");
    Ok(Json(user))
}

/// End the session.
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_user(&session)
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

/// The logged-in user's account.
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<Json<User>> {
    Ok(Json(state.auth().get_user(current.id).await?))
}

/// Change name and phone number.
#[instrument(skip(state, session, current, request), fields(user_id = %current.id))]
pub async fn update_me(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
    Json(request): Json<ProfileRequest>,
) -> Result<Json<User>> {
    let user = state
        .auth()
        .update_profile(current.id, &request.name, request.phone.as_deref())
        .await?;

    // Keep the session's display name in step.
    session
        .insert(crate::models::session_keys::CURRENT_USER, CurrentUser::from(&user))
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;

    Ok(Json(user))
}
