//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//! Bodies are JSON: `{"error": "..."}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::models::ValidationError;
use crate::services::{AuthError, CheckoutError, OrderError, RecordError};

const INTERNAL: &str = "Internal server error";

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Cart, favorites, address book or saved card operation failed.
    #[error(transparent)]
    Record(#[from] RecordError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Status code and the message safe to show the client.
    fn classify(&self) -> (StatusCode, String) {
        match self {
            Self::Database(err) => repository(err),
            Self::Record(err) => record(err),
            Self::Auth(err) => auth(err),
            Self::Checkout(err) => checkout(err),
            Self::Order(err) => order(err),
            Self::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, self.to_string()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_string()),
        }
    }
}

fn repository(err: &RepositoryError) -> (StatusCode, String) {
    match err {
        RepositoryError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
        RepositoryError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_string())
        }
    }
}

fn record(err: &RecordError) -> (StatusCode, String) {
    match err {
        RecordError::Validation(e) => (StatusCode::BAD_REQUEST, e.to_string()),
        RecordError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
        RecordError::Repository(e) => repository(e),
    }
}

fn auth(err: &AuthError) -> (StatusCode, String) {
    match err {
        AuthError::InvalidCredentials | AuthError::UserNotFound => {
            (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string())
        }
        AuthError::UserAlreadyExists => (
            StatusCode::CONFLICT,
            "An account with this email already exists".to_string(),
        ),
        AuthError::WeakPassword(msg) | AuthError::InvalidProfile(msg) => {
            (StatusCode::BAD_REQUEST, msg.clone())
        }
        AuthError::InvalidEmail(_) => (StatusCode::BAD_REQUEST, "Invalid email address".to_string()),
        AuthError::Repository(e) => repository(e),
        AuthError::PasswordHash => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_string()),
    }
}

fn checkout(err: &CheckoutError) -> (StatusCode, String) {
    let status = match err {
        CheckoutError::EmptyCart
        | CheckoutError::AddressRequired
        | CheckoutError::PaymentMethodRequired
        | CheckoutError::PlaceOrderRequired => StatusCode::BAD_REQUEST,
        CheckoutError::NotAtSummary | CheckoutError::AlreadyPlaced => StatusCode::CONFLICT,
        CheckoutError::AddressNotFound | CheckoutError::PaymentMethodNotFound => {
            StatusCode::NOT_FOUND
        }
        CheckoutError::PlacementFailed => StatusCode::INTERNAL_SERVER_ERROR,
        CheckoutError::Record(e) => return record(e),
    };
    (status, err.to_string())
}

fn order(err: &OrderError) -> (StatusCode, String) {
    match err {
        OrderError::EmptyCart => (StatusCode::BAD_REQUEST, "Your cart is empty".to_string()),
        OrderError::NotFound => (StatusCode::NOT_FOUND, "Order not found".to_string()),
        OrderError::InvalidTransition { from, to } => (
            StatusCode::CONFLICT,
            format!("An order that is {from} cannot become {to}"),
        ),
        OrderError::StaleStatus => (
            StatusCode::CONFLICT,
            "The order changed, please reload".to_string(),
        ),
        OrderError::PlacementFailed => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to place order".to_string(),
        ),
        OrderError::Repository(e) => repository(e),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.classify();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}
