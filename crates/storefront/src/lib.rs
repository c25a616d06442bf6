//! Furnish storefront library.
//!
//! The shop's JSON API as a library, so the binary, the CLI and the
//! integration tests share one router and one set of services.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod search;
pub mod services;
pub mod state;

use axum::{Router, extract::Request};
use tower_http::trace::TraceLayer;
use tower_sessions::{SessionManagerLayer, SessionStore};

use crate::state::AppState;

/// Build the full application: routes, sessions, request ids and tracing.
///
/// Sentry layers are added by the binary.
pub fn app<S>(state: AppState, sessions: SessionManagerLayer<S>) -> Router
where
    S: SessionStore + Clone,
{
    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request| {
        tracing::info_span!(
            "http_request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = tracing::field::Empty,
            user_id = tracing::field::Empty,
        )
    });

    routes::routes()
        .layer(sessions)
        .layer(axum::middleware::from_fn(
            middleware::request_id_middleware,
        ))
        .layer(trace)
        .with_state(state)
}
