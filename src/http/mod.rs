//! REST surface of the authorization service.

pub mod handlers;
pub mod response;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::engine::AuthorizationEngine;

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub engine: Arc<AuthorizationEngine>,
}

impl AppState {
    pub fn new(engine: Arc<AuthorizationEngine>) -> Self {
        Self { engine }
    }
}

/// Build the service router with tracing and a per-request deadline.
pub fn router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/v1/register", post(handlers::register))
        .route("/v1/token", get(handlers::token).post(handlers::token))
        .route("/v1/validate", get(handlers::validate))
        .route("/v1/key", get(handlers::public_key))
        .route("/.well-known/jwks.json", get(handlers::jwks))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
