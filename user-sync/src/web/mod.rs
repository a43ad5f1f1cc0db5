//! Web server module for handling identity provider webhooks.
//!
//! This module provides:
//! - `POST /api/clerk`: verified user lifecycle events
//! - `GET /health`: liveness probe

pub mod handlers;
pub mod signature;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{clerk_webhook, health, AckResponse, AppState, HealthResponse};
pub use signature::{verify_webhook, SignatureError, WebhookHeaders};

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/clerk", post(clerk_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
