//! Webhook endpoint handlers.
//!
//! The Clerk handler:
//! 1. Verifies the Svix signature over the raw body
//! 2. Parses the event envelope
//! 3. Applies exactly one store operation
//! 4. Acknowledges with 200, or maps the failure to a generic error body

use std::sync::Arc;

use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use serde::Serialize;
use tracing::info;

use crate::error::WebhookError;
use crate::event::UserEvent;
use crate::store::UserStore;
use crate::sync::apply_event;
use crate::web::signature::{verify_webhook, WebhookHeaders};
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn UserStore>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn UserStore>) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Clerk Webhook
// =============================================================================

/// Acknowledgement body.
#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub message: &'static str,
}

/// Clerk user webhook endpoint.
///
/// The body is taken as raw bytes because the signature covers the exact
/// payload as sent.
pub async fn clerk_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<AckResponse>, WebhookError> {
    let webhook_headers = WebhookHeaders::from_header_map(&headers)?;

    info!(
        svix_id = %webhook_headers.id,
        body_length = body.len(),
        "clerk_webhook_received"
    );

    verify_webhook(
        &state.config.signing_secret,
        &webhook_headers,
        &body,
        state.config.signature_tolerance_secs,
    )?;

    let event = UserEvent::from_slice(&body)?;
    let event_type = event.event_type().to_string();

    let outcome = apply_event(state.store.as_ref(), event).await?;

    info!(
        svix_id = %webhook_headers.id,
        event_type = %event_type,
        outcome = ?outcome,
        "clerk_webhook_handled"
    );

    Ok(Json(AckResponse {
        message: "Event received",
    }))
}
