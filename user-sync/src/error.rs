//! Errors surfaced by the webhook endpoint.
//!
//! Every failure is turned into a status code and a generic JSON body at the
//! handler boundary; details only go to the logs.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::event::PayloadError;
use crate::store::StoreError;
use crate::web::signature::SignatureError;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("authentication failed: {0}")]
    Authentication(#[from] SignatureError),

    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] PayloadError),

    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
}

impl WebhookError {
    pub fn status_and_message(&self) -> (StatusCode, &'static str) {
        match self {
            WebhookError::Authentication(_) => (StatusCode::BAD_REQUEST, "Invalid signature"),
            WebhookError::MalformedPayload(_) => (StatusCode::BAD_REQUEST, "Invalid payload"),
            WebhookError::Storage(StoreError::Conflict(_)) => {
                (StatusCode::CONFLICT, "User already exists")
            }
            WebhookError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Database error"),
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        if status.is_server_error() {
            error!(error = %self, status = status.as_u16(), "webhook_failed");
        } else {
            warn!(error = %self, status = status.as_u16(), "webhook_rejected");
        }

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let auth = WebhookError::from(SignatureError::NoMatchingSignature);
        assert_eq!(
            auth.status_and_message(),
            (StatusCode::BAD_REQUEST, "Invalid signature")
        );

        let payload = WebhookError::from(PayloadError::NoEmailAddress("u1".to_string()));
        assert_eq!(
            payload.status_and_message(),
            (StatusCode::BAD_REQUEST, "Invalid payload")
        );

        let conflict = WebhookError::from(StoreError::Conflict("u1".to_string()));
        assert_eq!(conflict.status_and_message().0, StatusCode::CONFLICT);

        let storage = WebhookError::from(StoreError::Internal("down".to_string()));
        assert_eq!(
            storage.status_and_message(),
            (StatusCode::INTERNAL_SERVER_ERROR, "Database error")
        );
    }
}
