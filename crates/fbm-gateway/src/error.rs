//! Error types for fbm-gateway

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use fbm_webhook::WebhookError;
use thiserror::Error;
use tracing::warn;

/// Errors surfaced by the gateway binary and its HTTP handlers
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Core error: {0}")]
    Core(#[from] fbm_core::CoreError),

    #[error("Graph API error: {0}")]
    Graph(#[from] fbm_graph::GraphError),

    #[error("Webhook error: {0}")]
    Webhook(#[from] WebhookError),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Webhook(WebhookError::InvalidSignature) => StatusCode::UNAUTHORIZED,
            Self::Webhook(WebhookError::VerificationFailed) => StatusCode::FORBIDDEN,
            Self::Webhook(WebhookError::InvalidPayload(_)) => StatusCode::BAD_REQUEST,
            Self::Webhook(WebhookError::InvalidObjectType(_)) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!("Rejecting webhook request ({}): {}", status, self);
        (status, status.canonical_reason().unwrap_or_default().to_string()).into_response()
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, GatewayError>;
