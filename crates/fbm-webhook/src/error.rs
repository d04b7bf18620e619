//! Error types for fbm-webhook

use thiserror::Error;

/// fbm-webhook error type
#[derive(Error, Debug)]
pub enum WebhookError {
    /// The payload's `object` field was not `"page"`.
    #[error("Invalid webhook object type: {0}")]
    InvalidObjectType(String),

    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Webhook verification failed")]
    VerificationFailed,

    #[error("Invalid webhook signature")]
    InvalidSignature,
}

impl From<serde_json::Error> for WebhookError {
    fn from(err: serde_json::Error) -> Self {
        WebhookError::InvalidPayload(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, WebhookError>;
