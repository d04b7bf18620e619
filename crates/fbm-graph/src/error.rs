//! Error types for fbm-graph

use thiserror::Error;

use crate::validate::ValidationError;

/// fbm-graph error type
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Facebook page access token not set")]
    AccessTokenNotSet,

    #[error("Facebook app id not set")]
    AppIdNotSet,

    #[error("Facebook app secret not set")]
    AppSecretNotSet,

    #[error("Graph API error ({status}): {message}")]
    Api {
        status: u16,
        message: String,
        code: Option<i64>,
    },

    #[error("Graph API request failed: {0}")]
    Request(String),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("JSON serialization error: {0}")]
    Serialization(String),
}

impl From<reqwest::Error> for GraphError {
    fn from(err: reqwest::Error) -> Self {
        GraphError::Request(err.to_string())
    }
}

impl From<serde_json::Error> for GraphError {
    fn from(err: serde_json::Error) -> Self {
        GraphError::Serialization(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, GraphError>;
