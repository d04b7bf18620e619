//! Error types for fbm-core

use thiserror::Error;

/// Main error type for fbm-core
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required setting: {0}")]
    MissingSetting(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for fbm-core
pub type Result<T> = std::result::Result<T, CoreError>;
