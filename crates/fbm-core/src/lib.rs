//! fbm-core: shared configuration for the Messenger gateway
//!
//! Loads page credentials, server settings and dispatch options from
//! `fbm-gateway.toml`, `.env` and the process environment.

pub mod config;
pub mod error;

pub use config::{Config, DispatchConfig, FacebookConfig, ServerConfig, CONFIG_FILE};
pub use error::{CoreError, Result};
