//! Configuration management
//!
//! Settings are resolved in this order:
//! 1. Environment variables (including `.env`)
//! 2. `fbm-gateway.toml`
//! 3. Defaults
//!
//! `${VAR_NAME}` inside the TOML file is replaced with the variable's value.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{CoreError, Result};

/// Default configuration file name, looked up in the working directory
pub const CONFIG_FILE: &str = "fbm-gateway.toml";

/// Facebook page and app credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacebookConfig {
    pub page_id: String,

    /// Page access token used for the Send API
    pub page_access_token: String,

    pub app_id: Option<String>,

    /// App secret; enables `X-Hub-Signature-256` checks when set
    pub app_secret: Option<String>,

    /// Token echoed back during webhook subscription
    pub verify_token: String,

    #[serde(default = "default_graph_version")]
    pub graph_version: String,
}

impl Default for FacebookConfig {
    fn default() -> Self {
        Self {
            page_id: String::new(),
            page_access_token: String::new(),
            app_id: None,
            app_secret: None,
            verify_token: String::new(),
            graph_version: default_graph_version(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_webhook_path")]
    pub webhook_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            webhook_path: default_webhook_path(),
        }
    }
}

/// Dispatcher behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Only dispatch entries addressed to `facebook.page_id`
    #[serde(default = "default_true")]
    pub filter_page: bool,

    #[serde(default = "default_true")]
    pub enable_logging: bool,

    #[serde(default)]
    pub handle_standby_events: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            filter_page: true,
            enable_logging: true,
            handle_standby_events: false,
        }
    }
}

fn default_graph_version() -> String {
    "v18.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_webhook_path() -> String {
    "/webhook".to_string()
}

fn default_true() -> bool {
    true
}

/// Main configuration for fbm-gateway
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub facebook: FacebookConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,
}

impl Config {
    /// Replace `${VAR_NAME}` with the variable's value (empty when unset)
    fn expand_env_vars(value: &str, lookup: &impl Fn(&str) -> Option<String>) -> String {
        let mut result = String::new();
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next();

                let mut var_name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    var_name.push(c);
                }

                if let Some(env_value) = lookup(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// Load a TOML file, then apply environment overrides
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| CoreError::Config(format!("Failed to read config file: {}", e)))?;
        Self::from_toml_str(&content, env_lookup)
    }

    fn from_toml_str(content: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let expanded = Self::expand_env_vars(content, &lookup);

        let toml: TomlConfig = toml::from_str(&expanded)
            .map_err(|e| CoreError::Config(format!("Failed to parse TOML: {}", e)))?;

        let mut cfg = Self::from_toml_config(toml);
        cfg.apply_overrides(&lookup);
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load `.env`, then `fbm-gateway.toml` if present, else the environment only
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!("Loaded environment from {}", path.display());
        }

        if Path::new(CONFIG_FILE).exists() {
            debug!("Loading configuration from {}", CONFIG_FILE);
            return Self::from_toml_file(CONFIG_FILE);
        }

        Self::from_env()
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_lookup)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut cfg = Self::default();
        cfg.apply_overrides(&lookup);
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_toml_config(toml: TomlConfig) -> Self {
        let facebook = toml.facebook.unwrap_or_default();
        let server = toml.server.unwrap_or_default();
        let dispatch = toml.dispatch.unwrap_or_default();

        Config {
            facebook: FacebookConfig {
                page_id: facebook.page_id.unwrap_or_default(),
                page_access_token: facebook.page_access_token.unwrap_or_default(),
                app_id: facebook.app_id.filter(|s| !s.is_empty()),
                app_secret: facebook.app_secret.filter(|s| !s.is_empty()),
                verify_token: facebook.verify_token.unwrap_or_default(),
                graph_version: facebook.graph_version.unwrap_or_else(default_graph_version),
            },
            server: ServerConfig {
                port: server.port.unwrap_or_else(default_port),
                webhook_path: server.webhook_path.unwrap_or_else(default_webhook_path),
            },
            dispatch: DispatchConfig {
                filter_page: dispatch.filter_page.unwrap_or(true),
                enable_logging: dispatch.enable_logging.unwrap_or(true),
                handle_standby_events: dispatch.handle_standby_events.unwrap_or(false),
            },
        }
    }

    /// Override settings with non-empty variables
    fn apply_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        let var = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if let Some(page_id) = var("FB_PAGE_ID") {
            self.facebook.page_id = page_id;
        }
        if let Some(token) = var("FB_PAGE_ACCESS_TOKEN") {
            self.facebook.page_access_token = token;
        }
        if let Some(app_id) = var("FB_APP_ID") {
            self.facebook.app_id = Some(app_id);
        }
        if let Some(secret) = var("FB_APP_SECRET") {
            self.facebook.app_secret = Some(secret);
        }
        if let Some(token) = var("FB_VERIFY_TOKEN") {
            self.facebook.verify_token = token;
        }
        if let Some(version) = var("FB_GRAPH_VERSION") {
            self.facebook.graph_version = version;
        }

        if let Some(port) = var("SERVER_PORT") {
            match port.parse() {
                Ok(p) => self.server.port = p,
                Err(_) => warn!("Ignoring invalid SERVER_PORT: {}", port),
            }
        }
        if let Some(path) = var("WEBHOOK_PATH") {
            self.server.webhook_path = path;
        }

        if let Some(flag) = var("DISPATCH_FILTER_PAGE") {
            apply_flag("DISPATCH_FILTER_PAGE", &flag, &mut self.dispatch.filter_page);
        }
        if let Some(flag) = var("DISPATCH_LOGGING") {
            apply_flag("DISPATCH_LOGGING", &flag, &mut self.dispatch.enable_logging);
        }
        if let Some(flag) = var("DISPATCH_STANDBY") {
            apply_flag("DISPATCH_STANDBY", &flag, &mut self.dispatch.handle_standby_events);
        }
    }

    /// Check that the settings the gateway cannot run without are present
    pub fn validate(&self) -> Result<()> {
        if self.facebook.page_access_token.is_empty() {
            return Err(CoreError::MissingSetting("FB_PAGE_ACCESS_TOKEN"));
        }
        if self.facebook.verify_token.is_empty() {
            return Err(CoreError::MissingSetting("FB_VERIFY_TOKEN"));
        }
        if !self.server.webhook_path.starts_with('/') {
            return Err(CoreError::Config(format!(
                "webhook path must start with '/': {}",
                self.server.webhook_path
            )));
        }
        Ok(())
    }

    /// Page id entries are filtered by, if filtering applies
    pub fn dispatch_page_filter(&self) -> Option<&str> {
        if self.dispatch.filter_page && !self.facebook.page_id.is_empty() {
            Some(&self.facebook.page_id)
        } else {
            None
        }
    }
}

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn apply_flag(name: &str, value: &str, target: &mut bool) {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => *target = true,
        "false" | "0" | "no" | "off" => *target = false,
        _ => warn!("Ignoring invalid {}: {}", name, value),
    }
}

// ============================================================================
// TOML file structure
// ============================================================================

#[derive(Debug, Deserialize)]
struct TomlConfig {
    facebook: Option<TomlFacebookConfig>,
    server: Option<TomlServerConfig>,
    dispatch: Option<TomlDispatchConfig>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlFacebookConfig {
    page_id: Option<String>,
    page_access_token: Option<String>,
    app_id: Option<String>,
    app_secret: Option<String>,
    verify_token: Option<String>,
    graph_version: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlServerConfig {
    port: Option<u16>,
    webhook_path: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlDispatchConfig {
    filter_page: Option<bool>,
    enable_logging: Option<bool>,
    handle_standby_events: Option<bool>,
}
