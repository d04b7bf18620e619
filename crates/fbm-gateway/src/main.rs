//! fbm-gateway: Facebook Messenger webhook gateway
//!
//! Usage:
//!   fbm-gateway              - Serve the webhook
//!   fbm-gateway --subscribe  - Subscribe the app to the page and exit
//!   fbm-gateway --help       - Show help

mod error;
mod handlers;
mod server;

use std::sync::Arc;

use fbm_core::Config;
use fbm_graph::{GraphClient, DEFAULT_SUBSCRIBED_FIELDS};
use fbm_webhook::{DispatcherOptionsUpdate, WebhookRouter};
use tracing_subscriber::EnvFilter;

use crate::error::GatewayError;
use crate::handlers::{register_default_handlers, GET_STARTED_PAYLOAD};
use crate::server::WebhookState;

/// Run mode
#[derive(Debug, PartialEq, Eq)]
enum RunMode {
    /// Serve the webhook
    Server,
    /// Subscribe the app to the page's webhook fields
    Subscribe,
    Help,
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mode = parse_args(std::env::args().skip(1));

    match mode {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("fbm-gateway {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {}
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::load().map_err(GatewayError::from)?;

    let graph = GraphClient::new(&config.facebook.page_id, &config.facebook.page_access_token)
        .map_err(GatewayError::from)?
        .with_version(&config.facebook.graph_version);
    let graph = match (&config.facebook.app_id, &config.facebook.app_secret) {
        (Some(app_id), Some(app_secret)) => graph.with_app_credentials(app_id, app_secret),
        _ => graph,
    };

    match mode {
        RunMode::Subscribe => subscribe(&config, &graph).await,
        RunMode::Server => run_server(config, graph).await,
        _ => Ok(()),
    }
}

/// Parse command line arguments
fn parse_args<I: IntoIterator<Item = String>>(args: I) -> RunMode {
    for arg in args {
        match arg.as_str() {
            "--subscribe" | "-s" => return RunMode::Subscribe,
            "--help" | "-h" => return RunMode::Help,
            "--version" | "-v" => return RunMode::Version,
            _ => {}
        }
    }

    RunMode::Server
}

/// Print help message
fn print_help() {
    println!("fbm-gateway - Facebook Messenger webhook gateway");
    println!();
    println!("Usage:");
    println!("  fbm-gateway              Serve the webhook");
    println!("  fbm-gateway --subscribe  Subscribe the app to the page and exit");
    println!("  fbm-gateway --help       Show this help message");
    println!("  fbm-gateway --version    Show version");
    println!();
    println!("Environment Variables:");
    println!("  FB_PAGE_ID               Page id (enables entry filtering)");
    println!("  FB_PAGE_ACCESS_TOKEN     Page access token (required)");
    println!("  FB_VERIFY_TOKEN          Webhook verify token (required)");
    println!("  FB_APP_ID                App id (token exchange)");
    println!("  FB_APP_SECRET            App secret (enables signature checks)");
    println!("  FB_GRAPH_VERSION         Graph API version (default: v18.0)");
    println!("  SERVER_PORT              HTTP port (default: 3000)");
    println!("  WEBHOOK_PATH             Webhook route (default: /webhook)");
    println!("  DISPATCH_FILTER_PAGE     Filter entries by page id (default: true)");
    println!("  DISPATCH_LOGGING         Dispatcher logging (default: true)");
    println!("  DISPATCH_STANDBY         Dispatch standby echoes (default: false)");
}

/// Dispatcher options derived from configuration
fn dispatch_options(config: &Config) -> DispatcherOptionsUpdate {
    let update = DispatcherOptionsUpdate::new()
        .enable_logging(config.dispatch.enable_logging)
        .handle_standby_events(config.dispatch.handle_standby_events);
    match config.dispatch_page_filter() {
        Some(page_id) => update.page_id(page_id),
        None => update.clear_page_id(),
    }
}

async fn subscribe(config: &Config, graph: &GraphClient) -> anyhow::Result<()> {
    let subscribed = graph
        .subscribe_app(DEFAULT_SUBSCRIBED_FIELDS)
        .await
        .map_err(GatewayError::from)?;
    tracing::info!(
        "Page {} subscription {}",
        config.facebook.page_id,
        if subscribed { "succeeded" } else { "was not confirmed" }
    );

    graph
        .set_get_started(GET_STARTED_PAYLOAD)
        .await
        .map_err(GatewayError::from)?;
    tracing::info!("Get Started payload set to {}", GET_STARTED_PAYLOAD);

    Ok(())
}

async fn run_server(config: Config, graph: GraphClient) -> anyhow::Result<()> {
    let router = Arc::new(WebhookRouter::new());
    router.set_options(dispatch_options(&config));
    register_default_handlers(&router, Arc::new(graph));

    if config.facebook.app_secret.is_none() {
        tracing::warn!("FB_APP_SECRET not set; webhook signatures will not be checked");
    }

    let state = WebhookState {
        router,
        verify_token: config.facebook.verify_token.clone(),
        app_secret: config.facebook.app_secret.clone(),
    };

    let port = config.server.port;
    let path = config.server.webhook_path.clone();
    let mut handle = tokio::spawn(async move {
        if let Err(e) = server::start_server(port, &path, state).await {
            tracing::error!("Webhook server error: {}", e);
        }
    });

    tracing::info!("fbm-gateway initialized successfully");
    tracing::info!("Press Ctrl+C to exit");

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("Shutting down...");
            handle.abort();
            Ok(())
        }
        _ = &mut handle => {
            anyhow::bail!("Webhook server stopped unexpectedly")
        }
    }
}
