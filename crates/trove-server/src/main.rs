//! Trove Server
//!
//! Main entry point for the Trove catalog HTTP server. This binary wires
//! the store, services, and the TRS read surface together with graceful
//! shutdown.

mod backends;
mod config;
mod tracing_setup;

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use trove_service::{DefaultHostedEditor, ServiceRegistry};
use trove_store::{EntryRepository, InMemoryEntryStore};
use trove_trs::AppState;

use config::ServerConfig;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration directory
    #[arg(short, long, env = "CONFIG_DIR", default_value = "config")]
    config_dir: String,

    /// Environment (development, production, etc.)
    #[arg(short, long, env = "ENVIRONMENT", default_value = "development")]
    environment: String,

    /// Server host
    #[arg(long, env = "SERVER_HOST")]
    host: Option<String>,

    /// Server port
    #[arg(short, long, env = "SERVER_PORT")]
    port: Option<u16>,

    /// Log level
    #[arg(long, env = "RUST_LOG")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut config = ServerConfig::load_or_default(&args.config_dir, &args.environment);
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(log_level) = args.log_level {
        config.logging.level = log_level;
    }

    tracing_setup::init(&config.logging);

    info!("Starting Trove Server");
    info!("Environment: {}", args.environment);
    info!("Server: {}", config.bind_address());

    // In-memory store; a relational repository plugs in behind the same
    // trait for persistent deployments.
    let store: Arc<dyn EntryRepository> = Arc::new(InMemoryEntryStore::new());

    let mut services = ServiceRegistry::new(
        store.clone(),
        Vec::new(),
        Arc::new(backends::UnconfiguredParser),
        Vec::new(),
    );
    services.hosted = Arc::new(DefaultHostedEditor::with_version_limit(
        store,
        config.catalog.hosted_version_limit,
    ));

    let state = AppState::new(services, config.catalog.base_url.clone());
    let app = trove_trs::build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config)?);

    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .context("Invalid HTTP bind address")?;
    info!("HTTP Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind HTTP server")?;

    if config.server.graceful_shutdown {
        axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(shutdown_signal(config.server.shutdown_timeout_seconds))
            .await
            .context("HTTP Server error")?;
    } else {
        axum::serve(listener, app.into_make_service())
            .await
            .context("HTTP Server error")?;
    }

    info!("Server shutdown complete");
    Ok(())
}

fn cors_layer(config: &ServerConfig) -> Result<CorsLayer> {
    if config.cors.allowed_origins.is_empty() {
        return Ok(CorsLayer::new().allow_origin(Any).allow_methods(Any));
    }
    let origins = config
        .cors
        .allowed_origins
        .iter()
        .map(|o| o.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()
        .context("Invalid CORS origin")?;
    Ok(CorsLayer::new().allow_origin(origins).allow_methods(Any))
}

/// Graceful shutdown signal handler
///
/// Waits for SIGTERM or SIGINT (Ctrl+C) and then initiates graceful
/// shutdown with a timeout.
async fn shutdown_signal(timeout_seconds: u64) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }

    // Give the server time to finish processing requests
    info!("Waiting up to {} seconds for graceful shutdown", timeout_seconds);
}
