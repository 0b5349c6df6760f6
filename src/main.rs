use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, Level};

use throttlebox::config::ThrottleboxConfig;
use throttlebox::http::{AppState, HttpServer};
use throttlebox::ratelimit::{LimitParams, RateLimiter};

/// Mock HTTP server simulating per-endpoint 429 rate limiting.
#[derive(Debug, Parser)]
#[command(name = "throttlebox", version, about)]
struct Args {
    /// Path to the YAML configuration file
    #[arg(long, default_value = "throttlebox.yaml")]
    config: PathBuf,

    /// Override the configured listen address
    #[arg(long)]
    listen: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    info!("Starting Throttlebox Rate Limit Simulator");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Load configuration; refusing to start without explicit limits
    let config = ThrottleboxConfig::from_file(&args.config)
        .with_context(|| format!("loading configuration from {}", args.config.display()))?;

    let parameters = config.parameters.clone();
    info!(
        max_endpoints = parameters.max_endpoints,
        max_requests = parameters.max_requests,
        retry_after_seconds = parameters.retry_after_seconds,
        seeded = parameters.seed.is_some(),
        "Configuration loaded"
    );

    // Build both tracker tables
    let limits = LimitParams {
        max_requests: parameters.max_requests,
        retry_after_seconds: parameters.retry_after_seconds,
    };
    let state = Arc::new(AppState {
        uniform: RateLimiter::uniform(parameters.max_endpoints, limits),
        heterogeneous: RateLimiter::heterogeneous(parameters.max_endpoints, parameters.seed),
        parameters,
    });
    info!("Tracker tables initialized");

    let listen_addr = args.listen.unwrap_or(config.server.listen_addr);
    let server = HttpServer::bind(listen_addr, state)
        .await
        .with_context(|| format!("binding {listen_addr}"))?;

    // Run the server with graceful shutdown on Ctrl+C or SIGTERM
    server.serve_with_shutdown(shutdown_signal()).await?;

    info!("Throttlebox stopped");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
