//! Pingdom to Slack relay binary.

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pingdom_slack::{server, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();

    // RUST_LOG wins over --verbose
    let default_filter = if config.verbose {
        "pingdom_slack=debug,tower_http=debug,info"
    } else {
        "pingdom_slack=info,warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "Starting pingdom-slack");

    for secret in config.missing_secrets() {
        error!(secret, "Required secret not set, health check will fail");
    }

    let port = config.port;
    let state = server::AppState::new(Arc::new(config)).context("Failed to build HTTP clients")?;
    let app = server::build_router(Arc::new(state));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(port, "pingdom-slack listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
