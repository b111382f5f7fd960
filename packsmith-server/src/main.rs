//! packsmith server
//!
//! Builds resource packs on request, publishes them to object storage and
//! keeps the source checkouts in sync with upstream.
//!
//! Usage:
//!   packsmith --port 8000 --data-dir data
//!
//! Every flag also reads an environment variable (`PORT`, `DATA_DIR`, ...).

use anyhow::{Context, Result};
use clap::Parser;
use packsmith_server::{build_router, AppContext, Args, ServerConfig};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let config = ServerConfig::try_from(args).context("Invalid configuration")?;
    info!(
        "packsmith {} starting ({:?}, {:?} store)",
        env!("CARGO_PKG_VERSION"),
        config.environment,
        config.store
    );
    info!("Java tree: {}", config.java_root().display());
    info!("Bedrock tree: {}", config.bedrock_root().display());

    let context = AppContext::from_config(&config)
        .await
        .context("Failed to set up application context")?;
    context.merge_mappings().await;

    let app = build_router(Arc::new(context));
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.port))?;
    info!("Listening on port {}", config.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;
    info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
    }
}
