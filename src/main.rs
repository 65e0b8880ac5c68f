//! reviewd - Review ingestion and live analytics service
//!
//! Ingests free-text customer reviews for a set of tenant businesses, runs
//! them through external sentiment engines from a background dispatcher, and
//! pushes live updates to per-tenant WebSocket subscribers.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reviewd::broadcast::BroadcastHub;
use reviewd::config::{load_toml_config, Args};
use reviewd::engine::EngineRegistry;
use reviewd::services::Dispatcher;
use reviewd::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reviewd=info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting reviewd on port {}", args.port);
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Database: {}", args.database.display());

    let toml_config = load_toml_config(args.config.as_deref())
        .context("Failed to load configuration")?;

    let db = reviewd::db::init_database(&args.database)
        .await
        .context("Failed to initialize database")?;
    info!("Database connection established");

    // Claims held by a previous run will never complete; put them back
    reviewd::db::submissions::requeue_stale(&db)
        .await
        .context("Failed to requeue stale submissions")?;

    let engines = Arc::new(EngineRegistry::from_endpoints(&toml_config.engines));
    if engines.is_empty() {
        warn!("No sentiment engines configured; submissions will finalize with zero aspects");
    }

    let hub = BroadcastHub::new();

    // Supervised background dispatcher; cancelled on shutdown after the
    // HTTP server stops accepting work
    let cancel = CancellationToken::new();
    let dispatcher = Dispatcher::new(
        db.clone(),
        engines,
        hub.clone(),
        Duration::from_secs(args.poll_interval_secs),
        args.batch_size,
        cancel.clone(),
    );
    let dispatcher_handle = tokio::spawn(dispatcher.run());

    let state = AppState::new(db, hub);
    let app = reviewd::build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped, draining pipeline");
    cancel.cancel();
    let _ = dispatcher_handle.await;

    info!("Shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
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
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
