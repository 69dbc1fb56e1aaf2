//! Resilio inspection server
//!
//! Runs a cache and an operation queue behind an HTTP API, with the
//! background sweep, queue ticker and network watcher attached.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use resilio::api::{create_router, AppState};
use resilio::config::Config;
use resilio::network::NetworkMonitor;
use resilio::tasks::{spawn_cleanup_task, spawn_network_watcher, spawn_queue_ticker};

/// Main entry point for the inspection server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load and validate configuration from environment variables
/// 3. Build the cache, snapshot cache and queue
/// 4. Restore the queue from its last snapshot
/// 5. Start the cleanup sweep, queue ticker and network watcher
/// 6. Serve the API until SIGINT/SIGTERM
///
/// Queue snapshots live in an in-process snapshot cache. They survive a
/// queue rebuild inside one process but not a server restart, so a fresh
/// process always starts with an empty queue.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "resilio=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resilio server");

    let config = Config::from_env();
    config.cache.validate().context("invalid cache configuration")?;
    config.queue.validate().context("invalid queue configuration")?;
    info!(
        port = config.server_port,
        cache_max_size = config.cache.max_size,
        cache_max_entries = config.cache.max_entries,
        eviction = %config.cache.eviction_strategy,
        queue_max_size = config.queue.max_size,
        batching = config.queue.enable_batching,
        "Configuration loaded"
    );

    let state = AppState::from_config(&config);
    // Process-local snapshot storage: nothing survives a restart
    let restored = state.queue.restore().await;
    info!(restored, persistence = "process-local", "Operation queue ready");

    let handles = vec![
        spawn_cleanup_task(state.cache.clone(), config.cleanup_interval),
        spawn_queue_ticker(state.queue.clone(), config.tick_interval),
        spawn_network_watcher(state.queue.clone(), state.network.watch()),
    ];
    info!("Background tasks started");

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(handles))
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM), then aborts the
/// background tasks.
async fn shutdown_signal(handles: Vec<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    for handle in handles {
        handle.abort();
    }
    warn!("Background tasks aborted");
}
