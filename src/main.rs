//! ngcache - A size-bounded in-memory cache with durable permanent entries
//!
//! Serves the overlay over HTTP. Permanent entries are snapshotted in the
//! background and once more on shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ngcache::api::{create_router, AppState};
use ngcache::{spawn_cleanup_task, Config, MemoryEngine, Overlay};

/// Main entry point for the ngcache server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the engine and open the overlay (loads any snapshot)
/// 4. Start background TTL cleanup task
/// 5. Serve the HTTP API on the configured port
/// 6. On SIGINT/SIGTERM, stop serving and write the final snapshot
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ngcache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ngcache server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: max_entries={}, max_memory_bytes={}, port={}, cleanup_interval={}s, persist={}",
        config.max_entries,
        config.max_memory_bytes,
        config.server_port,
        config.cleanup_interval,
        config.persist.enabled
    );

    let engine = Arc::new(MemoryEngine::new(config.max_entries, config.max_memory_bytes));
    let overlay = Overlay::open(engine.clone(), config.persist.clone())
        .await
        .context("failed to open cache overlay")?;
    let state = AppState::new(overlay);
    info!("Cache overlay initialized");

    let cleanup_handle = spawn_cleanup_task(engine, config.cleanup_interval);

    let app = create_router(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cleanup_handle))
        .await
        .context("server error")?;

    state
        .overlay
        .shutdown()
        .await
        .context("final snapshot failed")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the cleanup task and allows graceful shutdown.
async fn shutdown_signal(cleanup_handle: tokio::task::JoinHandle<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
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

    cleanup_handle.abort();
    warn!("Cleanup task aborted");
}
