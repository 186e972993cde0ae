//! TTL Cleanup Task
//!
//! Background task that periodically removes expired engine entries.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::engine::MemoryEngine;

/// Spawns a background task that periodically sweeps expired entries out of
/// the engine.
///
/// Expired entries are already invisible to reads; the sweep only returns
/// their memory to the engine's byte budget.
///
/// # Arguments
/// * `engine` - Shared reference to the engine
/// * `cleanup_interval_secs` - Interval in seconds between sweeps
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let engine = Arc::new(MemoryEngine::new(1000, 1 << 20));
/// let cleanup_handle = spawn_cleanup_task(engine.clone(), 1);
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task(engine: Arc<MemoryEngine>, cleanup_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting TTL cleanup task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = engine.cleanup_expired();

            if removed > 0 {
                info!("TTL cleanup: removed {} expired entries", removed);
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
        }
    })
}
