//! Snapshot Flush Task
//!
//! Background task that periodically flushes the permanent store to disk.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::overlay::PermanentStore;
use crate::persistence::SnapshotFile;

// == Scheduler State ==
/// Lifecycle of a [`FlushScheduler`]. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

#[derive(Debug)]
struct Lifecycle {
    state: SchedulerState,
    handle: Option<JoinHandle<()>>,
}

// == Flush Scheduler ==
/// Cancellable periodic flusher.
///
/// Each tick of the interval runs one flush. A flush that overruns the
/// interval delays the next tick rather than queueing a burst of them.
/// Failed flushes are logged and the loop keeps going.
#[derive(Debug)]
pub struct FlushScheduler {
    interval: Duration,
    lifecycle: Mutex<Lifecycle>,
    stop_tx: watch::Sender<bool>,
}

impl FlushScheduler {
    /// Creates an idle scheduler ticking every `interval`.
    pub fn new(interval: Duration) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            interval,
            lifecycle: Mutex::new(Lifecycle {
                state: SchedulerState::Idle,
                handle: None,
            }),
            stop_tx,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.lifecycle.lock().state
    }

    // == Start ==
    /// Spawns the flush loop. Only an idle scheduler can be started;
    /// returns false otherwise.
    pub fn start(&self, store: Arc<PermanentStore>, file: Arc<SnapshotFile>) -> bool {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.state != SchedulerState::Idle {
            return false;
        }

        let period = self.interval;
        let mut stop_rx = self.stop_tx.subscribe();

        let handle = tokio::spawn(async move {
            info!(
                "Starting snapshot flush task for {:?} every {:?}",
                file.path(),
                period
            );

            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;

                    // Also fires when the scheduler itself is dropped
                    _ = stop_rx.changed() => break,

                    _ = ticker.tick() => {
                        match file.flush(&store).await {
                            Ok(report) => {
                                debug!("Scheduled flush wrote {} entries", report.entries)
                            }
                            Err(e) => warn!("Scheduled flush to {:?} failed: {}", file.path(), e),
                        }
                    }
                }
            }

            debug!("Snapshot flush task exited");
        });

        lifecycle.state = SchedulerState::Running;
        lifecycle.handle = Some(handle);
        true
    }

    // == Stop ==
    /// Signals the loop to stop and waits for it to exit.
    ///
    /// Idempotent: later calls return immediately. An in-flight flush is
    /// allowed to finish first. Returns true only for the call that
    /// performed the transition.
    pub async fn stop(&self) -> bool {
        let handle = {
            let mut lifecycle = self.lifecycle.lock();
            if lifecycle.state == SchedulerState::Stopped {
                return false;
            }
            lifecycle.state = SchedulerState::Stopped;
            lifecycle.handle.take()
        };

        self.stop_tx.send_replace(true);

        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("Snapshot flush task ended abnormally: {}", e);
            }
        }
        info!("Snapshot flush task stopped");
        true
    }
}

impl Drop for FlushScheduler {
    fn drop(&mut self) {
        self.stop_tx.send_replace(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PersistConfig;
    use crate::persistence::PersistFormat;
    use tempfile::TempDir;

    fn snapshot_file(dir: &TempDir) -> Arc<SnapshotFile> {
        let config = PersistConfig::enabled(
            dir.path(),
            "flush.bin",
            PersistFormat::Binary,
            Duration::from_millis(50),
        );
        Arc::new(SnapshotFile::new(&config))
    }

    #[tokio::test]
    async fn test_scheduler_state_transitions() {
        let dir = TempDir::new().unwrap();
        let scheduler = FlushScheduler::new(Duration::from_millis(50));
        assert_eq!(scheduler.state(), SchedulerState::Idle);

        assert!(scheduler.start(Arc::new(PermanentStore::new()), snapshot_file(&dir)));
        assert_eq!(scheduler.state(), SchedulerState::Running);

        assert!(scheduler.stop().await);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[tokio::test]
    async fn test_scheduler_stop_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let scheduler = FlushScheduler::new(Duration::from_millis(50));
        scheduler.start(Arc::new(PermanentStore::new()), snapshot_file(&dir));

        assert!(scheduler.stop().await);
        assert!(!scheduler.stop().await);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[tokio::test]
    async fn test_scheduler_cannot_restart() {
        let dir = TempDir::new().unwrap();
        let scheduler = FlushScheduler::new(Duration::from_millis(50));

        scheduler.stop().await;

        assert!(!scheduler.start(Arc::new(PermanentStore::new()), snapshot_file(&dir)));
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[tokio::test]
    async fn test_scheduler_flushes_periodically() {
        let dir = TempDir::new().unwrap();
        let file = snapshot_file(&dir);
        let store = Arc::new(PermanentStore::new());
        store.insert("a", b"x").await;

        let scheduler = FlushScheduler::new(Duration::from_millis(50));
        scheduler.start(store.clone(), file.clone());

        tokio::time::sleep(Duration::from_millis(180)).await;
        scheduler.stop().await;

        assert!(file.stats().flushes >= 2);
        let document = file.load().await.unwrap().unwrap();
        assert_eq!(document.entries.len(), 1);
    }

    #[tokio::test]
    async fn test_scheduler_stops_flushing_after_stop() {
        let dir = TempDir::new().unwrap();
        let file = snapshot_file(&dir);

        let scheduler = FlushScheduler::new(Duration::from_millis(30));
        scheduler.start(Arc::new(PermanentStore::new()), file.clone());
        tokio::time::sleep(Duration::from_millis(70)).await;
        scheduler.stop().await;

        let flushed = file.stats().flushes;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(file.stats().flushes, flushed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_stalled_flush_defers_at_most_one_tick() {
        let dir = TempDir::new().unwrap();
        let file = snapshot_file(&dir);
        let store = Arc::new(PermanentStore::new());
        store.insert("a", b"x").await;

        let period = Duration::from_millis(20);
        let scheduler = FlushScheduler::new(period);

        let guard = file.hold_writes().await;
        scheduler.start(store.clone(), file.clone());

        // Ten periods pass while the first scheduled flush is stuck
        tokio::time::sleep(period * 10).await;
        assert_eq!(file.stats().flushes, 0);
        assert!(!dir.path().join("flush.bin.tmp").exists());
        drop(guard);
        let released = Instant::now();

        // Manual flushes race the scheduled ones on the same file
        let manual: Vec<_> = (0..4)
            .map(|_| {
                let file = file.clone();
                let store = store.clone();
                tokio::spawn(async move { file.flush(&store).await })
            })
            .collect();
        for handle in manual {
            handle.await.unwrap().unwrap();
        }

        tokio::time::sleep(period * 5).await;
        scheduler.stop().await;
        let periods = (released.elapsed().as_millis() / period.as_millis()) as u64;

        // stalled flush + one deferred tick + one per period afterwards,
        // with one period of slack, plus the manual ones
        let scheduled = file.stats().flushes - 4;
        assert!(scheduled >= 1);
        assert!(scheduled <= 2 + periods + 1, "{} flushes in {} periods", scheduled, periods);
        assert_eq!(file.stats().flush_failures, 0);
    }

    #[tokio::test]
    async fn test_scheduler_survives_failing_flushes() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();
        let config = PersistConfig::enabled(
            &blocker,
            "flush.bin",
            PersistFormat::Binary,
            Duration::from_millis(30),
        );
        let file = Arc::new(SnapshotFile::new(&config));

        let scheduler = FlushScheduler::new(Duration::from_millis(30));
        scheduler.start(Arc::new(PermanentStore::new()), file.clone());
        tokio::time::sleep(Duration::from_millis(130)).await;

        assert_eq!(scheduler.state(), SchedulerState::Running);
        assert!(file.stats().flush_failures >= 2);
        scheduler.stop().await;
    }
}
