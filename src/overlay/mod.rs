//! Overlay Module
//!
//! Read-through/write-through facade over a volatile engine and the
//! permanent store, with snapshot persistence of permanent entries.
//!
//! - Writes with a positive TTL go to the engine only.
//! - Writes with a TTL of zero or less are recorded in the permanent store,
//!   then written to the engine without expiry.
//! - Reads try the engine first and fall back to the permanent store,
//!   refilling the engine on a fallback hit.

mod permanent;
mod typed;

#[cfg(test)]
mod property_tests;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::PersistConfig;
use crate::engine::{Engine, EngineError};
use crate::error::{CacheError, Result};
use crate::persistence::{FlushReport, SnapshotFile};
use crate::tasks::{FlushScheduler, SchedulerState};

pub use permanent::PermanentStore;
pub use typed::CacheValue;

// == Overlay Stats ==
/// Overlay-level counters; engine counters are reported by the engine itself.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OverlayStats {
    pub persistence_enabled: bool,
    pub permanent_entries: usize,
    /// Engine misses answered from the permanent store and refilled
    pub read_repairs: u64,
    pub flushes: u64,
    pub flush_failures: u64,
    pub last_flush_at: Option<DateTime<Utc>>,
}

// == Overlay ==
/// Durable overlay for permanent entries on top of an [`Engine`].
pub struct Overlay<E: Engine> {
    engine: Arc<E>,
    permanent: Arc<PermanentStore>,
    snapshot: Option<Arc<SnapshotFile>>,
    scheduler: FlushScheduler,
    read_repairs: AtomicU64,
}

impl<E: Engine> Overlay<E> {
    // == Open ==
    /// Builds the overlay.
    ///
    /// With persistence enabled, an existing snapshot is loaded into the
    /// permanent store and every recovered entry is written to the engine
    /// before this returns; the periodic flush task is then started. A
    /// missing snapshot file is not an error, a corrupt one is.
    pub async fn open(engine: Arc<E>, config: PersistConfig) -> Result<Self> {
        let scheduler = FlushScheduler::new(config.flush_interval);

        if !config.enabled {
            return Ok(Self {
                engine,
                permanent: Arc::new(PermanentStore::new()),
                snapshot: None,
                scheduler,
                read_repairs: AtomicU64::new(0),
            });
        }

        if config.flush_interval.is_zero() {
            return Err(CacheError::InvalidConfig(
                "flush interval must be greater than zero".to_string(),
            ));
        }
        if config.file_name.is_empty() {
            return Err(CacheError::InvalidConfig(
                "snapshot file name cannot be empty".to_string(),
            ));
        }

        let file = Arc::new(SnapshotFile::new(&config));
        let permanent = match file.load().await.map_err(CacheError::Decode)? {
            Some(document) => {
                let mut refused = 0usize;
                for record in &document.entries {
                    if let Err(e) = engine.set(record.key.as_bytes(), &record.value, 0) {
                        refused += 1;
                        debug!("Engine refused recovered key '{}': {}", record.key, e);
                    }
                }
                if refused > 0 {
                    warn!(
                        "{} recovered entries did not fit in the engine; they will be served from the permanent store",
                        refused
                    );
                }
                PermanentStore::from_records(document.entries)
            }
            None => PermanentStore::new(),
        };
        let permanent = Arc::new(permanent);

        info!(
            "Persistence enabled: {} snapshot at {:?}, {} permanent entries recovered",
            file.format(),
            file.path(),
            permanent.len().await
        );

        scheduler.start(permanent.clone(), file.clone());

        Ok(Self {
            engine,
            permanent,
            snapshot: Some(file),
            scheduler,
            read_repairs: AtomicU64::new(0),
        })
    }

    // == Put ==
    /// Stores `value` under `key`.
    ///
    /// `expire_seconds <= 0` marks the entry permanent: it is copied into the
    /// permanent store and written to the engine without expiry. Otherwise
    /// the entry goes to the engine only. Fails only if the engine refuses
    /// the write; the permanent copy is kept in that case.
    pub async fn put(&self, key: &str, value: &[u8], expire_seconds: i64) -> Result<()> {
        if expire_seconds <= 0 {
            self.permanent.insert(key, value).await;
            self.engine.set(key.as_bytes(), value, 0)?;
        } else {
            self.engine.set(key.as_bytes(), value, expire_seconds as u64)?;
        }
        Ok(())
    }

    // == Fetch ==
    /// Looks `key` up in the engine, then in the permanent store.
    ///
    /// A permanent-store hit is written back to the engine; failures of that
    /// write are ignored. Returns [`CacheError::NotFound`] when neither tier
    /// has the key.
    pub async fn fetch(&self, key: &str) -> Result<Vec<u8>> {
        match self.engine.get(key.as_bytes()) {
            Ok(value) => return Ok(value),
            Err(EngineError::NotFound) => {}
            Err(e) => debug!("Engine lookup of '{}' failed: {}", key, e),
        }

        let value = self
            .permanent
            .get(key)
            .await
            .ok_or_else(|| CacheError::NotFound(key.to_string()))?;

        match self.engine.set(key.as_bytes(), &value, 0) {
            Ok(()) => {
                self.read_repairs.fetch_add(1, Ordering::Relaxed);
                debug!("Refilled engine with permanent key '{}'", key);
            }
            Err(e) => debug!("Refill of permanent key '{}' skipped: {}", key, e),
        }

        Ok(value)
    }

    // == Flush ==
    /// Writes a snapshot now. Returns `None` when persistence is disabled.
    pub async fn flush(&self) -> Result<Option<FlushReport>> {
        match &self.snapshot {
            Some(file) => file
                .flush(&self.permanent)
                .await
                .map(Some)
                .map_err(CacheError::Encode),
            None => Ok(None),
        }
    }

    // == Shutdown ==
    /// Stops the flush task and writes one final snapshot.
    ///
    /// Safe to call more than once; each call performs the final flush.
    /// Does nothing, and touches no files, when persistence is disabled.
    pub async fn shutdown(&self) -> Result<()> {
        let Some(file) = &self.snapshot else {
            return Ok(());
        };

        self.scheduler.stop().await;

        let report = file
            .flush(&self.permanent)
            .await
            .map_err(CacheError::Encode)?;
        info!(
            "Final snapshot written to {:?}: {} entries",
            file.path(),
            report.entries
        );
        Ok(())
    }

    // == Accessors ==
    /// The engine this overlay writes through to.
    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    pub fn is_persistent(&self) -> bool {
        self.snapshot.is_some()
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    /// Number of permanent entries held.
    pub async fn permanent_len(&self) -> usize {
        self.permanent.len().await
    }

    pub async fn stats(&self) -> OverlayStats {
        let snapshot = self
            .snapshot
            .as_ref()
            .map(|file| file.stats())
            .unwrap_or_default();

        OverlayStats {
            persistence_enabled: self.is_persistent(),
            permanent_entries: self.permanent.len().await,
            read_repairs: self.read_repairs.load(Ordering::Relaxed),
            flushes: snapshot.flushes,
            flush_failures: snapshot.flush_failures,
            last_flush_at: snapshot.last_flush_at,
        }
    }
}
