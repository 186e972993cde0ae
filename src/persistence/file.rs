//! Snapshot File Module
//!
//! Reads the snapshot at startup and writes it atomically on every flush.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::config::PersistConfig;
use crate::error::SnapshotError;
use crate::overlay::PermanentStore;
use crate::persistence::{PersistFormat, SnapshotDocument};

// == Flush Report ==
/// Outcome of one successful flush.
#[derive(Debug, Clone, Serialize)]
pub struct FlushReport {
    /// Entries written
    pub entries: usize,
    /// Encoded size in bytes
    pub bytes: usize,
    /// Document timestamp (seconds since epoch)
    pub timestamp: i64,
}

// == Snapshot Stats ==
/// Flush counters for monitoring.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SnapshotStats {
    pub flushes: u64,
    pub flush_failures: u64,
    pub last_flush_at: Option<DateTime<Utc>>,
}

// == Snapshot File ==
/// The single snapshot file of one overlay.
///
/// Flushes are serialized: at most one encode-and-write runs at a time.
#[derive(Debug)]
pub struct SnapshotFile {
    path: PathBuf,
    tmp_path: PathBuf,
    directory: PathBuf,
    format: PersistFormat,
    write_lock: tokio::sync::Mutex<()>,
    flushes: AtomicU64,
    flush_failures: AtomicU64,
    last_flush_at: Mutex<Option<DateTime<Utc>>>,
}

impl SnapshotFile {
    pub fn new(config: &PersistConfig) -> Self {
        let directory = config.resolved_directory();
        Self {
            path: config.file_path(),
            tmp_path: directory.join(format!("{}.tmp", config.file_name)),
            directory,
            format: config.format,
            write_lock: tokio::sync::Mutex::new(()),
            flushes: AtomicU64::new(0),
            flush_failures: AtomicU64::new(0),
            last_flush_at: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> PersistFormat {
        self.format
    }

    // == Load ==
    /// Reads and decodes the snapshot.
    ///
    /// Returns `Ok(None)` when no snapshot exists yet.
    pub async fn load(&self) -> Result<Option<SnapshotDocument>, SnapshotError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No snapshot at {:?}, starting empty", self.path);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let document = self.format.decode(&bytes)?;
        info!(
            "Loaded {} snapshot from {:?}: {} entries, written at {}",
            self.format,
            self.path,
            document.entries.len(),
            document.timestamp
        );
        Ok(Some(document))
    }

    // == Flush ==
    /// Copies the store under its read lock, then encodes and writes the
    /// copy with the lock released.
    pub async fn flush(&self, store: &PermanentStore) -> Result<FlushReport, SnapshotError> {
        let _guard = self.write_lock.lock().await;

        let document = SnapshotDocument::new(store.snapshot().await);
        let result = self.write_document(&document).await;

        match &result {
            Ok(report) => {
                self.flushes.fetch_add(1, Ordering::Relaxed);
                *self.last_flush_at.lock() = Some(Utc::now());
                debug!(
                    "Flushed {} entries ({} bytes) to {:?}",
                    report.entries, report.bytes, self.path
                );
            }
            Err(_) => {
                self.flush_failures.fetch_add(1, Ordering::Relaxed);
            }
        }

        result
    }

    /// Writes to a temporary file, syncs it, renames it over the snapshot,
    /// then syncs the directory so the rename itself is durable.
    async fn write_document(
        &self,
        document: &SnapshotDocument,
    ) -> Result<FlushReport, SnapshotError> {
        let encoded = self.format.encode(document)?;

        fs::create_dir_all(&self.directory).await?;

        let mut file = fs::File::create(&self.tmp_path).await?;
        file.write_all(&encoded).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&self.tmp_path, &self.path).await?;
        sync_directory(&self.directory).await?;

        Ok(FlushReport {
            entries: document.entries.len(),
            bytes: encoded.len(),
            timestamp: document.timestamp,
        })
    }

    pub fn stats(&self) -> SnapshotStats {
        SnapshotStats {
            flushes: self.flushes.load(Ordering::Relaxed),
            flush_failures: self.flush_failures.load(Ordering::Relaxed),
            last_flush_at: *self.last_flush_at.lock(),
        }
    }

    /// Blocks every flush until the guard is dropped.
    #[cfg(test)]
    pub(crate) async fn hold_writes(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.write_lock.lock().await
    }
}

/// Flushes the directory entry so a completed rename survives a crash.
#[cfg(unix)]
async fn sync_directory(directory: &Path) -> std::io::Result<()> {
    fs::File::open(directory).await?.sync_all().await
}

/// Directories cannot be opened for syncing here; the rename is as durable
/// as the platform makes it.
#[cfg(not(unix))]
async fn sync_directory(_directory: &Path) -> std::io::Result<()> {
    Ok(())
}
