//! Configuration Module
//!
//! Handles loading and managing server and persistence configuration from
//! environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::persistence::PersistFormat;

/// Default snapshot file name
pub const DEFAULT_FILE_NAME: &str = "ngcache.dat";

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries the engine can hold
    pub max_entries: usize,
    /// Maximum bytes (keys + values) the engine can hold
    pub max_memory_bytes: usize,
    /// HTTP server port
    pub server_port: u16,
    /// Background expiry sweep interval in seconds
    pub cleanup_interval: u64,
    /// Snapshot settings for permanent entries
    pub persist: PersistConfig,
}

/// Snapshot settings for permanent entries. Immutable once the overlay is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistConfig {
    /// Whether permanent entries are flushed to and loaded from disk
    pub enabled: bool,
    /// Target directory, empty = current directory
    pub directory: PathBuf,
    /// Snapshot file name inside `directory`
    pub file_name: String,
    /// On-disk encoding
    pub format: PersistFormat,
    /// Period between background flushes
    pub flush_interval: Duration,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_ENTRIES` - Maximum engine entries (default: 10000)
    /// - `MAX_MEMORY_BYTES` - Maximum engine bytes (default: 64 MiB)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Expiry sweep frequency in seconds (default: 1)
    /// - `PERSIST_ENABLED` - Enable snapshots (default: false)
    /// - `PERSIST_DIR` - Snapshot directory (default: current directory)
    /// - `PERSIST_FILE` - Snapshot file name (default: ngcache.dat)
    /// - `PERSIST_FORMAT` - `json` or `binary` (default: binary)
    /// - `PERSIST_INTERVAL_MS` - Flush interval in milliseconds (default: 30000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_entries: env_or("MAX_ENTRIES", defaults.max_entries),
            max_memory_bytes: env_or("MAX_MEMORY_BYTES", defaults.max_memory_bytes),
            server_port: env_or("SERVER_PORT", defaults.server_port),
            cleanup_interval: env_or("CLEANUP_INTERVAL", defaults.cleanup_interval),
            persist: PersistConfig::from_env(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            max_memory_bytes: 64 * 1024 * 1024,
            server_port: 3000,
            cleanup_interval: 1,
            persist: PersistConfig::default(),
        }
    }
}

impl PersistConfig {
    /// Persistence turned off; nothing is read or written.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Persistence turned on with the given location and format.
    pub fn enabled(
        directory: impl Into<PathBuf>,
        file_name: impl Into<String>,
        format: PersistFormat,
        flush_interval: Duration,
    ) -> Self {
        Self {
            enabled: true,
            directory: directory.into(),
            file_name: file_name.into(),
            format,
            flush_interval,
        }
    }

    /// Loads the `PERSIST_*` variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: env_or("PERSIST_ENABLED", defaults.enabled),
            directory: env::var("PERSIST_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.directory),
            file_name: env::var("PERSIST_FILE").unwrap_or(defaults.file_name),
            format: env_or("PERSIST_FORMAT", defaults.format),
            flush_interval: Duration::from_millis(env_or(
                "PERSIST_INTERVAL_MS",
                defaults.flush_interval.as_millis() as u64,
            )),
        }
    }

    /// Full snapshot path: `directory` (or `.`) joined with `file_name`.
    pub fn file_path(&self) -> PathBuf {
        self.resolved_directory().join(&self.file_name)
    }

    /// Directory the snapshot lives in, `.` when none is configured.
    pub fn resolved_directory(&self) -> PathBuf {
        if self.directory.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            self.directory.clone()
        }
    }
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            directory: PathBuf::new(),
            file_name: DEFAULT_FILE_NAME.to_string(),
            format: PersistFormat::Binary,
            flush_interval: Duration::from_secs(30),
        }
    }
}

/// Parses an environment variable, falling back to `default` when unset or invalid.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
