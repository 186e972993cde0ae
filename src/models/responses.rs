//! Response DTOs for the cache server API
//!
//! Defines the structure of outgoing HTTP response bodies.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::engine::CacheStats;
use crate::overlay::OverlayStats;
use crate::persistence::FlushReport;

/// Response body for the GET operation (GET /get/:key)
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    /// The requested key
    pub key: String,
    /// The stored value, decoded as UTF-8 (invalid sequences replaced)
    pub value: String,
}

impl GetResponse {
    /// Creates a new GetResponse from raw stored bytes
    pub fn new(key: impl Into<String>, value: &[u8]) -> Self {
        Self {
            key: key.into(),
            value: String::from_utf8_lossy(value).into_owned(),
        }
    }
}

/// Response body for the SET operation (PUT /set)
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    /// The key that was set
    pub key: String,
    /// Whether the entry was recorded as permanent
    pub permanent: bool,
}

impl SetResponse {
    /// Creates a new SetResponse
    pub fn new(key: impl Into<String>, permanent: bool) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set successfully", key),
            key,
            permanent,
        }
    }
}

/// Response body for the flush operation (POST /flush)
#[derive(Debug, Clone, Serialize)]
pub struct FlushResponse {
    /// False when persistence is disabled and nothing was written
    pub persisted: bool,
    /// Entries written to the snapshot
    pub entries: usize,
    /// Encoded snapshot size in bytes
    pub bytes: usize,
}

impl FlushResponse {
    pub fn from_report(report: Option<FlushReport>) -> Self {
        match report {
            Some(report) => Self {
                persisted: true,
                entries: report.entries,
                bytes: report.bytes,
            },
            None => Self {
                persisted: false,
                entries: 0,
                bytes: 0,
            },
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Number of engine hits
    pub hits: u64,
    /// Number of engine misses
    pub misses: u64,
    /// Number of engine evictions
    pub evictions: u64,
    /// Current number of entries in the engine
    pub total_entries: usize,
    /// Bytes held by the engine
    pub used_bytes: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// Entries held in the permanent store
    pub permanent_entries: usize,
    /// Engine misses served from the permanent store
    pub read_repairs: u64,
    pub persistence_enabled: bool,
    pub flushes: u64,
    pub flush_failures: u64,
    pub last_flush_at: Option<DateTime<Utc>>,
}

impl StatsResponse {
    /// Combines engine and overlay statistics
    pub fn new(engine: &CacheStats, overlay: OverlayStats) -> Self {
        Self {
            hits: engine.hits,
            misses: engine.misses,
            evictions: engine.evictions,
            total_entries: engine.total_entries,
            used_bytes: engine.used_bytes,
            hit_rate: engine.hit_rate(),
            permanent_entries: overlay.permanent_entries,
            read_repairs: overlay.read_repairs,
            persistence_enabled: overlay.persistence_enabled,
            flushes: overlay.flushes,
            flush_failures: overlay.flush_failures,
            last_flush_at: overlay.last_flush_at,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}
