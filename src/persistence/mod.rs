//! Persistence Module
//!
//! Snapshot documents, the two on-disk encodings, and the snapshot file that
//! flushes the permanent store to disk and loads it back at startup.

pub mod binary;
mod file;
pub mod json;


use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SnapshotError;

pub use file::{FlushReport, SnapshotFile, SnapshotStats};

// == Public Constants ==
/// Document version written and accepted by both encodings
pub const SNAPSHOT_VERSION: u32 = 1;

// == Snapshot Record ==
/// One permanent key/value pair as stored in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub key: String,
    #[serde(with = "json::base64_bytes")]
    pub value: Vec<u8>,
}

impl SnapshotRecord {
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

// == Snapshot Document ==
/// Point-in-time copy of the permanent store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotDocument {
    pub version: u32,
    /// Seconds since the Unix epoch at generation time
    pub timestamp: i64,
    pub entries: Vec<SnapshotRecord>,
}

impl SnapshotDocument {
    /// Wraps records in a current-version document stamped with the current time.
    pub fn new(entries: Vec<SnapshotRecord>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            timestamp: chrono::Utc::now().timestamp(),
            entries,
        }
    }
}

// == Persist Format ==
/// On-disk encoding of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistFormat {
    /// Indented JSON with base64 values
    Json,
    /// Little-endian length-prefixed records
    #[default]
    Binary,
}

impl PersistFormat {
    /// Encodes a document in this format.
    pub fn encode(self, document: &SnapshotDocument) -> Result<Vec<u8>, SnapshotError> {
        match self {
            PersistFormat::Json => json::encode(document),
            PersistFormat::Binary => binary::encode(document),
        }
    }

    /// Decodes a document, rejecting any version other than [`SNAPSHOT_VERSION`].
    pub fn decode(self, bytes: &[u8]) -> Result<SnapshotDocument, SnapshotError> {
        match self {
            PersistFormat::Json => json::decode(bytes),
            PersistFormat::Binary => binary::decode(bytes),
        }
    }
}

impl fmt::Display for PersistFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistFormat::Json => f.write_str("json"),
            PersistFormat::Binary => f.write_str("binary"),
        }
    }
}

impl FromStr for PersistFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(PersistFormat::Json),
            "binary" | "bin" => Ok(PersistFormat::Binary),
            other => Err(format!("unknown persist format '{}'", other)),
        }
    }
}
