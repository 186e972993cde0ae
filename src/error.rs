//! Error types for the cache overlay
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::engine::EngineError;

// == Snapshot Error Enum ==
/// Failures raised while reading or writing a snapshot file.
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// Underlying filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Binary snapshot does not start with the expected magic number
    #[error("Invalid snapshot magic: 0x{0:08X}")]
    BadMagic(u32),

    /// Snapshot was written by an unsupported format version
    #[error("Unsupported snapshot version: expected {expected}, found {found}")]
    UnsupportedVersion { expected: u32, found: u32 },

    /// Input ended while reading the named field
    #[error("Snapshot truncated while reading {0}")]
    Truncated(&'static str),

    /// Structurally invalid content
    #[error("Malformed snapshot: {0}")]
    Malformed(String),

    /// JSON document could not be parsed or produced
    #[error("JSON snapshot error: {0}")]
    Json(#[from] serde_json::Error),
}

// == Cache Error Enum ==
/// Unified error type for the cache overlay.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key absent from both the engine and the permanent store
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Stored bytes do not match the width of the requested type
    #[error("Invalid type: expected {expected}, stored value has {actual_len} bytes")]
    InvalidType {
        expected: &'static str,
        actual_len: usize,
    },

    /// Snapshot could not be written
    #[error("Snapshot encode failed: {0}")]
    Encode(#[source] SnapshotError),

    /// Snapshot could not be read back
    #[error("Snapshot decode failed: {0}")]
    Decode(#[source] SnapshotError),

    /// The engine refused the write
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// JSON value wrapper failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Binary object wrapper could not encode the value
    #[error("Object encode failed: {0}")]
    ObjectEncode(#[from] bincode::error::EncodeError),

    /// Stored bytes are not a binary object of the requested type
    #[error("Object decode failed: {0}")]
    ObjectDecode(#[from] bincode::error::DecodeError),

    /// Rejected configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::InvalidType { .. } | CacheError::ObjectDecode(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            CacheError::Engine(_) => StatusCode::PAYLOAD_TOO_LARGE,
            CacheError::Encode(_)
            | CacheError::Decode(_)
            | CacheError::Serialization(_)
            | CacheError::ObjectEncode(_)
            | CacheError::InvalidConfig(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache overlay.
pub type Result<T> = std::result::Result<T, CacheError>;
