//! Engine Module
//!
//! The volatile tier: a size-bounded, TTL-aware byte store that may evict any
//! entry under pressure, including entries written without expiration.

mod entry;
mod lru;
mod memory;
mod stats;


use thiserror::Error;

// Re-export public types
pub use entry::CacheEntry;
pub use lru::LruTracker;
pub use memory::MemoryEngine;
pub use stats::CacheStats;

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 65_535;

// == Engine Error ==
/// Errors surfaced by an engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Key absent, expired or evicted
    #[error("entry not found")]
    NotFound,

    /// Key exceeds the engine's key length limit
    #[error("key of {len} bytes exceeds limit of {max} bytes")]
    KeyTooLarge { len: usize, max: usize },

    /// Key plus value can never fit in the engine
    #[error("entry of {size} bytes exceeds capacity of {capacity} bytes")]
    EntryTooLarge { size: usize, capacity: usize },
}

// == Engine Trait ==
/// Contract every volatile cache must satisfy to sit under the overlay.
///
/// Implementations are shared between tasks and synchronize internally.
/// A TTL of zero means "no expiry", but the entry may still be evicted.
pub trait Engine: Send + Sync + 'static {
    /// Stores `value` under `key` for `ttl_seconds` (0 = no expiry).
    fn set(&self, key: &[u8], value: &[u8], ttl_seconds: u64) -> Result<(), EngineError>;

    /// Returns a copy of the value, or [`EngineError::NotFound`] on a miss.
    fn get(&self, key: &[u8]) -> Result<Vec<u8>, EngineError>;
}
