//! ngcache - A size-bounded in-memory cache with durable permanent entries
//!
//! Entries written without expiration are mirrored into a permanent store
//! that is snapshotted to disk and reloaded at startup, so they survive both
//! engine eviction and process restarts.

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod overlay;
pub mod persistence;
pub mod tasks;

pub use api::AppState;
pub use config::{Config, PersistConfig};
pub use engine::{Engine, EngineError, MemoryEngine};
pub use error::{CacheError, Result, SnapshotError};
pub use overlay::{CacheValue, Overlay, OverlayStats};
pub use persistence::PersistFormat;
pub use tasks::spawn_cleanup_task;
