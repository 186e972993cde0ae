//! Background Tasks Module
//!
//! Contains background tasks that run periodically during operation.
//!
//! # Tasks
//! - TTL Cleanup: Removes expired engine entries at configured intervals
//! - Snapshot Flush: Writes the permanent store to disk at configured intervals

mod cleanup;
mod flush;

pub use cleanup::spawn_cleanup_task;
pub use flush::{FlushScheduler, SchedulerState};
