//! Permanent Store Module
//!
//! Authoritative in-memory record of every entry written without expiration.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::persistence::SnapshotRecord;

// == Permanent Store ==
/// Map of permanent entries behind one shared/exclusive lock.
///
/// Entries are only ever overwritten, never removed. The map is populated in
/// bulk exactly once, at construction, from a recovered snapshot.
#[derive(Debug, Default)]
pub struct PermanentStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl PermanentStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from recovered snapshot records. Later duplicates win.
    pub fn from_records(records: impl IntoIterator<Item = SnapshotRecord>) -> Self {
        let entries = records
            .into_iter()
            .map(|record| (record.key, record.value))
            .collect();
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Copies `value` in under `key`, replacing any previous value.
    pub async fn insert(&self, key: &str, value: &[u8]) {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_owned(), value.to_vec());
    }

    /// Returns a copy of the value stored under `key`.
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.read().await.get(key).cloned()
    }

    /// Copies every entry out under the read lock.
    ///
    /// The lock is released before this returns, so callers may perform
    /// slow I/O on the result without blocking readers or writers.
    pub async fn snapshot(&self) -> Vec<SnapshotRecord> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .map(|(key, value)| SnapshotRecord::new(key.clone(), value.clone()))
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
