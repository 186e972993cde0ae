//! Memory Engine Module
//!
//! Bundled engine combining HashMap storage with LRU tracking and TTL
//! expiration, bounded both by entry count and by bytes held.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::engine::{CacheEntry, CacheStats, Engine, EngineError, LruTracker, MAX_KEY_LENGTH};

// == Engine State ==
#[derive(Debug)]
struct EngineState {
    /// Key-value storage
    entries: HashMap<Vec<u8>, CacheEntry>,
    /// LRU access tracker
    lru: LruTracker,
    /// Performance statistics
    stats: CacheStats,
    /// Bytes held by keys and values
    used_bytes: usize,
}

impl EngineState {
    fn remove(&mut self, key: &[u8]) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                self.used_bytes -= key.len() + entry.value.len();
                self.lru.remove(key);
                true
            }
            None => false,
        }
    }
}

// == Memory Engine ==
/// In-process engine with LRU eviction and TTL support.
///
/// Any entry can be evicted when room is needed, including entries stored
/// without expiration.
#[derive(Debug)]
pub struct MemoryEngine {
    state: Mutex<EngineState>,
    /// Maximum number of entries allowed
    max_entries: usize,
    /// Maximum bytes (keys + values) allowed
    max_bytes: usize,
}

impl MemoryEngine {
    // == Constructor ==
    /// Creates a new engine bounded by `max_entries` and `max_bytes`.
    pub fn new(max_entries: usize, max_bytes: usize) -> Self {
        Self {
            state: Mutex::new(EngineState {
                entries: HashMap::new(),
                lru: LruTracker::new(),
                stats: CacheStats::new(),
                used_bytes: 0,
            }),
            max_entries: max_entries.max(1),
            max_bytes,
        }
    }

    // == Evict ==
    /// Drops a single entry as if it had been evicted under pressure.
    ///
    /// Returns true if the key was present.
    pub fn evict(&self, key: &[u8]) -> bool {
        let mut state = self.state.lock();
        let removed = state.remove(key);
        if removed {
            state.stats.record_evictions(1);
        }
        removed
    }

    // == Cleanup Expired ==
    /// Removes all expired entries. Returns the number of entries removed.
    pub fn cleanup_expired(&self) -> usize {
        let mut state = self.state.lock();
        let expired_keys: Vec<Vec<u8>> = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            state.remove(key);
        }

        expired_keys.len()
    }

    // == Stats ==
    /// Returns current engine statistics.
    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        let mut stats = state.stats.clone();
        stats.total_entries = state.entries.len();
        stats.used_bytes = state.used_bytes;
        stats
    }

    /// Returns the current number of entries in the engine.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Engine for MemoryEngine {
    // == Set ==
    /// Stores a key-value pair, overwriting any previous value.
    ///
    /// Least recently used entries are evicted until both the entry and byte
    /// limits are satisfied.
    fn set(&self, key: &[u8], value: &[u8], ttl_seconds: u64) -> Result<(), EngineError> {
        if key.len() > MAX_KEY_LENGTH {
            return Err(EngineError::KeyTooLarge {
                len: key.len(),
                max: MAX_KEY_LENGTH,
            });
        }

        let size = key.len() + value.len();
        if size > self.max_bytes {
            return Err(EngineError::EntryTooLarge {
                size,
                capacity: self.max_bytes,
            });
        }

        let entry = CacheEntry::new(value.to_vec(), ttl_seconds);
        let mut state = self.state.lock();

        // Overwrite releases the old entry's bytes first
        state.remove(key);

        let mut evicted = 0;
        while state.entries.len() >= self.max_entries
            || state.used_bytes + size > self.max_bytes
        {
            let Some(evicted_key) = state.lru.evict_oldest() else {
                break;
            };
            if let Some(old) = state.entries.remove(&evicted_key) {
                state.used_bytes -= evicted_key.len() + old.value.len();
            }
            evicted += 1;
        }
        state.stats.record_evictions(evicted);

        state.entries.insert(key.to_vec(), entry);
        state.used_bytes += size;
        state.lru.touch(key);

        Ok(())
    }

    // == Get ==
    /// Retrieves a value by key. Expired entries are removed and reported as
    /// misses.
    fn get(&self, key: &[u8]) -> Result<Vec<u8>, EngineError> {
        let mut state = self.state.lock();

        let lookup = state
            .entries
            .get(key)
            .map(|entry| (entry.is_expired(), entry.value.clone()));

        match lookup {
            Some((false, value)) => {
                state.stats.record_lookup(true);
                state.lru.touch(key);
                Ok(value)
            }
            Some((true, _)) => {
                state.remove(key);
                state.stats.record_lookup(false);
                Err(EngineError::NotFound)
            }
            None => {
                state.stats.record_lookup(false);
                Err(EngineError::NotFound)
            }
        }
    }
}
