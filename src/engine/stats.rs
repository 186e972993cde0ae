//! Engine Counters
//!
//! Lookup outcomes and eviction totals, plus the gauges filled in when a
//! snapshot of them is taken.

use serde::Serialize;

// == Cache Stats ==
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Lookups answered by the engine
    pub hits: u64,
    /// Lookups for absent or expired keys
    pub misses: u64,
    /// Entries dropped to make room (or via `MemoryEngine::evict`)
    pub evictions: u64,
    /// Live entries at snapshot time
    pub total_entries: usize,
    /// Key and value bytes held at snapshot time
    pub used_bytes: usize,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total lookups seen.
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }

    // == Hit Rate ==
    /// Fraction of lookups that hit; 0.0 before the first lookup.
    pub fn hit_rate(&self) -> f64 {
        match self.lookups() {
            0 => 0.0,
            total => self.hits as f64 / total as f64,
        }
    }

    pub fn record_lookup(&mut self, hit: bool) {
        if hit {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
    }

    pub fn record_evictions(&mut self, count: u64) {
        self.evictions += count;
    }
}
