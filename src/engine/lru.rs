//! Recency Index
//!
//! Orders engine keys by last access so the coldest one can be found
//! without scanning.

use std::collections::{BTreeMap, HashMap};

// == LRU Tracker ==
/// Access-order index used for eviction.
///
/// Every touch stamps the key with a fresh tick. `stamps` maps key to tick,
/// `order` maps tick back to key, so touch, remove and eviction are all
/// logarithmic in the number of tracked keys.
#[derive(Debug, Default)]
pub struct LruTracker {
    clock: u64,
    stamps: HashMap<Vec<u8>, u64>,
    order: BTreeMap<u64, Vec<u8>>,
}

impl LruTracker {
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks `key` as the most recently used, tracking it if new.
    pub fn touch(&mut self, key: &[u8]) {
        self.clock += 1;
        let tick = self.clock;

        match self.stamps.get_mut(key) {
            Some(stamp) => {
                let previous = std::mem::replace(stamp, tick);
                if let Some(owned) = self.order.remove(&previous) {
                    self.order.insert(tick, owned);
                }
            }
            None => {
                self.stamps.insert(key.to_vec(), tick);
                self.order.insert(tick, key.to_vec());
            }
        }
    }

    // == Remove ==
    pub fn remove(&mut self, key: &[u8]) {
        if let Some(stamp) = self.stamps.remove(key) {
            self.order.remove(&stamp);
        }
    }

    // == Evict Oldest ==
    /// Stops tracking the coldest key and hands it back.
    pub fn evict_oldest(&mut self) -> Option<Vec<u8>> {
        let (_, key) = self.order.pop_first()?;
        self.stamps.remove(&key);
        Some(key)
    }

    /// The coldest key, still tracked.
    pub fn peek_oldest(&self) -> Option<&[u8]> {
        self.order.first_key_value().map(|(_, key)| key.as_slice())
    }

    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn drain(lru: &mut LruTracker) -> Vec<Vec<u8>> {
        std::iter::from_fn(|| lru.evict_oldest()).collect()
    }

    #[test]
    fn test_insertion_order_without_reads() {
        let mut lru = LruTracker::new();
        for key in [b"a", b"b", b"c"] {
            lru.touch(key);
        }

        assert_eq!(lru.len(), 3);
        assert_eq!(drain(&mut lru), vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
        assert!(lru.is_empty());
    }

    #[test]
    fn test_retouch_moves_key_to_hot_end() {
        let mut lru = LruTracker::new();
        lru.touch(b"a");
        lru.touch(b"b");
        lru.touch(b"c");
        lru.touch(b"a");
        lru.touch(b"b");

        assert_eq!(lru.len(), 3);
        assert_eq!(lru.peek_oldest(), Some(&b"c"[..]));
        assert_eq!(drain(&mut lru), vec![b"c".to_vec(), b"a".to_vec(), b"b".to_vec()]);
    }

    #[test]
    fn test_remove_leaves_no_stale_order_entry() {
        let mut lru = LruTracker::new();
        lru.touch(b"a");
        lru.touch(b"b");
        lru.remove(b"a");
        lru.remove(b"missing");

        assert_eq!(lru.len(), 1);
        assert_eq!(lru.order.len(), 1);
        assert_eq!(lru.evict_oldest(), Some(b"b".to_vec()));
        assert_eq!(lru.evict_oldest(), None);
    }

    #[test]
    fn test_binary_keys() {
        let mut lru = LruTracker::new();
        lru.touch(&[0xff, 0x00]);
        lru.touch(&[0xfe]);
        lru.touch(&[0xff, 0x00]);

        assert_eq!(lru.peek_oldest(), Some(&[0xfe][..]));
    }

    #[test]
    fn test_many_touches_keep_indexes_in_step() {
        let mut lru = LruTracker::new();
        for round in 0..50u8 {
            for key in 0..20u8 {
                if (key + round) % 3 == 0 {
                    lru.touch(&[key]);
                }
            }
        }

        assert_eq!(lru.stamps.len(), lru.order.len());
        assert!(lru.stamps.iter().all(|(key, tick)| lru.order.get(tick) == Some(key)));
    }
}
