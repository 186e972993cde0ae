//! Property-Based Tests for the Overlay
//!
//! A permanent write is always readable back, whether the engine still
//! holds it or the permanent store has to refill it.

use std::collections::HashMap;
use std::sync::Arc;

use proptest::prelude::*;

use crate::config::PersistConfig;
use crate::engine::{Engine, MemoryEngine};
use crate::overlay::Overlay;

const MB: usize = 1024 * 1024;

// == Strategies ==
/// Arbitrary UTF-8 keys, with CJK and emoji forced into the mix
fn key_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "\\PC{1,32}",
        "[缓存键值🔑🦀a-z]{1,16}",
    ]
}

fn value_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..256)
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn overlay_with(max_entries: usize) -> Overlay<MemoryEngine> {
    let engine = Arc::new(MemoryEngine::new(max_entries, MB));
    runtime()
        .block_on(Overlay::open(engine, PersistConfig::disabled()))
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // put(k, v, 0) then fetch(k) returns v.
    #[test]
    fn prop_permanent_put_then_fetch(key in key_strategy(), value in value_strategy()) {
        let rt = runtime();
        let overlay = overlay_with(1000);

        rt.block_on(async {
            overlay.put(&key, &value, 0).await.unwrap();
            assert_eq!(overlay.fetch(&key).await.unwrap(), value);
        });
    }

    // With room for two entries, most reads miss the engine and are
    // answered by read repair; every key still comes back with its last
    // value and lands in the engine again.
    #[test]
    fn prop_tiny_engine_repairs_every_key(
        writes in prop::collection::vec((key_strategy(), value_strategy()), 1..40)
    ) {
        let rt = runtime();
        let overlay = overlay_with(2);

        let expected: HashMap<String, Vec<u8>> = writes.iter().cloned().collect();

        rt.block_on(async {
            for (key, value) in &writes {
                overlay.put(key, value, 0).await.unwrap();
            }
            for (key, value) in &expected {
                assert_eq!(&overlay.fetch(key).await.unwrap(), value);
                assert_eq!(&overlay.engine().get(key.as_bytes()).unwrap(), value);
            }
        });

        prop_assert!(overlay.engine().len() <= 2);
        let repairs = rt.block_on(overlay.stats()).read_repairs;
        if expected.len() > 2 {
            prop_assert!(repairs > 0);
        }
    }
}
