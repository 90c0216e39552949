// ChainedHashMap property tests over the public API.
//
// Property 1: insert/erase bookkeeping.
//  - Model: set of keys whose insert returned true and were not erased.
//  - Invariant: len() == model size; find locates every model key and no
//    other; erase of a present key lowers len by exactly one.
//
// Property 2: drain and owning iteration return exactly the live entries.
use chained_hashmap::ChainedHashMap;
use proptest::prelude::*;
use std::collections::BTreeSet;

proptest! {
    #[test]
    fn prop_insert_erase_bookkeeping(ops in proptest::collection::vec((any::<bool>(), 0u8..32), 1..200)) {
        let mut m: ChainedHashMap<u8, u32> = ChainedHashMap::new();
        let mut live: BTreeSet<u8> = BTreeSet::new();
        let mut successes = 0usize;
        let mut erased = 0usize;

        for (is_insert, k) in ops {
            if is_insert {
                let (_, inserted) = m.insert(k, u32::from(k) * 7);
                prop_assert_eq!(inserted, live.insert(k));
                if inserted { successes += 1; }
            } else {
                let before = m.len();
                m.erase(&k);
                if live.remove(&k) {
                    prop_assert_eq!(m.len(), before - 1);
                    erased += 1;
                } else {
                    prop_assert_eq!(m.len(), before);
                }
            }
            prop_assert_eq!(m.len(), successes - erased);
        }

        for k in 0u8..32 {
            let c = m.find(&k);
            prop_assert_eq!(!c.is_end(), live.contains(&k));
            if let Some(v) = c.value() {
                prop_assert_eq!(*v, u32::from(k) * 7);
            }
        }
    }

    #[test]
    fn prop_drain_and_into_iter_return_live_entries(keys in proptest::collection::btree_set(any::<i64>(), 0..100)) {
        let mut m: ChainedHashMap<i64, i64> = keys.iter().map(|&k| (k, -k)).collect();
        let buckets = m.bucket_count();
        let drained: BTreeSet<(i64, i64)> = m.drain().collect();
        prop_assert_eq!(drained.len(), keys.len());
        prop_assert!(drained.iter().all(|(k, v)| *v == -*k));
        prop_assert!(m.is_empty());
        prop_assert_eq!(m.bucket_count(), buckets);

        m.extend(keys.iter().map(|&k| (k, k)));
        let owned: BTreeSet<i64> = m.into_iter().map(|(k, _)| k).collect();
        prop_assert_eq!(owned, keys);
    }
}
