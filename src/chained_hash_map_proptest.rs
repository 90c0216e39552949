#![cfg(test)]

// Property tests for ChainedHashMap kept inside the crate so they can check
// chain-level invariants that the public API does not expose.

use crate::{ChainedHashMap, MapError};
use proptest::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{BuildHasher, Hasher};

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Pool-indexed operations to improve shrinking.
#[derive(Clone, Debug)]
enum OpI {
    Insert(usize, i32),
    InsertWith(usize, i32),
    Erase(usize),
    Remove(usize),
    At(usize),
    IndexDefault(usize),
    Contains(String),
    Mutate(usize, i32),
    Rehash(usize),
    Clear,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=12).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Insert(i, v)),
            2 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::InsertWith(i, v)),
            2 => idx.clone().prop_map(OpI::Erase),
            1 => idx.clone().prop_map(OpI::Remove),
            2 => idx.clone().prop_map(OpI::At),
            1 => idx.clone().prop_map(OpI::IndexDefault),
            1 => prop_oneof![
                contains_pool.prop_map(|s: String| s),
                "[a-z]{0,5}".prop_map(|s| s)
            ]
            .prop_map(OpI::Contains),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
            1 => (0usize..64).prop_map(OpI::Rehash),
            1 => Just(OpI::Clear),
        ];
        proptest::collection::vec(op, 1..80).prop_map(move |ops| (pool.clone(), ops))
    })
}

fn run_state_machine<S>(
    mut sut: ChainedHashMap<Key, i32, S>,
    pool: Vec<String>,
    ops: Vec<OpI>,
) -> Result<(), TestCaseError>
where
    S: BuildHasher,
{
    let mut model: HashMap<Key, i32> = HashMap::new();
    let mut prev_buckets = sut.bucket_count();

    for op in ops {
        match op {
            OpI::Insert(i, v) => {
                let k = key_from(&pool, i);
                let already = model.contains_key(&k);
                let (cursor, inserted) = sut.insert(k.clone(), v);
                prop_assert_eq!(inserted, !already);
                prop_assert_eq!(cursor.key(), Some(&k));
                let expected = *model.entry(k).or_insert(v);
                prop_assert_eq!(cursor.value(), Some(&expected));
            }
            OpI::InsertWith(i, v) => {
                let k = key_from(&pool, i);
                let already = model.contains_key(&k);
                let mut ran = false;
                let (_, inserted) = sut.insert_with(k.clone(), || {
                    ran = true;
                    v
                });
                prop_assert_eq!(inserted, !already);
                prop_assert_eq!(ran, !already, "constructor runs only on insert");
                model.entry(k).or_insert(v);
            }
            OpI::Erase(i) => {
                let k = key_from(&pool, i);
                sut.erase(&k);
                model.remove(&k);
                prop_assert!(sut.find(&k).is_end());
            }
            OpI::Remove(i) => {
                let k = key_from(&pool, i);
                prop_assert_eq!(sut.remove(k.0.as_str()), model.remove(&k));
            }
            OpI::At(i) => {
                let k = key_from(&pool, i);
                match model.get(&k) {
                    Some(v) => {
                        prop_assert_eq!(sut.at(&k), Ok(v));
                    }
                    None => {
                        prop_assert_eq!(sut.at(&k), Err(MapError::KeyNotFound));
                    }
                }
            }
            OpI::IndexDefault(i) => {
                let k = key_from(&pool, i);
                let expected = *model.entry(k.clone()).or_default();
                prop_assert_eq!(*sut.get_or_insert_default(k), expected);
            }
            OpI::Contains(s) => {
                let has_model = model.keys().any(|k| k.0 == s);
                prop_assert_eq!(sut.contains_key(s.as_str()), has_model);
            }
            OpI::Mutate(i, d) => {
                let k = key_from(&pool, i);
                if let Some(v) = sut.get_mut(&k) {
                    *v = v.saturating_add(d);
                    let mv = model.get_mut(&k).expect("present in model");
                    *mv = mv.saturating_add(d);
                } else {
                    prop_assert!(!model.contains_key(&k));
                }
            }
            OpI::Rehash(n) => {
                let before = sut.bucket_count();
                sut.rehash(n);
                prop_assert_eq!(sut.bucket_count(), before.max(n));
            }
            OpI::Clear => {
                let before = sut.bucket_count();
                sut.clear();
                model.clear();
                prop_assert_eq!(sut.bucket_count(), before);
            }
        }

        // Post-conditions after each op
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        prop_assert!(sut.bucket_count() >= prev_buckets, "bucket count never shrinks");
        let bound = f64::from(sut.max_load_factor()) * sut.bucket_count() as f64;
        prop_assert!((sut.len() as f64) <= bound, "load factor bound");
        let visited = sut.iter().count();
        prop_assert_eq!(visited, sut.len(), "each entry visited exactly once");
        let seen: BTreeMap<Key, i32> = sut.iter().map(|(k, v)| (k.clone(), *v)).collect();
        let expected: BTreeMap<Key, i32> = model.iter().map(|(k, v)| (k.clone(), *v)).collect();
        prop_assert_eq!(seen, expected);
        let chained: usize = (0..sut.bucket_count()).map(|b| sut.bucket_len(b)).sum();
        prop_assert_eq!(chained, sut.len());
        for (k, _) in sut.iter() {
            prop_assert_eq!(sut.find(k).bucket(), sut.bucket(k));
        }
        prev_buckets = sut.bucket_count();
    }
    Ok(())
}

// Property: state-machine equivalence against std::collections::HashMap.
// Invariants exercised across random operation sequences:
// - Duplicate inserts return false and never overwrite.
// - `at` fails exactly on absent keys; `get_or_insert_default` inserts 0.
// - `erase`/`remove` of an absent key is a no-op.
// - Iteration visits each live entry once and matches the model;
//   chain lengths sum to `len`.
// - Load factor bound holds and the bucket count is monotonic.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run_state_machine(ChainedHashMap::new(), pool, ops)?;
    }
}

// Collision variant using a constant hasher to stress chain walks.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

// Property: same invariants under worst-case collisions, where every entry
// shares one chain and erase exercises head, middle and tail unlinking.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run_state_machine(ChainedHashMap::with_hasher(ConstBuildHasher), pool, ops)?;
    }
}

// Property: a clone is deep. Mutating the copy in arbitrary ways leaves the
// original equal to a snapshot taken before the clone.
proptest! {
    #[test]
    fn prop_clone_independent(
        base in proptest::collection::vec((0u16..64, any::<i32>()), 0..40),
        edits in proptest::collection::vec((0u16..64, any::<i32>()), 0..40),
    ) {
        let original: ChainedHashMap<u16, i32> = base.iter().copied().collect();
        let snapshot: BTreeMap<u16, i32> = original.iter().map(|(k, v)| (*k, *v)).collect();
        let mut copy = original.clone();
        prop_assert!(copy == original);
        for (k, v) in edits {
            if v % 2 == 0 {
                copy.erase(&k);
            } else {
                *copy.get_or_insert_default(k) = v;
            }
        }
        let after: BTreeMap<u16, i32> = original.iter().map(|(k, v)| (*k, *v)).collect();
        prop_assert_eq!(after, snapshot);
    }
}

// Property: order may change across growth but content never does.
proptest! {
    #[test]
    fn prop_growth_preserves_content(keys in proptest::collection::hash_set(any::<u32>(), 0..200)) {
        let mut m: ChainedHashMap<u32, u32> = ChainedHashMap::new();
        for &k in &keys {
            prop_assert!(m.insert(k, k.wrapping_mul(3)).1);
        }
        prop_assert_eq!(m.len(), keys.len());
        if keys.len() > 1 {
            prop_assert!(m.bucket_count() >= 2);
        }
        for &k in &keys {
            prop_assert_eq!(m.get(&k), Some(&k.wrapping_mul(3)));
        }
        let visited: Vec<u32> = m.keys().copied().collect();
        prop_assert_eq!(visited.len(), keys.len());
    }
}
