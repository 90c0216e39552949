// ChainedHashMap integration suite.
//
// Each test documents what behavior is being verified and which
// invariants are assumed or asserted. The core invariants exercised:
// - Uniqueness: a duplicate insert reports false and keeps the old value.
// - Access: `at` fails with KeyNotFound; `get_or_insert_default` never fails.
// - Erasure: absent keys are a no-op; present keys shrink `len` by one.
// - Growth: the bucket count doubles under load and never shrinks.
// - Iteration: begin..end visits every live entry exactly once.
// - Copy/move: clones are deep; `take` leaves an empty, usable map.
use chained_hashmap::{ChainedHashMap, Cursor, MapError, Shared};
use std::collections::BTreeSet;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// Test: five integer keys inserted into a fresh map.
// Assumes: default load factor 1.0 and one initial bucket.
// Verifies: len is 5 and begin..end yields a permutation of 0..5.
#[test]
fn five_keys_iterate_as_permutation() {
    init_logging();
    let mut m: ChainedHashMap<i32, i32> = ChainedHashMap::new();
    assert_eq!(m.bucket_count(), 1);
    for k in 0..5 {
        let (_, inserted) = m.insert(k, k);
        assert!(inserted);
    }
    assert_eq!(m.len(), 5);
    assert!(m.bucket_count() >= 8);

    let mut visited = Vec::new();
    let mut it = m.iter();
    while it != m.end() {
        let (k, v) = it.get().expect("not at end");
        assert_eq!(k, v);
        visited.push(*k);
        it.advance();
    }
    assert_eq!(visited.len(), 5);
    let set: BTreeSet<i32> = visited.into_iter().collect();
    assert_eq!(set, (0..5).collect());
}

// Test: at/get_or_insert_default on an empty map.
// Assumes: nothing is present initially.
// Verifies: at fails with KeyNotFound, get_or_insert_default inserts the
// default, and a later at succeeds.
#[test]
fn at_then_index_then_at() {
    let mut m: ChainedHashMap<String, u32> = ChainedHashMap::new();
    assert_eq!(m.at("x"), Err(MapError::KeyNotFound));
    assert_eq!(*m.get_or_insert_default("x".to_string()), 0);
    assert_eq!(m.at("x"), Ok(&0));
    *m.get_or_insert_default("x".to_string()) += 5;
    assert_eq!(m.at("x"), Ok(&5));
    assert_eq!(m.len(), 1);
}

// Test: unique keys policy.
// Assumes: a key is inserted once with value 1.
// Verifies: a second insert returns false, points at the old entry and does
// not change the value or len.
#[test]
fn duplicate_insert_rejected() {
    let mut m: ChainedHashMap<&str, i32> = ChainedHashMap::new();
    assert!(m.insert("dup", 1).1);
    let (cursor, inserted) = m.insert("dup", 2);
    assert!(!inserted);
    assert_eq!(cursor.get(), Some((&"dup", &1)));
    assert_eq!(m.len(), 1);
}

// Test: erase semantics.
// Assumes: keys 0..10 are present.
// Verifies: erase of a present key removes one entry, a repeat is a no-op,
// and erase of an absent key is a no-op.
#[test]
fn erase_once_then_noop() {
    let mut m: ChainedHashMap<u8, u8> = (0..10).map(|k| (k, k)).collect();
    m.erase(&4u8);
    assert_eq!(m.len(), 9);
    m.erase(&4u8);
    assert_eq!(m.len(), 9);
    m.erase(&200u8);
    assert_eq!(m.len(), 9);
    assert!(m.find(&4u8).is_end());
}

// Test: growth under insertion pressure.
// Assumes: N exceeds max_load_factor * initial bucket count.
// Verifies: bucket count at least doubled and every key is still found.
#[test]
fn growth_keeps_all_keys_findable() {
    init_logging();
    let mut m: ChainedHashMap<u64, String> = ChainedHashMap::new();
    let initial = m.bucket_count();
    for k in 0..1000u64 {
        m.insert(k, k.to_string());
    }
    assert!(m.bucket_count() >= initial * 2);
    assert!(m.load_factor() <= m.max_load_factor());
    for k in 0..1000u64 {
        assert_eq!(m.get(&k).map(String::as_str), Some(k.to_string().as_str()));
    }
}

// Test: clear is idempotent.
// Assumes: the map holds entries and has grown.
// Verifies: len 0 and unchanged bucket count after one and two clears.
#[test]
fn clear_twice_equals_once() {
    let mut m: ChainedHashMap<u32, u32> = (0..100).map(|k| (k, k)).collect();
    let buckets = m.bucket_count();
    m.clear();
    assert_eq!((m.len(), m.bucket_count()), (0, buckets));
    m.clear();
    assert_eq!((m.len(), m.bucket_count()), (0, buckets));
}

// Test: deep copy independence and move-out.
// Assumes: clone copies every node; take moves the whole state.
// Verifies: mutating the copy leaves the original intact; the moved-from
// map is empty and reusable.
#[test]
fn clone_independence_and_take() {
    let mut original: ChainedHashMap<String, Vec<i32>> = ChainedHashMap::new();
    original.insert("a".into(), vec![1]);
    original.insert("b".into(), vec![2]);

    let mut copy = original.clone();
    copy.get_mut("a").unwrap().push(10);
    copy.erase("b");
    assert_eq!(original.get("a"), Some(&vec![1]));
    assert_eq!(original.get("b"), Some(&vec![2]));

    let moved = original.take();
    assert!(original.is_empty());
    assert_eq!(original.bucket_count(), 1);
    assert_eq!(moved.len(), 2);
    original.insert("c".into(), vec![]);
    assert_eq!(original.len(), 1);
}

// Test: one-way widening from a mutable cursor to a read-only one.
// Assumes: find_mut positions at the key.
// Verifies: the widened cursor refers to the same entry and compares equal
// to a fresh read-only find.
#[test]
fn cursor_widening_keeps_position() {
    let mut m: ChainedHashMap<u32, u32> = (0..16).map(|k| (k, k * 2)).collect();
    let mut c = m.find_mut(&7u32);
    *c.value_mut().unwrap() += 1;
    let shared: Cursor<'_, u32, u32, Shared> = c.into();
    assert_eq!(shared.get(), Some((&7, &15)));
    let bucket = shared.bucket();
    drop(shared);
    let again = m.find(&7u32);
    assert_eq!(again.bucket(), bucket);
    assert_eq!(again, m.find(&7u32));
    assert_ne!(again, m.end());
}

// Test: iteration through IntoIterator for references.
// Assumes: values are updated via `&mut map`.
// Verifies: `for (k, v) in &map` sees every update.
#[test]
fn into_iterator_for_references() {
    let mut m: ChainedHashMap<u16, u16> = (0..50).map(|k| (k, 0)).collect();
    for (k, v) in &mut m {
        *v = *k + 1;
    }
    let mut total = 0u32;
    for (k, v) in &m {
        assert_eq!(*v, *k + 1);
        total += u32::from(*v);
    }
    assert_eq!(total, (1..=50).sum());
}

// Test: error surface.
// Assumes: MapError implements std::error::Error.
// Verifies: errors can be boxed and displayed.
#[test]
fn errors_are_std_errors() {
    let m: ChainedHashMap<u8, u8> = ChainedHashMap::new();
    let err: Box<dyn std::error::Error> = Box::new(m.at(&1u8).unwrap_err());
    assert_eq!(err.to_string(), "key is not found");
    let mut m = m;
    assert!(matches!(
        m.set_max_load_factor(-2.0),
        Err(MapError::InvalidLoadFactor(_))
    ));
    assert!(m.max_size() >= 1 << 31);
}
