//! chained-hashmap: a single-threaded HashMap with separate chaining,
//! automatic growth and cursor-style iteration.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: an associative container whose chaining, growth and traversal
//!   are explicit and testable, with no aliasing raw links between nodes.
//! - Layers:
//!   - ChainTable<K, V>: bucket heads (`Vec<Option<NodeKey>>`) over a
//!     `SlotMap` arena of boxed nodes; each node owns a `next` handle.
//!     Provides push-front, predecessor-walk unlink, relink and forward
//!     search. Boxing keeps every yielded `&mut V` in its own allocation,
//!     apart from the slot array that later lookups borrow.
//!   - Cursor<'a, K, V, M>: a `(bucket, node)` position generic over a
//!     sealed access tag (`Shared` / `Exclusive`); one traversal body
//!     serves both modes.
//!   - ChainedHashMap<K, V, S, E>: hashing, load-factor policy, error
//!     reporting and the public API.
//!
//! Constraints
//! - Single-threaded: `!Send`/`!Sync` (see `reentrancy`).
//! - Unique keys; an insert never overwrites an existing value.
//! - `len <= max_load_factor * bucket_count` after every mutating call;
//!   growth doubles the bucket count; the bucket count never shrinks.
//! - Chains are LIFO; iteration order is bucket order, newest first within
//!   a chain, and changes whenever the table grows.
//!
//! Hasher and rehashing invariants
//! - Each node stores the `u64` hash computed at insertion. Growth relinks
//!   nodes by their stored hash, so `K: Hash` is never invoked after
//!   insertion and no node is copied.
//! - Growth is staged: the new bucket array is fully allocated before any
//!   node moves, and relinking does not allocate. A failed allocation
//!   leaves the map exactly as it was.
//!
//! Reentrancy policy
//! - User code (`Hash`, `KeyEq`) runs only inside a named section of the
//!   public operation that owns it. In debug builds a map call from inside
//!   such a section panics and names both operations. Removed keys and
//!   values are dropped after the section ends and the chain is consistent
//!   again.
//!
//! Copy semantics
//! - `Clone` copies the arena node for node. A panicking `K::clone` or
//!   `V::clone` unwinds through the partial copy, dropping it; the source
//!   is untouched.
//! - `take` moves the contents out and leaves an empty one-bucket map.

mod chain_table;
mod chained_hash_map;
mod chained_hash_map_proptest;
pub mod cursor;
mod error;
mod key_eq;
mod reentrancy;

// Public surface
pub use chained_hash_map::{ChainedHashMap, Drain, IntoIter, DEFAULT_MAX_LOAD_FACTOR};
pub use cursor::{Cursor, Exclusive, Iter, IterMut, Mutability, Shared};
pub use error::MapError;
pub use key_eq::{DefaultEq, KeyEq};
