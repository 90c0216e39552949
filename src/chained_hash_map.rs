//! ChainedHashMap: hashing, load-factor policy and the public map API over
//! a `ChainTable`.

use crate::chain_table::{ChainTable, Node, NodeKey};
use crate::cursor::{Cursor, Iter, IterMut};
use crate::error::MapError;
use crate::key_eq::{DefaultEq, KeyEq};
use crate::reentrancy::ReentrancyCheck;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::iter::FusedIterator;
use hashbrown::hash_map::DefaultHashBuilder;
use log::{debug, trace, warn};

/// Default maximum load factor.
pub const DEFAULT_MAX_LOAD_FACTOR: f32 = 1.0;

/// A hash map with separate chaining.
///
/// Entries hang off `bucket_count()` singly-linked chains; a key lives in
/// chain `hash(key) % bucket_count()`. New entries are pushed at the head of
/// their chain. Whenever an insertion makes `len() > max_load_factor() *
/// bucket_count()`, the bucket array doubles (repeatedly if needed) before
/// the call returns. The bucket count never shrinks.
///
/// `S` hashes keys; `E` decides key equality and defaults to `Eq` through
/// `Borrow`, like `std::collections::HashMap`.
pub struct ChainedHashMap<K, V, S = DefaultHashBuilder, E = DefaultEq> {
    table: ChainTable<K, V>,
    hasher: S,
    key_eq: E,
    max_load_factor: f32,
    reentrancy: ReentrancyCheck,
}

impl<K, V> ChainedHashMap<K, V> {
    /// Empty map with a single bucket.
    pub fn new() -> Self {
        Self::with_hasher_and_eq(DefaultHashBuilder::default(), DefaultEq)
    }

    /// Empty map with enough buckets for `capacity` entries at the default
    /// load factor.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_buckets(capacity)
    }

    /// Empty map with exactly `buckets` buckets (at least one).
    pub fn with_buckets(buckets: usize) -> Self {
        Self {
            table: ChainTable::with_buckets(buckets),
            ..Self::new()
        }
    }
}

impl<K, V, S, E> Default for ChainedHashMap<K, V, S, E>
where
    S: Default,
    E: Default,
{
    fn default() -> Self {
        Self::with_hasher_and_eq(S::default(), E::default())
    }
}

impl<K, V, S> ChainedHashMap<K, V, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_hasher_and_eq(hasher, DefaultEq)
    }
}

impl<K, V, S, E> ChainedHashMap<K, V, S, E> {
    pub fn with_hasher_and_eq(hasher: S, key_eq: E) -> Self {
        Self {
            table: ChainTable::with_buckets(1),
            hasher,
            key_eq,
            max_load_factor: DEFAULT_MAX_LOAD_FACTOR,
            reentrancy: ReentrancyCheck::new(),
        }
    }

    /// Builder form of [`set_max_load_factor`](Self::set_max_load_factor).
    pub fn with_max_load_factor(mut self, max_load_factor: f32) -> Result<Self, MapError> {
        self.set_max_load_factor(max_load_factor)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.len() == 0
    }

    pub fn bucket_count(&self) -> usize {
        self.table.bucket_count()
    }

    /// Upper bound on the number of entries; node handles use 32-bit indices.
    pub fn max_size(&self) -> usize {
        u32::MAX as usize - 1
    }

    /// Number of entries in chain `bucket`; zero for an out-of-range index.
    pub fn bucket_len(&self, bucket: usize) -> usize {
        self.table.chain_len(bucket)
    }

    pub fn load_factor(&self) -> f32 {
        self.len() as f32 / self.bucket_count() as f32
    }

    pub fn max_load_factor(&self) -> f32 {
        self.max_load_factor
    }

    /// Change the growth threshold.
    ///
    /// Values that are not finite and positive are rejected, and so are
    /// values so small that even the largest bucket count doubling can reach
    /// would not hold a single entry. Lowering the threshold grows the bucket
    /// array right away if the current size no longer fits; if that growth
    /// fails, the old threshold is kept.
    pub fn set_max_load_factor(&mut self, max_load_factor: f32) -> Result<(), MapError> {
        let largest = (usize::MAX / 2 + 1) as f64;
        if !(max_load_factor.is_finite() && max_load_factor > 0.0)
            || f64::from(max_load_factor) * largest < 1.0
        {
            return Err(MapError::InvalidLoadFactor(max_load_factor));
        }
        let previous = core::mem::replace(&mut self.max_load_factor, max_load_factor);
        if let Err(e) = self.grow_to_fit(self.len()) {
            self.max_load_factor = previous;
            return Err(e);
        }
        Ok(())
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    pub fn key_eq(&self) -> &E {
        &self.key_eq
    }

    /// Read-only cursor at the first entry (`begin`).
    pub fn iter(&self) -> Iter<'_, K, V> {
        Cursor::new(&self.table, 0, None)
    }

    /// Read-write cursor at the first entry.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        Cursor::new_mut(&mut self.table, 0, None)
    }

    /// The end sentinel.
    pub fn end(&self) -> Iter<'_, K, V> {
        Cursor::end(&self.table)
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> + '_ {
        self.iter_mut().map(|(_, v)| v)
    }

    /// Drop every entry. The bucket count is kept.
    pub fn clear(&mut self) {
        trace!(
            "clearing {} entries across {} buckets",
            self.len(),
            self.bucket_count()
        );
        self.table.clear();
    }

    /// Remove and yield every entry; the bucket count is kept.
    pub fn drain(&mut self) -> Drain<'_, K, V> {
        Drain {
            table: &mut self.table,
            bucket: 0,
        }
    }

    /// Keep only the entries for which `keep` returns true.
    pub fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        self.table.retain(keep);
    }

    /// Exchange the whole state of two maps without touching any node.
    pub fn swap(&mut self, other: &mut Self) {
        core::mem::swap(self, other);
    }

    /// Move the contents out, leaving an empty single-bucket map behind.
    pub fn take(&mut self) -> Self
    where
        S: Default,
        E: Default,
    {
        core::mem::take(self)
    }

    /// Grow to at least `buckets` buckets, relinking every node.
    ///
    /// A request that is not larger than the current bucket count does
    /// nothing. Panics if the bucket array cannot be allocated; see
    /// [`try_rehash`](Self::try_rehash).
    pub fn rehash(&mut self, buckets: usize) {
        or_panic(self.try_rehash(buckets))
    }

    /// Fallible [`rehash`](Self::rehash). On error the map is unchanged.
    pub fn try_rehash(&mut self, buckets: usize) -> Result<(), MapError> {
        if buckets <= self.bucket_count() {
            return Ok(());
        }
        let staged = self.stage(buckets)?;
        self.relink(staged);
        Ok(())
    }

    /// Make room for `additional` more entries without further growth.
    pub fn reserve(&mut self, additional: usize) {
        or_panic(self.try_reserve(additional))
    }

    pub fn try_reserve(&mut self, additional: usize) -> Result<(), MapError> {
        let required = self
            .len()
            .checked_add(additional)
            .ok_or(MapError::CapacityOverflow)?;
        self.grow_to_fit(required)
    }

    fn fits(&self, len: usize, buckets: usize) -> bool {
        (len as f64) <= f64::from(self.max_load_factor) * buckets as f64
    }

    /// Bucket count after doubling until `len` entries fit, or `None` if they
    /// already do.
    fn grown_bucket_count(&self, len: usize) -> Result<Option<usize>, MapError> {
        let mut buckets = self.bucket_count();
        if self.fits(len, buckets) {
            return Ok(None);
        }
        while !self.fits(len, buckets) {
            buckets = buckets.checked_mul(2).ok_or(MapError::CapacityOverflow)?;
        }
        Ok(Some(buckets))
    }

    fn stage(&self, buckets: usize) -> Result<Vec<Option<NodeKey>>, MapError> {
        ChainTable::<K, V>::stage(buckets).map_err(|e| {
            warn!(
                "failed to allocate {} buckets ({} entries): {}",
                buckets,
                self.len(),
                e
            );
            MapError::AllocationFailure(e)
        })
    }

    /// Staged growth for `len` entries: allocation happens before any node moves.
    fn stage_for(&self, len: usize) -> Result<Option<Vec<Option<NodeKey>>>, MapError> {
        match self.grown_bucket_count(len)? {
            Some(buckets) => self.stage(buckets).map(Some),
            None => Ok(None),
        }
    }

    fn grow_to_fit(&mut self, len: usize) -> Result<(), MapError> {
        if let Some(staged) = self.stage_for(len)? {
            self.relink(staged);
        }
        Ok(())
    }

    fn relink(&mut self, staged: Vec<Option<NodeKey>>) {
        debug!(
            "rehashing {} entries: {} -> {} buckets",
            self.len(),
            self.bucket_count(),
            staged.len()
        );
        self.table.relink(staged);
    }
}

impl<K, V, S, E> ChainedHashMap<K, V, S, E>
where
    S: BuildHasher,
{
    /// Run the user-code part of a lookup: hash `q`, then walk its chain.
    fn locate<Q>(&self, op: &'static str, q: &Q) -> Option<(usize, NodeKey)>
    where
        Q: ?Sized + Hash,
        E: KeyEq<K, Q>,
    {
        self.reentrancy.run(op, || {
            let hash = self.hasher.hash_one(q);
            self.table.find(hash, |k| self.key_eq.equivalent(k, q))
        })
    }

    fn entry_of<Q>(&self, op: &'static str, q: &Q) -> Option<(&K, &V)>
    where
        Q: ?Sized + Hash,
        E: KeyEq<K, Q>,
    {
        let (_, node) = self.locate(op, q)?;
        self.table.node(node).map(|n| (&n.key, &n.value))
    }

    fn value_mut_of<Q>(&mut self, op: &'static str, q: &Q) -> Option<&mut V>
    where
        Q: ?Sized + Hash,
        E: KeyEq<K, Q>,
    {
        let (_, node) = self.locate(op, q)?;
        Some(self.table.value_mut(node))
    }

    /// Read-only cursor at the entry for `q`, or the end cursor.
    pub fn find<Q>(&self, q: &Q) -> Iter<'_, K, V>
    where
        Q: ?Sized + Hash,
        E: KeyEq<K, Q>,
    {
        match self.locate("find", q) {
            Some((bucket, node)) => Cursor::new(&self.table, bucket, Some(node)),
            None => self.end(),
        }
    }

    /// Read-write cursor at the entry for `q`, or an end cursor.
    pub fn find_mut<Q>(&mut self, q: &Q) -> IterMut<'_, K, V>
    where
        Q: ?Sized + Hash,
        E: KeyEq<K, Q>,
    {
        match self.locate("find_mut", q) {
            Some((bucket, node)) => Cursor::new_mut(&mut self.table, bucket, Some(node)),
            None => {
                let end = self.bucket_count();
                Cursor::new_mut(&mut self.table, end, None)
            }
        }
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        Q: ?Sized + Hash,
        E: KeyEq<K, Q>,
    {
        self.entry_of("get", q).map(|(_, v)| v)
    }

    pub fn get_key_value<Q>(&self, q: &Q) -> Option<(&K, &V)>
    where
        Q: ?Sized + Hash,
        E: KeyEq<K, Q>,
    {
        self.entry_of("get_key_value", q)
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        Q: ?Sized + Hash,
        E: KeyEq<K, Q>,
    {
        self.value_mut_of("get_mut", q)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        Q: ?Sized + Hash,
        E: KeyEq<K, Q>,
    {
        self.locate("contains_key", q).is_some()
    }

    /// Number of entries matching `q`: 0 or 1.
    pub fn count<Q>(&self, q: &Q) -> usize
    where
        Q: ?Sized + Hash,
        E: KeyEq<K, Q>,
    {
        usize::from(self.locate("count", q).is_some())
    }

    /// Bucket index that `q` hashes to under the current bucket count.
    pub fn bucket<Q>(&self, q: &Q) -> usize
    where
        Q: ?Sized + Hash,
    {
        let hash = self.reentrancy.run("bucket", || self.hasher.hash_one(q));
        self.table.bucket_of(hash)
    }

    /// Value for `q`, or `MapError::KeyNotFound`.
    pub fn at<Q>(&self, q: &Q) -> Result<&V, MapError>
    where
        Q: ?Sized + Hash,
        E: KeyEq<K, Q>,
    {
        self.entry_of("at", q)
            .map(|(_, v)| v)
            .ok_or(MapError::KeyNotFound)
    }

    pub fn at_mut<Q>(&mut self, q: &Q) -> Result<&mut V, MapError>
    where
        Q: ?Sized + Hash,
        E: KeyEq<K, Q>,
    {
        self.value_mut_of("at_mut", q).ok_or(MapError::KeyNotFound)
    }

    fn unlink<Q>(&mut self, op: &'static str, q: &Q) -> Option<(K, V)>
    where
        Q: ?Sized + Hash,
        E: KeyEq<K, Q>,
    {
        let Self {
            table,
            hasher,
            key_eq,
            reentrancy,
            ..
        } = self;
        let node = reentrancy.run(op, || {
            let hash = hasher.hash_one(q);
            table.unlink(hash, |k| key_eq.equivalent(k, q))
        })?;
        // Unlinked inside the section; K/V drops may reenter from here on.
        let Node { key, value, .. } = node;
        Some((key, value))
    }

    /// Remove the entry for `q` and return it. Absent keys are not an error.
    pub fn remove_entry<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        Q: ?Sized + Hash,
        E: KeyEq<K, Q>,
    {
        self.unlink("remove_entry", q)
    }

    pub fn remove<Q>(&mut self, q: &Q) -> Option<V>
    where
        Q: ?Sized + Hash,
        E: KeyEq<K, Q>,
    {
        self.unlink("remove", q).map(|(_, v)| v)
    }

    /// Remove the entry for `q` if present; otherwise do nothing.
    pub fn erase<Q>(&mut self, q: &Q)
    where
        Q: ?Sized + Hash,
        E: KeyEq<K, Q>,
    {
        let _ = self.unlink("erase", q);
    }
}

fn or_panic<T>(result: Result<T, MapError>) -> T {
    match result {
        Ok(v) => v,
        Err(e) => panic!("{}", e),
    }
}

impl<K, V, S, E> ChainedHashMap<K, V, S, E>
where
    K: Hash,
    S: BuildHasher,
    E: KeyEq<K>,
{
    /// Shared insertion path: `(bucket, node, inserted)`.
    ///
    /// Growth is staged before the new node is linked, so an allocation
    /// failure leaves the map exactly as it was and drops `key` unused.
    /// `make_value` runs only when the key is absent and growth succeeded.
    fn insert_node<F>(
        &mut self,
        op: &'static str,
        key: K,
        make_value: F,
    ) -> Result<(usize, NodeKey, bool), MapError>
    where
        F: FnOnce() -> V,
    {
        let (hash, existing) = self.reentrancy.run(op, || {
            let hash = self.hasher.hash_one(&key);
            let existing = self.table.find(hash, |k| self.key_eq.equivalent(k, &key));
            (hash, existing)
        });
        if let Some((bucket, node)) = existing {
            return Ok((bucket, node, false));
        }
        let staged = self.stage_for(self.len() + 1)?;
        let value = make_value();
        let (mut bucket, node) = self.table.push_front(key, value, hash);
        if let Some(staged) = staged {
            self.relink(staged);
            bucket = self.table.bucket_of(hash);
        }
        Ok((bucket, node, true))
    }

    fn insert_cursor<F>(
        &mut self,
        op: &'static str,
        key: K,
        make_value: F,
    ) -> Result<(IterMut<'_, K, V>, bool), MapError>
    where
        F: FnOnce() -> V,
    {
        let (bucket, node, inserted) = self.insert_node(op, key, make_value)?;
        Ok((Cursor::new_mut(&mut self.table, bucket, Some(node)), inserted))
    }

    /// Insert `key -> value` unless the key is already present.
    ///
    /// Returns a cursor at the entry for `key` and whether it was inserted.
    /// An existing value is never overwritten; the rejected `value` is
    /// dropped.
    pub fn insert(&mut self, key: K, value: V) -> (IterMut<'_, K, V>, bool) {
        or_panic(self.insert_cursor("insert", key, move || value))
    }

    /// Like [`insert`](Self::insert), but builds the value only when the key
    /// is absent.
    pub fn insert_with<F>(&mut self, key: K, make_value: F) -> (IterMut<'_, K, V>, bool)
    where
        F: FnOnce() -> V,
    {
        or_panic(self.insert_cursor("insert_with", key, make_value))
    }

    /// Insert a pair given in any form convertible to `(K, V)`.
    pub fn emplace<P>(&mut self, pair: P) -> (IterMut<'_, K, V>, bool)
    where
        P: Into<(K, V)>,
    {
        let (key, value) = pair.into();
        or_panic(self.insert_cursor("emplace", key, move || value))
    }

    /// Fallible [`insert`](Self::insert); on error the map is unchanged and
    /// both `key` and `value` are dropped.
    pub fn try_insert(&mut self, key: K, value: V) -> Result<(IterMut<'_, K, V>, bool), MapError> {
        self.insert_cursor("try_insert", key, move || value)
    }

    pub fn try_insert_with<F>(
        &mut self,
        key: K,
        make_value: F,
    ) -> Result<(IterMut<'_, K, V>, bool), MapError>
    where
        F: FnOnce() -> V,
    {
        self.insert_cursor("try_insert_with", key, make_value)
    }

    /// Value for `key`, inserting `V::default()` first if it is absent.
    pub fn get_or_insert_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        let (_, node, _) = or_panic(self.insert_node("get_or_insert_default", key, V::default));
        self.table.value_mut(node)
    }
}

impl<K, V, S, E> Clone for ChainedHashMap<K, V, S, E>
where
    K: Clone,
    V: Clone,
    S: Clone,
    E: Clone,
{
    /// Deep copy, node for node. If a key or value clone panics, the nodes
    /// copied so far are dropped during unwinding and no map is produced.
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            hasher: self.hasher.clone(),
            key_eq: self.key_eq.clone(),
            max_load_factor: self.max_load_factor,
            reentrancy: ReentrancyCheck::new(),
        }
    }

    /// Copy assignment: the copy is complete before `self` is replaced.
    fn clone_from(&mut self, source: &Self) {
        let copy = source.clone();
        *self = copy;
    }
}

impl<K, V, S, E> fmt::Debug for ChainedHashMap<K, V, S, E>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Maps are equal when they hold the same keys mapped to equal values;
/// bucket layout and chain order do not matter.
impl<K, V, S, E> PartialEq for ChainedHashMap<K, V, S, E>
where
    K: Hash,
    V: PartialEq,
    S: BuildHasher,
    E: KeyEq<K>,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|ov| v == ov))
    }
}

impl<K, V, S, E> Eq for ChainedHashMap<K, V, S, E>
where
    K: Hash,
    V: Eq,
    S: BuildHasher,
    E: KeyEq<K>,
{
}

/// Inserts each pair in order; for repeated keys the earliest pair wins.
impl<K, V, S, E> Extend<(K, V)> for ChainedHashMap<K, V, S, E>
where
    K: Hash,
    S: BuildHasher,
    E: KeyEq<K>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K, V, S, E> FromIterator<(K, V)> for ChainedHashMap<K, V, S, E>
where
    K: Hash,
    S: BuildHasher + Default,
    E: KeyEq<K> + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::default();
        map.extend(iter);
        map
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for ChainedHashMap<K, V>
where
    K: Hash + Eq,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl<'a, K, V, S, E> IntoIterator for &'a ChainedHashMap<K, V, S, E> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S, E> IntoIterator for &'a mut ChainedHashMap<K, V, S, E> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<K, V, S, E> IntoIterator for ChainedHashMap<K, V, S, E> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            table: self.table,
            bucket: 0,
        }
    }
}

/// Owning iterator; yields entries in the same order as `iter()`.
pub struct IntoIter<K, V> {
    table: ChainTable<K, V>,
    bucket: usize,
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        let (bucket, node) = self.table.pop_front(self.bucket)?;
        self.bucket = bucket;
        Some((node.key, node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.table.len(), Some(self.table.len()))
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}
impl<K, V> FusedIterator for IntoIter<K, V> {}

/// Draining iterator returned by [`ChainedHashMap::drain`]. Entries not
/// consumed are dropped with the iterator.
pub struct Drain<'a, K, V> {
    table: &'a mut ChainTable<K, V>,
    bucket: usize,
}

impl<K, V> Iterator for Drain<'_, K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        let (bucket, node) = self.table.pop_front(self.bucket)?;
        self.bucket = bucket;
        Some((node.key, node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.table.len(), Some(self.table.len()))
    }
}

impl<K, V> ExactSizeIterator for Drain<'_, K, V> {}
impl<K, V> FusedIterator for Drain<'_, K, V> {}

impl<K, V> Drop for Drain<'_, K, V> {
    fn drop(&mut self) {
        self.table.clear();
    }
}
