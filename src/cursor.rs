//! Cursor: a position `(bucket, node)` inside a map, generic over access mode.
//!
//! A single `Cursor<'a, K, V, M>` carries the traversal logic for both read-only
//! (`M = Shared`) and read-write (`M = Exclusive`) access. The mode is a sealed
//! tag type; the only conversion between modes is the widening
//! `Cursor<Exclusive> -> Cursor<Shared>`.
//!
//! A cursor is also an `Iterator`: `next` yields the entry at the current
//! position and then advances, so `map.iter()` walks every live entry once,
//! bucket by bucket and newest-first within a chain.

use crate::chain_table::{ChainTable, NodeKey};
use core::fmt;
use core::iter::FusedIterator;
use core::marker::PhantomData;
use core::ptr::NonNull;

mod sealed {
    pub trait Sealed {}
}

/// Access mode of a [`Cursor`].
pub trait Mutability: sealed::Sealed {}

/// Read-only access; items are `(&K, &V)`.
#[derive(Debug)]
pub enum Shared {}

/// Read-write access to values; items are `(&K, &mut V)`. Keys are never
/// exposed mutably.
#[derive(Debug)]
pub enum Exclusive {}

impl sealed::Sealed for Shared {}
impl sealed::Sealed for Exclusive {}
impl Mutability for Shared {}
impl Mutability for Exclusive {}

pub struct Cursor<'a, K, V, M: Mutability = Shared> {
    // Borrowed for 'a: shared for `Shared`, unique for `Exclusive`.
    table: NonNull<ChainTable<K, V>>,
    bucket: usize,
    node: Option<NodeKey>,
    _marker: PhantomData<(&'a mut ChainTable<K, V>, M)>,
}

/// Read-only cursor, the `begin()`/`find()` result of a shared borrow.
pub type Iter<'a, K, V> = Cursor<'a, K, V, Shared>;
/// Read-write cursor over values.
pub type IterMut<'a, K, V> = Cursor<'a, K, V, Exclusive>;

impl<'a, K, V, M: Mutability> Cursor<'a, K, V, M> {
    fn from_parts(table: NonNull<ChainTable<K, V>>, bucket: usize, node: Option<NodeKey>) -> Self {
        let mut cursor = Cursor {
            table,
            bucket,
            node,
            _marker: PhantomData,
        };
        if cursor.node.is_none() {
            cursor.seek();
        }
        cursor
    }

    #[inline]
    fn table(&self) -> &ChainTable<K, V> {
        // SAFETY: `table` came from a borrow that outlives 'a and therefore
        // `&self`. Exclusive cursors only hand out `&mut V` for nodes they
        // have already stepped past, and this shared view only reads bucket
        // heads, the slot array and nodes not yet yielded.
        unsafe { self.table.as_ref() }
    }

    // At most every entry of the table; zero once at the end.
    fn bounds(&self) -> (usize, Option<usize>) {
        match self.node {
            Some(_) => (1, Some(self.table().len())),
            None => (0, Some(0)),
        }
    }

    fn seek(&mut self) {
        let (bucket, node) = self.table().seek(self.bucket);
        self.bucket = bucket;
        self.node = node;
    }

    /// Move to the next entry; an end cursor stays at the end.
    pub fn advance(&mut self) {
        match self.node {
            Some(node) => {
                let (bucket, next) = self.table().step(self.bucket, node);
                self.bucket = bucket;
                self.node = next;
            }
            None => self.bucket = self.table().bucket_count(),
        }
    }

    /// True when the cursor is the end sentinel.
    pub fn is_end(&self) -> bool {
        self.node.is_none()
    }

    /// Bucket index of the current position; `bucket_count()` at the end.
    pub fn bucket(&self) -> usize {
        self.bucket
    }

    pub fn key(&self) -> Option<&K> {
        self.get().map(|(k, _)| k)
    }

    pub fn value(&self) -> Option<&V> {
        self.get().map(|(_, v)| v)
    }

    /// Entry at the current position, without advancing.
    pub fn get(&self) -> Option<(&K, &V)> {
        let node = self.table().node(self.node?)?;
        Some((&node.key, &node.value))
    }

    fn position(&self) -> (NonNull<ChainTable<K, V>>, Option<NodeKey>) {
        (self.table, self.node)
    }
}

impl<'a, K, V> Cursor<'a, K, V, Shared> {
    /// Cursor at `node`, or a forward search from `bucket` when `node` is `None`.
    pub(crate) fn new(table: &'a ChainTable<K, V>, bucket: usize, node: Option<NodeKey>) -> Self {
        Self::from_parts(NonNull::from(table), bucket, node)
    }

    pub(crate) fn end(table: &'a ChainTable<K, V>) -> Self {
        Self::new(table, table.bucket_count(), None)
    }

    #[inline]
    fn table_ref(&self) -> &'a ChainTable<K, V> {
        // SAFETY: shared cursors are built from `&'a ChainTable`.
        unsafe { &*self.table.as_ptr() }
    }

    /// Entry at the current position, borrowed for the cursor's full lifetime.
    pub fn into_entry(self) -> Option<(&'a K, &'a V)> {
        let node = self.table_ref().node(self.node?)?;
        Some((&node.key, &node.value))
    }
}

impl<'a, K, V> Cursor<'a, K, V, Exclusive> {
    pub(crate) fn new_mut(
        table: &'a mut ChainTable<K, V>,
        bucket: usize,
        node: Option<NodeKey>,
    ) -> Self {
        Self::from_parts(NonNull::from(table), bucket, node)
    }

    #[inline]
    fn node_mut(&mut self, node: NodeKey) -> Option<&'a mut crate::chain_table::Node<K, V>> {
        // SAFETY: exclusive cursors are built from `&'a mut ChainTable`, and
        // each node is handed out at most once: callers step past `node`
        // (or consume the cursor) before the reference escapes. Nodes are
        // separate allocations, so the temporary `&mut ChainTable` and the
        // slot-array borrow inside `node_mut` never cover a node yielded
        // earlier.
        unsafe { (*self.table.as_ptr()).node_mut(node) }
    }

    pub fn value_mut(&mut self) -> Option<&mut V> {
        let node = self.node?;
        self.node_mut(node).map(|n| &mut n.value)
    }

    pub fn into_value_mut(self) -> Option<&'a mut V> {
        self.into_entry_mut().map(|(_, v)| v)
    }

    /// Entry at the current position with a mutable value, borrowed for `'a`.
    pub fn into_entry_mut(mut self) -> Option<(&'a K, &'a mut V)> {
        let node = self.node?;
        let n = self.node_mut(node)?;
        Some((&n.key, &mut n.value))
    }

    /// Give up write access; the reverse conversion does not exist.
    pub fn into_shared(self) -> Cursor<'a, K, V, Shared> {
        Cursor {
            table: self.table,
            bucket: self.bucket,
            node: self.node,
            _marker: PhantomData,
        }
    }
}

impl<'a, K, V> From<Cursor<'a, K, V, Exclusive>> for Cursor<'a, K, V, Shared> {
    fn from(c: Cursor<'a, K, V, Exclusive>) -> Self {
        c.into_shared()
    }
}

impl<K, V> Clone for Cursor<'_, K, V, Shared> {
    fn clone(&self) -> Self {
        Cursor {
            table: self.table,
            bucket: self.bucket,
            node: self.node,
            _marker: PhantomData,
        }
    }
}

/// Cursors are equal when they reference the same node of the same table;
/// all end cursors are equal regardless of bucket index.
impl<'a, 'b, K, V, M, N> PartialEq<Cursor<'b, K, V, N>> for Cursor<'a, K, V, M>
where
    M: Mutability,
    N: Mutability,
{
    fn eq(&self, other: &Cursor<'b, K, V, N>) -> bool {
        let (ta, na) = self.position();
        let (tb, nb) = other.position();
        match (na, nb) {
            (None, None) => true,
            (Some(a), Some(b)) => a == b && ta == tb,
            _ => false,
        }
    }
}

impl<'a, K, V> Iterator for Cursor<'a, K, V, Shared> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.table_ref().node(self.node?)?;
        self.advance();
        Some((&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.bounds()
    }
}

impl<'a, K, V> Iterator for Cursor<'a, K, V, Exclusive> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.node?;
        // Step first: the successor link is read before `current` escapes.
        self.advance();
        let n = self.node_mut(current)?;
        Some((&n.key, &mut n.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.bounds()
    }
}

impl<K, V> FusedIterator for Cursor<'_, K, V, Shared> {}
impl<K, V> FusedIterator for Cursor<'_, K, V, Exclusive> {}

impl<K, V, M> fmt::Debug for Cursor<'_, K, V, M>
where
    K: fmt::Debug,
    V: fmt::Debug,
    M: Mutability,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("bucket", &self.bucket)
            .field("entry", &self.get())
            .finish()
    }
}
