//! ChainTable: bucket heads over an arena of singly-linked chain nodes.
//!
//! Every node lives in a `SlotMap` and is owned by exactly one chain; a
//! chain is the list reached from `buckets[i]` by following `next`. The
//! table knows nothing about hashing policy or key equality. Callers pass
//! the precomputed hash and a match predicate, and the table never invokes
//! user code on its own.
//!
//! Nodes are boxed inside the arena. A `&mut V` handed out by an exclusive
//! cursor points into its own node allocation, so later arena lookups that
//! borrow the slot array (to read bucket links or reach other nodes) do not
//! overlap it.

use slotmap::{new_key_type, SlotMap};
use std::collections::TryReserveError;

new_key_type! {
    /// Arena handle of a single chain node.
    pub(crate) struct NodeKey;
}

#[derive(Debug, Clone)]
pub(crate) struct Node<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    // Hash computed at insertion; rehashing never calls `K: Hash` again.
    pub(crate) hash: u64,
    pub(crate) next: Option<NodeKey>,
}

#[derive(Debug, Clone)]
pub(crate) struct ChainTable<K, V> {
    buckets: Vec<Option<NodeKey>>,
    nodes: SlotMap<NodeKey, Box<Node<K, V>>>,
}

impl<K, V> ChainTable<K, V> {
    /// Empty table with `count` buckets (at least one).
    pub(crate) fn with_buckets(count: usize) -> Self {
        Self {
            buckets: vec![None; count.max(1)],
            nodes: SlotMap::with_key(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    #[inline]
    pub(crate) fn bucket_of(&self, hash: u64) -> usize {
        (hash % self.buckets.len() as u64) as usize
    }

    pub(crate) fn node(&self, k: NodeKey) -> Option<&Node<K, V>> {
        self.nodes.get(k).map(|n| &**n)
    }

    pub(crate) fn node_mut(&mut self, k: NodeKey) -> Option<&mut Node<K, V>> {
        self.nodes.get_mut(k).map(|n| &mut **n)
    }

    /// Value of a node the caller just located or linked.
    pub(crate) fn value_mut(&mut self, k: NodeKey) -> &mut V {
        &mut self.nodes[k].value
    }

    pub(crate) fn chain_len(&self, bucket: usize) -> usize {
        let mut n = 0;
        let mut cur = self.buckets.get(bucket).copied().flatten();
        while let Some(k) = cur {
            n += 1;
            cur = self.nodes[k].next;
        }
        n
    }

    /// Scan the chain for `hash` and return the first node accepted by `is_match`.
    pub(crate) fn find<F>(&self, hash: u64, mut is_match: F) -> Option<(usize, NodeKey)>
    where
        F: FnMut(&K) -> bool,
    {
        let bucket = self.bucket_of(hash);
        let mut cur = self.buckets[bucket];
        while let Some(k) = cur {
            let node = &self.nodes[k];
            if is_match(&node.key) {
                return Some((bucket, k));
            }
            cur = node.next;
        }
        None
    }

    /// Link a new node at the head of its chain.
    pub(crate) fn push_front(&mut self, key: K, value: V, hash: u64) -> (usize, NodeKey) {
        let bucket = self.bucket_of(hash);
        let next = self.buckets[bucket];
        let k = self.nodes.insert(Box::new(Node {
            key,
            value,
            hash,
            next,
        }));
        self.buckets[bucket] = Some(k);
        (bucket, k)
    }

    /// Unlink and return the first node of the `hash` chain accepted by `is_match`.
    ///
    /// Walks the chain keeping the predecessor handle, then either rewrites
    /// the bucket head or the predecessor's `next`.
    pub(crate) fn unlink<F>(&mut self, hash: u64, mut is_match: F) -> Option<Node<K, V>>
    where
        F: FnMut(&K) -> bool,
    {
        let bucket = self.bucket_of(hash);
        let mut pred: Option<NodeKey> = None;
        let mut cur = self.buckets[bucket];
        while let Some(k) = cur {
            let node = &self.nodes[k];
            if is_match(&node.key) {
                break;
            }
            pred = cur;
            cur = node.next;
        }
        let target = cur?;
        self.detach(bucket, pred, target);
        self.nodes.remove(target).map(|n| *n)
    }

    fn detach(&mut self, bucket: usize, pred: Option<NodeKey>, target: NodeKey) {
        let next = self.nodes[target].next;
        match pred {
            None => self.buckets[bucket] = next,
            Some(p) => self.nodes[p].next = next,
        }
    }

    /// Drop every node rejected by `keep`, chain by chain.
    pub(crate) fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        for bucket in 0..self.buckets.len() {
            let mut pred: Option<NodeKey> = None;
            let mut cur = self.buckets[bucket];
            while let Some(k) = cur {
                let node: &mut Node<K, V> = &mut self.nodes[k];
                cur = node.next;
                if keep(&node.key, &mut node.value) {
                    pred = Some(k);
                } else {
                    self.detach(bucket, pred, k);
                    self.nodes.remove(k);
                }
            }
        }
    }

    /// Unlink the head of the first non-empty chain at or after `from`.
    pub(crate) fn pop_front(&mut self, from: usize) -> Option<(usize, Node<K, V>)> {
        let (bucket, head) = self.seek(from);
        let head = head?;
        self.detach(bucket, None, head);
        self.nodes.remove(head).map(|n| (bucket, *n))
    }

    /// Forward search: the first non-empty bucket at or after `from`, or the
    /// end sentinel `(bucket_count, None)`.
    pub(crate) fn seek(&self, from: usize) -> (usize, Option<NodeKey>) {
        let mut bucket = from;
        while bucket < self.buckets.len() {
            if let Some(head) = self.buckets[bucket] {
                return (bucket, Some(head));
            }
            bucket += 1;
        }
        (self.buckets.len(), None)
    }

    /// Position after `node`: its chain successor, or a forward search from
    /// the next bucket.
    pub(crate) fn step(&self, bucket: usize, node: NodeKey) -> (usize, Option<NodeKey>) {
        match self.nodes.get(node).and_then(|n| n.next) {
            Some(next) => (bucket, Some(next)),
            None => self.seek(bucket + 1),
        }
    }

    /// Allocate an empty bucket array of `count` heads without touching the table.
    pub(crate) fn stage(count: usize) -> Result<Vec<Option<NodeKey>>, TryReserveError> {
        let mut staged = Vec::new();
        staged.try_reserve_exact(count)?;
        staged.resize(count, None);
        Ok(staged)
    }

    /// Move every node onto `staged`, pushing at the head of its new chain,
    /// then adopt `staged` as the bucket array. Does not allocate.
    pub(crate) fn relink(&mut self, mut staged: Vec<Option<NodeKey>>) {
        debug_assert!(staged.len() >= self.buckets.len());
        debug_assert!(staged.iter().all(Option::is_none));
        let count = staged.len() as u64;
        for &head in &self.buckets {
            let mut cur = head;
            while let Some(k) = cur {
                let node = &mut self.nodes[k];
                cur = node.next;
                let bucket = (node.hash % count) as usize;
                node.next = staged[bucket];
                staged[bucket] = Some(k);
            }
        }
        self.buckets = staged;
    }

    /// Drop every node; the bucket count is kept.
    pub(crate) fn clear(&mut self) {
        for head in self.buckets.iter_mut() {
            *head = None;
        }
        self.nodes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys_of(t: &ChainTable<u64, u64>, bucket: usize) -> Vec<u64> {
        let mut out = Vec::new();
        let (b, mut cur) = t.seek(bucket);
        if b != bucket {
            return out;
        }
        while let Some(k) = cur {
            let n = t.node(k).unwrap();
            out.push(n.key);
            cur = n.next;
        }
        out
    }

    /// Invariant: a table always has at least one bucket.
    #[test]
    fn zero_buckets_rounds_up_to_one() {
        let t: ChainTable<u64, u64> = ChainTable::with_buckets(0);
        assert_eq!(t.bucket_count(), 1);
        assert_eq!(t.seek(0), (1, None));
    }

    /// Invariant: chains are LIFO; the latest push is visited first.
    #[test]
    fn push_front_is_lifo() {
        let mut t = ChainTable::with_buckets(1);
        for k in 0..4u64 {
            t.push_front(k, k * 10, k);
        }
        assert_eq!(keys_of(&t, 0), vec![3, 2, 1, 0]);
        assert_eq!(t.chain_len(0), 4);
        assert_eq!(t.len(), 4);
    }

    /// Invariant: unlinking the head, a middle node and the tail keeps the
    /// remaining chain intact; a miss changes nothing.
    #[test]
    fn unlink_head_middle_tail_and_miss() {
        let mut t = ChainTable::with_buckets(1);
        for k in 0..5u64 {
            t.push_front(k, k, k);
        }
        // chain: 4 3 2 1 0
        assert_eq!(t.unlink(4, |k| *k == 4).map(|n| n.key), Some(4));
        assert_eq!(keys_of(&t, 0), vec![3, 2, 1, 0]);
        assert_eq!(t.unlink(2, |k| *k == 2).map(|n| n.value), Some(2));
        assert_eq!(keys_of(&t, 0), vec![3, 1, 0]);
        assert_eq!(t.unlink(0, |k| *k == 0).map(|n| n.key), Some(0));
        assert_eq!(keys_of(&t, 0), vec![3, 1]);
        assert!(t.unlink(9, |k| *k == 9).is_none());
        assert_eq!(t.len(), 2);
    }

    /// Invariant: `seek`/`step` visit every node exactly once and finish on
    /// the end sentinel, skipping empty buckets.
    #[test]
    fn seek_and_step_cover_all_nodes() {
        let mut t = ChainTable::with_buckets(8);
        for k in [1u64, 3, 9, 6] {
            t.push_front(k, k, k);
        }
        let mut seen = Vec::new();
        let (mut bucket, mut cur) = t.seek(0);
        while let Some(k) = cur {
            seen.push(t.node(k).unwrap().key);
            (bucket, cur) = t.step(bucket, k);
        }
        assert_eq!(bucket, 8);
        seen.sort_unstable();
        assert_eq!(seen, vec![1, 3, 6, 9]);
    }

    /// Invariant: relinking moves nodes without copying them; every handle
    /// stays valid and lands in `hash % new_count`.
    #[test]
    fn relink_preserves_handles() {
        let mut t = ChainTable::with_buckets(1);
        let handles: Vec<_> = (0..6u64).map(|k| t.push_front(k, k, k).1).collect();
        let staged = ChainTable::<u64, u64>::stage(4).unwrap();
        t.relink(staged);
        assert_eq!(t.bucket_count(), 4);
        for (k, h) in handles.into_iter().enumerate() {
            let n = t.node(h).unwrap();
            assert_eq!(n.key, k as u64);
            assert!(keys_of(&t, k % 4).contains(&(k as u64)));
        }
        assert_eq!((0..4).map(|b| t.chain_len(b)).sum::<usize>(), 6);
    }

    /// Invariant: staging an impossible array fails without side effects.
    #[test]
    fn stage_reports_allocation_failure() {
        assert!(ChainTable::<u64, u64>::stage(usize::MAX).is_err());
    }

    /// Invariant: `retain` and `pop_front` keep chains consistent.
    #[test]
    fn retain_and_pop_front() {
        let mut t = ChainTable::with_buckets(2);
        for k in 0..8u64 {
            t.push_front(k, k, k);
        }
        t.retain(|k, v| {
            *v += 100;
            k % 3 != 0
        });
        assert_eq!(t.len(), 5);
        let mut popped = Vec::new();
        while let Some((_, n)) = t.pop_front(0) {
            assert!(n.value >= 100);
            popped.push(n.key);
        }
        popped.sort_unstable();
        assert_eq!(popped, vec![1, 2, 4, 5, 7]);
        assert_eq!(t.len(), 0);
        assert_eq!(t.seek(0), (2, None));
    }

    /// Invariant: `clear` drops nodes but keeps the bucket count.
    #[test]
    fn clear_keeps_bucket_count() {
        let mut t = ChainTable::with_buckets(4);
        t.push_front(1u64, 1u64, 1);
        t.clear();
        t.clear();
        assert_eq!(t.len(), 0);
        assert_eq!(t.bucket_count(), 4);
        assert_eq!(t.seek(0), (4, None));
    }
}
