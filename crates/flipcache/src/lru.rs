//! Recency-ordered map backing the image store
//!
//! Entries live in a slab of nodes threaded into a doubly-linked list
//! (head = most recently used, tail = least recently used). The hash map
//! points into the slab, so lookup, promotion and eviction are all O(1).

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use ahash::RandomState;

/// Upper bound on slots reserved up front; capacity is a limit, not a size hint
const PREALLOCATE_LIMIT: usize = 1024;

/// Node in the recency list
struct Node<K, V> {
    key: K,
    value: V,
    prev: Option<usize>,
    next: Option<usize>,
}

/// What a [`LruCache::put`] pushed out of the cache
///
/// Handed back so the caller decides where the old value is dropped.
#[derive(Debug, PartialEq)]
pub(crate) enum Displaced<K, V> {
    Nothing,
    Replaced(V),
    Evicted(K, V),
}

impl<K, V> Displaced<K, V> {
    /// The evicted key, dropping any displaced value
    pub(crate) fn into_evicted_key(self) -> Option<K> {
        match self {
            Displaced::Evicted(key, _) => Some(key),
            Displaced::Nothing | Displaced::Replaced(_) => None,
        }
    }
}

/// Fixed-capacity map with least-recently-used eviction
pub(crate) struct LruCache<K, V> {
    map: HashMap<K, usize, RandomState>,
    nodes: Vec<Option<Node<K, V>>>,
    head: Option<usize>,
    tail: Option<usize>,
    free_list: Vec<usize>,
    capacity: usize,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Create an empty cache. `capacity` must be non-zero; callers validate it.
    pub(crate) fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0, "capacity must be greater than 0");
        let reserved = capacity.min(PREALLOCATE_LIMIT);

        Self {
            map: HashMap::with_capacity_and_hasher(reserved, RandomState::new()),
            nodes: Vec::with_capacity(reserved),
            head: None,
            tail: None,
            free_list: Vec::new(),
            capacity,
        }
    }

    /// Look up `key` and promote it to most recently used
    pub(crate) fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = *self.map.get(key)?;
        self.move_to_front(idx);
        self.nodes[idx].as_ref().map(|node| &node.value)
    }

    /// Membership test that leaves the recency order alone
    pub(crate) fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.contains_key(key)
    }

    /// Insert or replace `key`, making it the most recently used entry.
    ///
    /// Returns the value replaced, or the entry evicted to make room.
    pub(crate) fn put(&mut self, key: K, value: V) -> Displaced<K, V> {
        if let Some(&idx) = self.map.get(&key) {
            let old = self.nodes[idx]
                .as_mut()
                .map(|node| std::mem::replace(&mut node.value, value));
            self.move_to_front(idx);
            return old.map_or(Displaced::Nothing, Displaced::Replaced);
        }

        let evicted = match self.evict_if_full() {
            Some((old_key, old_value)) => Displaced::Evicted(old_key, old_value),
            None => Displaced::Nothing,
        };

        let idx = self.alloc_node();
        self.nodes[idx] = Some(Node {
            key: key.clone(),
            value,
            prev: None,
            next: self.head,
        });
        self.link_head(idx);
        self.map.insert(key, idx);

        evicted
    }

    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }

    /// Keys from most to least recently used
    pub(crate) fn keys(&self) -> Keys<'_, K, V> {
        Keys {
            nodes: &self.nodes,
            cursor: self.head,
        }
    }

    fn move_to_front(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return;
        }

        self.unlink(idx);

        if let Some(node) = &mut self.nodes[idx] {
            node.prev = None;
            node.next = self.head;
        }
        self.link_head(idx);
    }

    /// Point the current head (if any) back at `idx` and make `idx` the head.
    /// The node's own `next` must already reference the old head.
    fn link_head(&mut self, idx: usize) {
        if let Some(head_idx) = self.head {
            if let Some(head) = &mut self.nodes[head_idx] {
                head.prev = Some(idx);
            }
        }

        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = match &self.nodes[idx] {
            Some(node) => (node.prev, node.next),
            None => return,
        };

        match prev {
            Some(prev_idx) => {
                if let Some(prev_node) = &mut self.nodes[prev_idx] {
                    prev_node.next = next;
                }
            }
            None => self.head = next,
        }

        match next {
            Some(next_idx) => {
                if let Some(next_node) = &mut self.nodes[next_idx] {
                    next_node.prev = prev;
                }
            }
            None => self.tail = prev,
        }
    }

    fn evict_if_full(&mut self) -> Option<(K, V)> {
        if self.map.len() < self.capacity {
            return None;
        }
        let tail_idx = self.tail?;
        // Unlink while the node is still in the slab so neighbours get patched.
        self.unlink(tail_idx);
        let node = self.nodes[tail_idx].take()?;
        self.map.remove(&node.key);
        self.free_list.push(tail_idx);
        Some((node.key, node.value))
    }

    fn alloc_node(&mut self) -> usize {
        if let Some(idx) = self.free_list.pop() {
            idx
        } else {
            self.nodes.push(None);
            self.nodes.len() - 1
        }
    }
}

/// Iterator over keys in recency order
pub(crate) struct Keys<'a, K, V> {
    nodes: &'a [Option<Node<K, V>>],
    cursor: Option<usize>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.nodes[self.cursor?].as_ref()?;
        self.cursor = node.next;
        Some(&node.key)
    }
}
