//! ImageStore: the shared, capacity-bounded LRU store
//!
//! One `RwLock` covers both the key map and the recency list, so every
//! operation is atomic with respect to every other. The lock is only held
//! for lookup and list splicing; payloads are built (decoded) by callers
//! before they reach the store, and replaced or evicted payloads are
//! released only after the lock is dropped.

use std::sync::Arc;
use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::lru::{Displaced, LruCache};
use crate::stats::CacheStats;

/// Thread-safe LRU store mapping normalized path keys to shared payloads
pub struct ImageStore<V> {
    /// Key map and recency order, guarded together
    entries: RwLock<LruCache<String, Arc<V>>>,

    /// Usage counters
    stats: CacheStats,

    /// Maximum number of resident entries
    capacity: usize,
}

impl<V> ImageStore<V> {
    /// Create an empty store holding at most `capacity` entries
    ///
    /// # Errors
    /// * `Error::InvalidConfiguration` - `capacity` is zero
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidConfiguration(
                "cache capacity must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            entries: RwLock::new(LruCache::new(capacity)),
            stats: CacheStats::new(),
            capacity,
        })
    }

    /// True if `key` is resident. Does not touch the recency order.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains(key)
    }

    /// Fetch a handle to the payload for `key`, promoting it to most recently used
    ///
    /// The returned `Arc` stays valid after the entry is evicted or replaced.
    ///
    /// # Errors
    /// * `Error::InvalidKey` - `key` is empty
    pub fn get(&self, key: &str) -> Result<Option<Arc<V>>> {
        if key.is_empty() {
            return Err(Error::InvalidKey);
        }

        let found = self.entries.write().get(key).cloned();
        self.stats.record_lookup(found.is_some());
        Ok(found)
    }

    /// Store `payload` under `key` as the most recently used entry
    ///
    /// An existing entry is replaced in place. A new key arriving at a full
    /// store first evicts the least recently used entry.
    ///
    /// # Returns
    /// * `Ok(Some(key))` - the key evicted to make room
    /// * `Ok(None)` - nothing was evicted
    ///
    /// # Errors
    /// * `Error::InvalidKey` - `key` is empty; the store is left untouched
    pub fn put(&self, key: &str, payload: impl Into<Arc<V>>) -> Result<Option<String>> {
        if key.is_empty() {
            return Err(Error::InvalidKey);
        }
        let payload = payload.into();

        let mut entries = self.entries.write();
        let displaced = self.insert(&mut entries, key, payload);
        drop(entries);
        Ok(displaced.into_evicted_key())
    }

    /// Like [`put`](Self::put), but only when `guard` returns true
    ///
    /// `guard` runs inside the store's critical section, so its verdict and
    /// the write are one atomic step relative to [`exclusive`](Self::exclusive).
    /// Returns whether the payload was stored.
    pub fn put_if<F>(&self, key: &str, payload: impl Into<Arc<V>>, guard: F) -> Result<bool>
    where
        F: FnOnce() -> bool,
    {
        if key.is_empty() {
            return Err(Error::InvalidKey);
        }
        let payload = payload.into();

        let mut entries = self.entries.write();
        let accepted = guard();
        self.stats.record_guarded(accepted);
        if !accepted {
            return Ok(false);
        }
        let displaced = self.insert(&mut entries, key, payload);
        drop(entries);
        drop(displaced);
        Ok(true)
    }

    fn insert(
        &self,
        entries: &mut LruCache<String, Arc<V>>,
        key: &str,
        payload: Arc<V>,
    ) -> Displaced<String, Arc<V>> {
        let displaced = entries.put(key.to_owned(), payload);
        match displaced {
            Displaced::Nothing => self.stats.record_insert(false),
            Displaced::Evicted(..) => self.stats.record_insert(true),
            Displaced::Replaced(_) => {}
        }
        displaced
    }

    /// Run `f` while holding the store's write lock
    ///
    /// No `get`, `put` or `contains` can interleave with `f`. Keep `f` short.
    pub fn exclusive<R>(&self, f: impl FnOnce() -> R) -> R {
        let _entries = self.entries.write();
        f()
    }

    /// Number of resident entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// True if nothing is resident
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of resident entries
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshot of resident keys, most recently used first
    pub fn keys_by_recency(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    /// Usage counters
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}
