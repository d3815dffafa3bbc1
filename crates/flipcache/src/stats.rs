//! Usage counters for the image store
//!
//! Writes are split by path: plain `put` is the foreground path (an image
//! decoded because it is on screen), while `put_if` carries background
//! results that may be turned away once they are out of date.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters, updated by the store as it is used
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    inserts: AtomicU64,
    guarded_writes: AtomicU64,
    refused_writes: AtomicU64,
}

impl CacheStats {
    /// All counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_lookup(&self, found: bool) {
        let counter = if found { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// A new key became resident; `evicted` if it displaced the oldest entry
    pub(crate) fn record_insert(&self, evicted: bool) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
        if evicted {
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Outcome of a conditional write
    pub(crate) fn record_guarded(&self, accepted: bool) {
        let counter = if accepted {
            &self.guarded_writes
        } else {
            &self.refused_writes
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Lookups that found their key
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Lookups that did not
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Entries dropped to make room for new keys
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// New keys stored (replacing an existing key does not count)
    pub fn inserts(&self) -> u64 {
        self.inserts.load(Ordering::Relaxed)
    }

    /// Conditional writes whose guard let them through
    pub fn guarded_writes(&self) -> u64 {
        self.guarded_writes.load(Ordering::Relaxed)
    }

    /// Conditional writes turned away by their guard
    pub fn refused_writes(&self) -> u64 {
        self.refused_writes.load(Ordering::Relaxed)
    }

    /// Point-in-time copy of every counter
    ///
    /// Counters are read one by one, so a snapshot taken under load may mix
    /// values from slightly different moments.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.hits(),
            misses: self.misses(),
            evictions: self.evictions(),
            inserts: self.inserts(),
            guarded_writes: self.guarded_writes(),
            refused_writes: self.refused_writes(),
        }
    }
}

/// Plain copy of [`CacheStats`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Lookups that found their key
    pub hits: u64,
    /// Lookups that did not
    pub misses: u64,
    /// Entries dropped to make room
    pub evictions: u64,
    /// New keys stored
    pub inserts: u64,
    /// Accepted conditional writes
    pub guarded_writes: u64,
    /// Refused conditional writes
    pub refused_writes: u64,
}

impl StatsSnapshot {
    /// Fraction of lookups that hit, 0.0 before any lookup
    pub fn hit_ratio(&self) -> f64 {
        match self.hits + self.misses {
            0 => 0.0,
            lookups => self.hits as f64 / lookups as f64,
        }
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "hits: {}", self.hits)?;
        writeln!(f, "misses: {}", self.misses)?;
        writeln!(f, "hit_ratio: {:.2}", self.hit_ratio())?;
        writeln!(f, "inserts: {}", self.inserts)?;
        writeln!(f, "evictions: {}", self.evictions)?;
        writeln!(f, "preloaded: {}", self.guarded_writes)?;
        write!(f, "discarded: {}", self.refused_writes)
    }
}
