//! # flipcache
//!
//! Bounded in-memory store for decoded images.
//!
//! ## Architecture
//! - **HashMap**: AHash keyed by normalized path (O(1) lookup)
//! - **LRU List**: slab-backed doubly-linked list (O(1) promote/evict)
//! - **Locking**: one `RwLock` over both, never held across a decode
//! - **Payloads**: handed out as `Arc<V>`, valid after eviction

#![warn(missing_docs)]

mod error;
mod lru;
mod stats;
mod store;

pub use error::{Error, Result};
pub use stats::{CacheStats, StatsSnapshot};
pub use store::ImageStore;
