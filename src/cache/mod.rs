//! Cache Module
//!
//! Provides the in-memory read cache with TTL expiration and LRU eviction.

mod entry;
mod lru;
mod stats;
mod store;


use std::sync::Arc;

use tokio::sync::Mutex;

// Re-export public types
pub use entry::CacheEntry;
pub use lru::LruList;
pub use stats::CacheStats;
pub use store::CacheStore;

/// Cache shared between connection tasks.
///
/// The lock is held for a single `get` or `set`, never across backend I/O.
pub type SharedCache = Arc<Mutex<CacheStore>>;

/// Wraps a store for sharing between tasks.
pub fn shared(store: CacheStore) -> SharedCache {
    Arc::new(Mutex::new(store))
}
