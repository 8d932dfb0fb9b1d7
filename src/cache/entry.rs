//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::{Duration, Instant};

use bytes::Bytes;

// == Cache Entry ==
/// A single cached value and the last time it was touched.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored value
    pub value: Bytes,
    /// Last get or set of this entry
    pub last_touched: Instant,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry touched at `now`.
    pub fn new(value: Bytes, now: Instant) -> Self {
        Self {
            value,
            last_touched: now,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has outlived `ttl` as of `now`.
    ///
    /// Boundary condition: an entry whose age equals the TTL is already
    /// expired.
    pub fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        self.age(now) >= ttl
    }

    // == Touch ==
    /// Resets the entry's timestamp.
    pub fn touch(&mut self, now: Instant) {
        self.last_touched = now;
    }

    /// Time elapsed since the last touch, zero if `now` is earlier.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_touched)
    }
}
