//! Cache Store Module
//!
//! Main cache engine combining a key index with the recency list and lazy
//! TTL expiration.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, LruList};
use crate::error::{ProxyError, Result};

// == Cache Store ==
/// Bounded key-value store with LRU eviction and per-entry TTL.
///
/// Expiry is evaluated only when a key is read; there is no background
/// sweep, so an expired entry keeps its slot until it is read again or
/// evicted by capacity pressure.
#[derive(Debug)]
pub struct CacheStore {
    /// Key to slot in `lru`
    index: HashMap<String, usize>,
    /// Entries ordered from least to most recently touched
    lru: LruList<CacheEntry>,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed
    capacity: usize,
    /// Lifetime of an entry since its last touch
    ttl: Duration,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore with the given capacity and entry lifetime.
    ///
    /// Fails with a configuration error if either is zero.
    pub fn new(capacity: usize, ttl: Duration) -> Result<Self> {
        if capacity == 0 {
            return Err(ProxyError::Config(
                "cache capacity must be greater than 0".to_string(),
            ));
        }
        if ttl.is_zero() {
            return Err(ProxyError::Config(
                "cache ttl must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            index: HashMap::with_capacity(capacity),
            lru: LruList::with_capacity(capacity),
            stats: CacheStats::new(),
            capacity,
            ttl,
        })
    }

    // == Get ==
    /// Retrieves a value by key, refreshing its recency.
    ///
    /// Returns None for absent keys. An expired entry is removed and
    /// reported as absent.
    pub fn get(&mut self, key: &str) -> Option<Bytes> {
        self.get_at(key, Instant::now())
    }

    pub(crate) fn get_at(&mut self, key: &str, now: Instant) -> Option<Bytes> {
        let Some(&idx) = self.index.get(key) else {
            self.stats.record_miss();
            return None;
        };

        let ttl = self.ttl;
        let entry = self.lru.get_mut(idx)?;
        if entry.is_expired(ttl, now) {
            self.index.remove(key);
            self.lru.remove(idx);
            self.stats.record_expiration();
            self.stats.set_total_entries(self.index.len());
            debug!(key, "Cache entry expired");
            return None;
        }

        entry.touch(now);
        let value = entry.value.clone();
        self.lru.move_to_back(idx);
        self.stats.record_hit();
        Some(value)
    }

    // == Set ==
    /// Stores a value, refreshing recency.
    ///
    /// If the key is new and the cache is full, the least recently touched
    /// entry is evicted first. Overwriting an existing key never evicts.
    pub fn set(&mut self, key: impl Into<String>, value: Bytes) -> Result<()> {
        self.set_at(key.into(), value, Instant::now())
    }

    pub(crate) fn set_at(&mut self, key: String, value: Bytes, now: Instant) -> Result<()> {
        if key.is_empty() {
            return Err(ProxyError::Protocol("cache key must not be empty".to_string()));
        }

        if let Some(&idx) = self.index.get(&key) {
            if let Some(entry) = self.lru.get_mut(idx) {
                entry.value = value;
                entry.touch(now);
            }
            self.lru.move_to_back(idx);
            return Ok(());
        }

        if self.index.len() >= self.capacity {
            if let Some((evicted, _)) = self.lru.pop_front() {
                self.index.remove(&evicted);
                self.stats.record_eviction();
                debug!(key = %evicted, "Evicted least recently used entry");
            }
        }

        let idx = self.lru.push_back(key.clone(), CacheEntry::new(value, now));
        self.index.insert(key, idx);
        self.stats.set_total_entries(self.index.len());
        Ok(())
    }

    // == Inspection ==
    /// Returns true if the key occupies a slot, expired or not.
    ///
    /// Does not touch recency or statistics.
    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Keys from least to most recently touched.
    pub fn keys(&self) -> Vec<String> {
        self.lru.keys().map(str::to_string).collect()
    }

    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.index.len());
        stats
    }

    /// Returns the current number of occupied slots.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    fn value(s: &'static str) -> Bytes {
        Bytes::from_static(s.as_bytes())
    }

    #[test]
    fn test_store_new() {
        let store = CacheStore::new(100, HOUR).unwrap();
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert_eq!(store.capacity(), 100);
        assert_eq!(store.ttl(), HOUR);
    }

    #[test]
    fn test_store_rejects_invalid_parameters() {
        assert!(matches!(
            CacheStore::new(0, HOUR),
            Err(ProxyError::Config(_))
        ));
        assert!(matches!(
            CacheStore::new(10, Duration::ZERO),
            Err(ProxyError::Config(_))
        ));
    }

    #[test]
    fn test_store_set_and_get() {
        let mut store = CacheStore::new(100, HOUR).unwrap();

        store.set("key1", value("value1")).unwrap();
        assert_eq!(store.get("key1"), Some(value("value1")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_get_nonexistent_has_no_side_effect() {
        let mut store = CacheStore::new(100, HOUR).unwrap();
        store.set("radish", value("moo")).unwrap();

        assert_eq!(store.get("ddeok"), None);
        assert_eq!(store.get(""), None);
        assert_eq!(store.keys(), vec!["radish"]);
    }

    #[test]
    fn test_store_rejects_empty_key() {
        let mut store = CacheStore::new(100, HOUR).unwrap();
        assert!(store.set("", value("v")).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_overwrite() {
        let mut store = CacheStore::new(2, HOUR).unwrap();

        store.set("key1", value("value1")).unwrap();
        store.set("key2", value("value2")).unwrap();
        store.set("key1", value("value3")).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.stats().evictions, 0);
        assert_eq!(store.keys(), vec!["key2", "key1"]);
        assert_eq!(store.get("key1"), Some(value("value3")));
    }

    #[test]
    fn test_store_ttl_expiration() {
        let mut store = CacheStore::new(100, Duration::from_secs(2)).unwrap();
        let start = Instant::now();

        store.set_at("radish".to_string(), value("moo"), start).unwrap();
        assert!(store
            .get_at("radish", start + Duration::from_secs(1))
            .is_some());

        // The hit above refreshed the entry, so it lives until start + 3s
        assert!(store
            .get_at("radish", start + Duration::from_millis(2500))
            .is_some());
        assert!(store
            .get_at("radish", start + Duration::from_millis(4500))
            .is_none());
        assert!(!store.contains_key("radish"));

        let stats = store.stats();
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.total_entries, 0);
    }

    #[test]
    fn test_store_expired_entry_keeps_slot_until_read() {
        let mut store = CacheStore::new(3, Duration::from_secs(1)).unwrap();
        let start = Instant::now();
        store.set_at("a".to_string(), value("1"), start).unwrap();

        // Never read, so still occupying its slot
        assert!(store.contains_key("a"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get_at("a", start + Duration::from_secs(1)), None);
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_store_lru_eviction() {
        let mut store = CacheStore::new(3, HOUR).unwrap();

        store.set("radish", value("moo")).unwrap();
        store.set("rice", value("bap")).unwrap();
        store.set("beef", value("sogogi")).unwrap();
        store.set("egg", value("gyeran")).unwrap();

        assert_eq!(store.len(), 3);
        assert_eq!(store.keys(), vec!["rice", "beef", "egg"]);
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_store_lru_touch_on_get() {
        let mut store = CacheStore::new(3, HOUR).unwrap();

        store.set("key1", value("value1")).unwrap();
        store.set("key2", value("value2")).unwrap();
        store.set("key3", value("value3")).unwrap();

        // Access key1 to make it most recently used
        store.get("key1").unwrap();

        // Adding key4 should evict key2 (now oldest)
        store.set("key4", value("value4")).unwrap();

        assert!(store.contains_key("key1"));
        assert!(!store.contains_key("key2"));
    }

    #[test]
    fn test_store_stats() {
        let mut store = CacheStore::new(100, HOUR).unwrap();

        store.set("key1", value("value1")).unwrap();
        store.get("key1").unwrap();
        let _ = store.get("nonexistent");

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 1);
    }

    #[test]
    fn test_store_value_with_crlf_is_stored_verbatim() {
        let mut store = CacheStore::new(4, HOUR).unwrap();
        let raw = Bytes::from_static(b"line1\r\nline2\r\n");
        store.set("k", raw.clone()).unwrap();
        assert_eq!(store.get("k"), Some(raw));
    }
}
