//! Named Store Module
//!
//! State of one named in-memory cache: a HashMap of entries keyed by string,
//! with TTL expiry both lazily on access and by timer.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinHandle;

use crate::cache::{CacheEntry, CacheStats};
use crate::error::{CacheError, Result};

// == Named Store ==
/// Entries of one named cache.
///
/// The live count is always `entries.len()` after expired entries have been
/// purged, so it can neither go negative nor double-count.
#[derive(Debug)]
pub struct NamedStore {
    /// Cache name
    name: String,
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// Generation handed to the next write
    next_generation: u64,
}

impl NamedStore {
    // == Constructor ==
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: HashMap::new(),
            next_generation: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // == Get ==
    /// Returns the payload for `key` if it is present and not expired.
    pub fn get(&mut self, key: &str) -> Option<Vec<u8>> {
        self.purge_if_expired(key);
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    // == Put ==
    /// Unconditional upsert. Any previous entry, and its timer, is dropped.
    ///
    /// Returns the generation of the new entry.
    pub fn put(&mut self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        self.entries
            .insert(key.to_string(), CacheEntry::new(value, ttl, generation));
        generation
    }

    // == Put If Absent ==
    /// Inserts only when no live entry exists for `key`.
    pub fn put_if_absent(&mut self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<u64> {
        if self.contains(key) {
            return Err(CacheError::KeyAlreadyExists(key.to_string()));
        }
        Ok(self.put(key, value, ttl))
    }

    // == Replace ==
    /// Replaces the entry only when its current payload equals `old_value`.
    ///
    /// Payloads are equal when their bytes match, or when both parse as JSON
    /// to structurally equal values.
    pub fn replace(
        &mut self,
        key: &str,
        new_value: Vec<u8>,
        old_value: &[u8],
        ttl: Option<Duration>,
    ) -> Result<u64> {
        self.purge_if_expired(key);
        let matches = self
            .entries
            .get(key)
            .is_some_and(|entry| payloads_equal(&entry.value, old_value));
        if !matches {
            return Err(CacheError::ValueMismatch(key.to_string()));
        }
        Ok(self.put(key, new_value, ttl))
    }

    // == Delete ==
    /// Removes an entry by key. Returns whether a live entry was removed.
    pub fn delete(&mut self, key: &str) -> bool {
        self.purge_if_expired(key);
        self.entries.remove(key).is_some()
    }

    // == Clear ==
    /// Drops every entry and with them every pending timer.
    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        removed
    }

    // == Expire ==
    /// Called by an expiry timer. Removes `key` only if it still holds the
    /// write that scheduled the timer.
    pub fn expire(&mut self, key: &str, generation: u64) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) if entry.generation == generation => {
                entry.detach_timer();
                self.entries.remove(key);
                true
            }
            _ => false,
        }
    }

    /// Hands the expiry timer for `generation` to its entry.
    ///
    /// If the entry was already replaced the timer is aborted.
    pub fn attach_timer(&mut self, key: &str, generation: u64, timer: JoinHandle<()>) {
        match self.entries.get_mut(key) {
            Some(entry) if entry.generation == generation => entry.attach_timer(timer),
            _ => timer.abort(),
        }
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        before - self.entries.len()
    }

    // == Length ==
    /// Returns the number of live entries.
    pub fn len(&mut self) -> usize {
        self.cleanup_expired();
        self.entries.len()
    }

    pub fn is_empty(&mut self) -> bool {
        self.len() == 0
    }

    // == Stats ==
    pub fn stats(&mut self) -> CacheStats {
        let count = self.len() as u64;
        CacheStats::estimated(self.name.clone(), count)
    }

    fn contains(&mut self, key: &str) -> bool {
        self.purge_if_expired(key);
        self.entries.contains_key(key)
    }

    fn purge_if_expired(&mut self, key: &str) {
        if self.entries.get(key).is_some_and(CacheEntry::is_expired) {
            self.entries.remove(key);
        }
    }
}

fn payloads_equal(stored: &[u8], expected: &[u8]) -> bool {
    if stored == expected {
        return true;
    }
    match (
        serde_json::from_slice::<Value>(stored),
        serde_json::from_slice::<Value>(expected),
    ) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_new() {
        let mut store = NamedStore::new("test");
        assert_eq!(store.name(), "test");
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_put_and_get() {
        let mut store = NamedStore::new("test");

        store.put("key1", b"value1".to_vec(), None);
        assert_eq!(store.get("key1"), Some(b"value1".to_vec()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_get_nonexistent() {
        let mut store = NamedStore::new("test");
        assert_eq!(store.get("nonexistent"), None);
    }

    #[test]
    fn test_store_overwrite_counts_once() {
        let mut store = NamedStore::new("test");

        let first = store.put("key1", b"value1".to_vec(), None);
        let second = store.put("key1", b"value2".to_vec(), None);

        assert_ne!(first, second);
        assert_eq!(store.get("key1"), Some(b"value2".to_vec()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_put_if_absent_keeps_original() {
        let mut store = NamedStore::new("test");

        store.put_if_absent("key1", b"v1".to_vec(), None).unwrap();
        let result = store.put_if_absent("key1", b"v2".to_vec(), None);

        assert!(matches!(result, Err(CacheError::KeyAlreadyExists(_))));
        assert_eq!(store.get("key1"), Some(b"v1".to_vec()));
    }

    #[test]
    fn test_replace_requires_matching_old_value() {
        let mut store = NamedStore::new("test");
        store.put("key1", b"old".to_vec(), None);

        let result = store.replace("key1", b"new".to_vec(), b"other", None);
        assert!(matches!(result, Err(CacheError::ValueMismatch(_))));
        assert_eq!(store.get("key1"), Some(b"old".to_vec()));

        store.replace("key1", b"new".to_vec(), b"old", None).unwrap();
        assert_eq!(store.get("key1"), Some(b"new".to_vec()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_replace_absent_key_is_mismatch() {
        let mut store = NamedStore::new("test");
        let result = store.replace("missing", b"new".to_vec(), b"old", None);
        assert!(matches!(result, Err(CacheError::ValueMismatch(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_replace_compares_json_structurally() {
        let mut store = NamedStore::new("test");
        store.put("key1", br#"{"a":1,"b":2}"#.to_vec(), None);

        store
            .replace("key1", b"next".to_vec(), br#"{ "b": 2, "a": 1 }"#, None)
            .unwrap();
        assert_eq!(store.get("key1"), Some(b"next".to_vec()));
    }

    #[test]
    fn test_store_delete() {
        let mut store = NamedStore::new("test");

        store.put("key1", b"value1".to_vec(), None);
        assert!(store.delete("key1"));
        assert!(!store.delete("key1"));

        assert!(store.is_empty());
        assert_eq!(store.get("key1"), None);
    }

    #[test]
    fn test_store_clear() {
        let mut store = NamedStore::new("test");
        store.put("a", b"1".to_vec(), None);
        store.put("b", b"2".to_vec(), None);

        assert_eq!(store.clear(), 2);
        assert_eq!(store.stats().count, 0);
        assert_eq!(store.get("a"), None);
    }

    #[test]
    fn test_expire_ignores_stale_generation() {
        let mut store = NamedStore::new("test");
        let first = store.put("key1", b"v1".to_vec(), Some(Duration::from_secs(60)));
        store.put("key1", b"v2".to_vec(), None);

        assert!(!store.expire("key1", first));
        assert_eq!(store.get("key1"), Some(b"v2".to_vec()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_lazy_expiry_without_timer() {
        let mut store = NamedStore::new("test");
        store.put("key1", b"v".to_vec(), Some(Duration::from_millis(50)));
        store.put("key2", b"v".to_vec(), None);

        tokio::time::advance(Duration::from_millis(50)).await;

        assert_eq!(store.get("key1"), None);
        assert!(store
            .put_if_absent("key1", b"again".to_vec(), None)
            .is_ok());
        assert_eq!(store.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_cleanup_expired() {
        let mut store = NamedStore::new("test");
        store.put("key1", b"value1".to_vec(), Some(Duration::from_secs(1)));
        store.put("key2", b"value2".to_vec(), Some(Duration::from_secs(10)));

        tokio::time::advance(Duration::from_millis(1100)).await;

        assert_eq!(store.cleanup_expired(), 1);
        assert_eq!(store.len(), 1);
        assert!(store.get("key2").is_some());
    }

    #[test]
    fn test_stats_size_is_estimate() {
        let mut store = NamedStore::new("sized");
        store.put("a", vec![0; 1000], None);
        let stats = store.stats();
        assert_eq!(stats.cache, "sized");
        assert_eq!(stats.count, 1);
        assert_eq!(stats.size, 4);
    }
}
