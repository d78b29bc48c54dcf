//! In-memory cache backend
//!
//! Serves the full operation set from a [`CacheRegistry`] store, for local and
//! offline use when no remote caching service is bound.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::cache::{CacheBackend, CacheRegistry, CacheStats, NamedStore, SharedStore};
use crate::error::Result;
use crate::models::CacheKey;
use crate::tasks::spawn_expiry_task;

/// Handle onto one named in-memory cache.
///
/// Every operation locks the store once, so a compare-and-replace, a write
/// and its timer registration are each atomic with respect to other handles.
#[derive(Debug, Clone)]
pub struct MemoryCache {
    name: String,
    store: SharedStore,
}

impl MemoryCache {
    pub fn new(name: impl Into<String>, registry: &CacheRegistry) -> Self {
        let name = name.into();
        let store = registry.open(&name);
        Self { name, store }
    }

    fn schedule_expiry(
        &self,
        store: &mut NamedStore,
        key: &CacheKey,
        generation: u64,
        ttl: Option<Duration>,
    ) {
        if let Some(ttl) = ttl {
            let timer = spawn_expiry_task(
                Arc::downgrade(&self.store),
                key.to_string(),
                generation,
                ttl,
            );
            store.attach_timer(key.as_str(), generation, timer);
        }
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_remote(&self) -> bool {
        false
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>> {
        let mut store = self.store.lock().await;
        Ok(store.get(key.as_str()))
    }

    async fn put(&self, key: &CacheKey, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        let mut store = self.store.lock().await;
        let generation = store.put(key.as_str(), value, ttl);
        self.schedule_expiry(&mut store, key, generation, ttl);
        Ok(())
    }

    async fn put_if_absent(
        &self,
        key: &CacheKey,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let mut store = self.store.lock().await;
        let generation = store.put_if_absent(key.as_str(), value, ttl)?;
        self.schedule_expiry(&mut store, key, generation, ttl);
        Ok(())
    }

    async fn replace(
        &self,
        key: &CacheKey,
        new_value: Vec<u8>,
        old_value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let mut store = self.store.lock().await;
        let generation = store.replace(key.as_str(), new_value, &old_value, ttl)?;
        self.schedule_expiry(&mut store, key, generation, ttl);
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<()> {
        let removed = self.store.lock().await.delete(key.as_str());
        if removed {
            debug!("Deleted '{}' from in-memory cache '{}'", key, self.name);
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let removed = self.store.lock().await.clear();
        debug!("Cleared {} entries from in-memory cache '{}'", removed, self.name);
        Ok(())
    }

    async fn stats(&self) -> Result<CacheStats> {
        Ok(self.store.lock().await.stats())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use crate::models::IntoCacheKey;

    fn key(k: &str) -> CacheKey {
        k.into_cache_key().unwrap()
    }

    #[tokio::test]
    async fn test_handles_share_named_cache() {
        let registry = CacheRegistry::new();
        let first = MemoryCache::new("shared", &registry);
        let second = MemoryCache::new("shared", &registry);

        first.put(&key("k"), b"v".to_vec(), None).await.unwrap();
        assert_eq!(second.get(&key("k")).await.unwrap(), Some(b"v".to_vec()));
        assert_eq!(second.stats().await.unwrap().count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_timer_removes_entry() {
        let registry = CacheRegistry::new();
        let cache = MemoryCache::new("ttl", &registry);

        cache
            .put(&key("k"), b"v".to_vec(), Some(Duration::from_millis(200)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(cache.get(&key("k")).await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(cache.get(&key("k")).await.unwrap().is_none());
        assert_eq!(cache.stats().await.unwrap().count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overwrite_resets_ttl() {
        let registry = CacheRegistry::new();
        let cache = MemoryCache::new("reset", &registry);

        cache
            .put(&key("k"), b"v1".to_vec(), Some(Duration::from_millis(100)))
            .await
            .unwrap();
        cache.put(&key("k"), b"v2".to_vec(), None).await.unwrap();

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(cache.get(&key("k")).await.unwrap(), Some(b"v2".to_vec()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_replace_resets_ttl() {
        let registry = CacheRegistry::new();
        let cache = MemoryCache::new("replace-ttl", &registry);

        cache
            .put(&key("k"), b"old".to_vec(), Some(Duration::from_millis(100)))
            .await
            .unwrap();
        cache
            .replace(
                &key("k"),
                b"new".to_vec(),
                b"old".to_vec(),
                Some(Duration::from_secs(10)),
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(cache.get(&key("k")).await.unwrap(), Some(b"new".to_vec()));
    }

    #[tokio::test]
    async fn test_put_if_absent_conflict() {
        let registry = CacheRegistry::new();
        let cache = MemoryCache::new("pia", &registry);

        cache.put_if_absent(&key("k"), b"v1".to_vec(), None).await.unwrap();
        let result = cache.put_if_absent(&key("k"), b"v2".to_vec(), None).await;

        assert!(matches!(result, Err(CacheError::KeyAlreadyExists(_))));
        assert_eq!(cache.get(&key("k")).await.unwrap(), Some(b"v1".to_vec()));
    }

    #[tokio::test]
    async fn test_delete_and_clear_are_idempotent() {
        let registry = CacheRegistry::new();
        let cache = MemoryCache::new("idem", &registry);

        cache.delete(&key("missing")).await.unwrap();
        cache.clear().await.unwrap();
        cache.clear().await.unwrap();
        assert_eq!(cache.stats().await.unwrap().count, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_replace_has_single_winner() {
        let registry = CacheRegistry::new();
        let cache = MemoryCache::new("race", &registry);
        cache.put(&key("k"), b"0".to_vec(), None).await.unwrap();

        let mut tasks = Vec::new();
        for i in 1..=16 {
            let cache = cache.clone();
            tasks.push(tokio::spawn(async move {
                cache
                    .replace(&key("k"), i.to_string().into_bytes(), b"0".to_vec(), None)
                    .await
                    .is_ok()
            }));
        }

        let mut winners = 0;
        for task in tasks {
            if task.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(cache.stats().await.unwrap().count, 1);
    }
}
