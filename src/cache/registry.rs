//! Named Cache Registry
//!
//! Maps cache names to their in-memory stores. Two handles opened with the
//! same name on the same registry see the same entries. Stores are created
//! lazily on first open and live as long as the registry.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use tokio::sync::Mutex;
use tracing::debug;

use crate::cache::NamedStore;

/// A store shared by every handle naming the same cache
pub type SharedStore = Arc<Mutex<NamedStore>>;

static GLOBAL_REGISTRY: OnceLock<CacheRegistry> = OnceLock::new();

// == Cache Registry ==
/// Registry of named in-memory caches.
///
/// Cloning is cheap and yields a handle onto the same registry. Tests create
/// their own with [`CacheRegistry::new`]; everything else shares
/// [`CacheRegistry::global`].
#[derive(Debug, Clone, Default)]
pub struct CacheRegistry {
    caches: Arc<RwLock<HashMap<String, SharedStore>>>,
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry, created on first use.
    pub fn global() -> &'static CacheRegistry {
        GLOBAL_REGISTRY.get_or_init(CacheRegistry::new)
    }

    /// Returns the store for `name`, creating it if needed.
    pub fn open(&self, name: &str) -> SharedStore {
        {
            let caches = self.caches.read().unwrap_or_else(|e| e.into_inner());
            if let Some(store) = caches.get(name) {
                return store.clone();
            }
        }

        let mut caches = self.caches.write().unwrap_or_else(|e| e.into_inner());
        caches
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!("Creating in-memory cache '{}'", name);
                Arc::new(Mutex::new(NamedStore::new(name)))
            })
            .clone()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.caches
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(name)
    }

    /// Names of every cache opened so far, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .caches
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_name_shares_store() {
        let registry = CacheRegistry::new();
        let a = registry.open("users");
        let b = registry.open("users");

        assert!(Arc::ptr_eq(&a, &b));
        a.lock().await.put("k", b"v".to_vec(), None);
        assert_eq!(b.lock().await.get("k"), Some(b"v".to_vec()));
    }

    #[test]
    fn test_different_names_are_isolated() {
        let registry = CacheRegistry::new();
        let a = registry.open("a");
        let b = registry.open("b");

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(registry.names(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_registries_are_isolated() {
        let first = CacheRegistry::new();
        let second = CacheRegistry::new();
        first.open("shared-name");

        assert!(first.contains("shared-name"));
        assert!(!second.contains("shared-name"));
    }

    #[test]
    fn test_clone_shares_registry() {
        let registry = CacheRegistry::new();
        let clone = registry.clone();
        registry.open("x");
        assert!(clone.contains("x"));
    }

    #[test]
    fn test_global_is_singleton() {
        assert!(std::ptr::eq(CacheRegistry::global(), CacheRegistry::global()));
    }
}
