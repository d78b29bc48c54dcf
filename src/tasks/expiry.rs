//! TTL Expiry Task
//!
//! One delayed task per entry written with a TTL. The task removes the entry
//! when the TTL elapses, unless the entry has been overwritten in the
//! meantime.

use std::sync::Weak;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::cache::NamedStore;

/// Spawns the expiry timer for one write.
///
/// The task holds only a weak reference to the store, so a dropped registry
/// never outlives its timers' purpose. The returned handle is owned by the
/// entry, which aborts it on overwrite, delete and clear.
///
/// # Arguments
/// * `store` - Store holding the entry
/// * `key` - Key of the entry
/// * `generation` - Generation of the write that scheduled this timer
/// * `ttl` - Delay before removal
pub fn spawn_expiry_task(
    store: Weak<Mutex<NamedStore>>,
    key: String,
    generation: u64,
    ttl: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(ttl).await;

        let Some(store) = store.upgrade() else {
            return;
        };
        let mut guard = store.lock().await;
        if guard.expire(&key, generation) {
            debug!("TTL expiry: removed '{}' from cache '{}'", key, guard.name());
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_expiry_task_removes_entry() {
        let store = Arc::new(Mutex::new(NamedStore::new("test")));
        let generation = store
            .lock()
            .await
            .put("expire_soon", b"value".to_vec(), Some(Duration::from_millis(100)));

        let handle = spawn_expiry_task(
            Arc::downgrade(&store),
            "expire_soon".to_string(),
            generation,
            Duration::from_millis(100),
        );
        handle.await.unwrap();

        assert_eq!(store.lock().await.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_task_preserves_overwritten_entry() {
        let store = Arc::new(Mutex::new(NamedStore::new("test")));
        let generation = store
            .lock()
            .await
            .put("key", b"old".to_vec(), Some(Duration::from_millis(100)));

        let handle = spawn_expiry_task(
            Arc::downgrade(&store),
            "key".to_string(),
            generation,
            Duration::from_millis(100),
        );
        store.lock().await.put("key", b"new".to_vec(), None);
        handle.await.unwrap();

        assert_eq!(store.lock().await.get("key"), Some(b"new".to_vec()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_task_outlived_store() {
        let store = Arc::new(Mutex::new(NamedStore::new("test")));
        let weak = Arc::downgrade(&store);
        drop(store);

        let handle = spawn_expiry_task(weak, "key".to_string(), 0, Duration::from_millis(10));
        assert!(handle.await.is_ok());
    }
}
