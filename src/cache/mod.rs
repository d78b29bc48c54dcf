//! Cache Module
//!
//! The [`Cache`] handle and the two backends it can be bound to: the remote
//! caching service, or an in-memory store when no service is configured.

mod entry;
mod memory;
mod registry;
mod remote;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

use std::env;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::codec;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{CacheKey, CacheValue, Decoded, IntoCacheKey, TypeHint};
use crate::transport::{BackoffPolicy, HttpTransport, Transport};

// Re-export public types
pub use entry::CacheEntry;
pub use memory::MemoryCache;
pub use registry::{CacheRegistry, SharedStore};
pub use remote::RemoteCache;
pub use stats::{CacheStats, APPROX_ENTRY_SIZE};
pub use store::NamedStore;

const WARN_NO_CACHE_HOST: &str =
    "Internal caching URL is not set. Falling back on using a local hashmap instead.";
const WARN_NO_CACHE_BINDING: &str =
    "If this application is running on a managed container platform, ensure that it is bound to a caching service.";

// == Backend Trait ==
/// A store the cache operations execute against.
///
/// Keys arrive validated and values arrive serialized; backends deal only in
/// raw payloads. A missing key is `Ok(None)`, not an error.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    fn name(&self) -> &str;

    fn is_remote(&self) -> bool;

    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>>;

    async fn put(&self, key: &CacheKey, value: Vec<u8>, ttl: Option<Duration>) -> Result<()>;

    /// Fails with [`CacheError::KeyAlreadyExists`] if a live entry exists.
    async fn put_if_absent(&self, key: &CacheKey, value: Vec<u8>, ttl: Option<Duration>)
        -> Result<()>;

    /// Fails with [`CacheError::ValueMismatch`] unless the stored payload equals `old_value`.
    async fn replace(
        &self,
        key: &CacheKey,
        new_value: Vec<u8>,
        old_value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<()>;

    async fn delete(&self, key: &CacheKey) -> Result<()>;

    async fn clear(&self) -> Result<()>;

    async fn stats(&self) -> Result<CacheStats>;
}

// == Cache Handle ==
/// Handle onto one logical cache.
///
/// The backend is chosen at construction and never changes. Arguments are
/// validated before any I/O: a bad key or TTL fails without touching the
/// backend.
///
/// Validation runs when the returned future is first polled, and a bad
/// argument resolves that first poll with the error, before anything awaits.
/// A future that is dropped without being polled validates nothing and does
/// nothing. To check a key up front, build it with [`CacheKey::new`] or
/// [`IntoCacheKey::into_cache_key`] and pass the `CacheKey`.
///
/// # Example
/// ```ignore
/// let cache = Cache::new("sessions")?;
/// cache.put("user:1", "alice", Some(Duration::from_secs(60))).await?;
/// let name = cache.get_as("user:1", TypeHint::String).await?;
/// ```
#[derive(Clone)]
pub struct Cache {
    backend: Arc<dyn CacheBackend>,
}

impl Cache {
    // == Constructors ==
    /// Opens cache `name` using configuration from the environment.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        Self::with_config(name, &Config::from_env())
    }

    /// Opens cache `name`, remote when `config` names a service host and
    /// in-memory (on the global registry) otherwise.
    pub fn with_config(name: impl Into<String>, config: &Config) -> Result<Self> {
        match config.base_url() {
            Some(base_url) => {
                info!("Using remote cache service at {}", base_url);
                let transport =
                    HttpTransport::with_timeouts(config.connect_timeout(), config.request_timeout())
                        .map_err(|e| CacheError::Config(e.to_string()))?;
                Self::remote(name, &base_url, transport, config.backoff_policy())
            }
            None => {
                warn!("{}", WARN_NO_CACHE_HOST);
                // Both are set on managed hosts, so the binding is probably missing
                if env::var_os("HOSTNAME").is_some() && env::var_os("PORT").is_some() {
                    warn!("{}", WARN_NO_CACHE_BINDING);
                }
                Self::in_memory(name, CacheRegistry::global())
            }
        }
    }

    /// Opens cache `name` on the remote service at `base_url`.
    pub fn remote<T: Transport + 'static>(
        name: impl Into<String>,
        base_url: &str,
        transport: T,
        policy: BackoffPolicy,
    ) -> Result<Self> {
        let name = validate_name(name.into())?;
        let backend = RemoteCache::new(name, base_url, transport, policy)?;
        Ok(Self::from_backend(Arc::new(backend)))
    }

    /// Opens cache `name` in `registry`.
    pub fn in_memory(name: impl Into<String>, registry: &CacheRegistry) -> Result<Self> {
        let name = validate_name(name.into())?;
        Ok(Self::from_backend(Arc::new(MemoryCache::new(name, registry))))
    }

    pub fn from_backend(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    pub fn name(&self) -> &str {
        self.backend.name()
    }

    pub fn is_remote(&self) -> bool {
        self.backend.is_remote()
    }

    // == Get ==
    /// Retrieves a value, decoding it with a best guess (JSON, else text).
    ///
    /// Returns `Ok(None)` if the key is absent or expired.
    pub async fn get(&self, key: impl IntoCacheKey) -> Result<Option<Decoded>> {
        let key = key.into_cache_key()?;
        self.fetch(&key, None).await
    }

    /// Retrieves a value, decoding it as `hint`.
    pub async fn get_as(&self, key: impl IntoCacheKey, hint: TypeHint) -> Result<Option<Decoded>> {
        let key = key.into_cache_key()?;
        self.fetch(&key, Some(hint)).await
    }

    /// Retrieves a value and deserializes its JSON text into `T`.
    pub async fn get_json<T: DeserializeOwned>(&self, key: impl IntoCacheKey) -> Result<Option<T>> {
        let key = key.into_cache_key()?;
        match self.backend.get(&key).await? {
            Some(raw) => serde_json::from_slice(&raw).map(Some).map_err(|e| {
                CacheError::TypeMismatch(format!("value at '{}' is not the requested JSON: {}", key, e))
            }),
            None => Ok(None),
        }
    }

    async fn fetch(&self, key: &CacheKey, hint: Option<TypeHint>) -> Result<Option<Decoded>> {
        debug!("get '{}' from cache '{}'", key, self.name());
        match self.backend.get(key).await? {
            Some(raw) => codec::decode(&raw, hint).map(Some),
            None => Ok(None),
        }
    }

    // == Put ==
    /// Stores a value unconditionally, optionally expiring after `ttl`.
    pub async fn put(
        &self,
        key: impl IntoCacheKey,
        value: impl Into<CacheValue>,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let key = key.into_cache_key()?;
        let ttl = validate_ttl(ttl)?;
        let payload = codec::serialize(value.into());
        debug!("put '{}' ({} bytes) into cache '{}'", key, payload.len(), self.name());
        self.backend.put(&key, payload, ttl).await
    }

    /// Stores a value only if the key is not currently present.
    pub async fn put_if_absent(
        &self,
        key: impl IntoCacheKey,
        value: impl Into<CacheValue>,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let key = key.into_cache_key()?;
        let ttl = validate_ttl(ttl)?;
        let payload = codec::serialize(value.into());
        debug!("putIfAbsent '{}' into cache '{}'", key, self.name());
        self.backend.put_if_absent(&key, payload, ttl).await
    }

    // == Replace ==
    /// Stores `new_value` only if the current value equals `old_value`.
    pub async fn replace(
        &self,
        key: impl IntoCacheKey,
        new_value: impl Into<CacheValue>,
        old_value: impl Into<CacheValue>,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let key = key.into_cache_key()?;
        let ttl = validate_ttl(ttl)?;
        let new_payload = codec::serialize(new_value.into());
        let old_payload = codec::serialize(old_value.into());
        debug!("replace '{}' in cache '{}'", key, self.name());
        self.backend.replace(&key, new_payload, old_payload, ttl).await
    }

    // == Delete ==
    /// Removes a key. Removing an absent key succeeds.
    pub async fn delete(&self, key: impl IntoCacheKey) -> Result<()> {
        let key = key.into_cache_key()?;
        debug!("delete '{}' from cache '{}'", key, self.name());
        self.backend.delete(&key).await
    }

    /// Removes every entry of this cache.
    pub async fn clear(&self) -> Result<()> {
        debug!("clear cache '{}'", self.name());
        self.backend.clear().await
    }

    // == Stats ==
    pub async fn stats(&self) -> Result<CacheStats> {
        self.backend.stats().await
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("name", &self.name())
            .field("remote", &self.is_remote())
            .finish()
    }
}

fn validate_name(name: String) -> Result<String> {
    if name.is_empty() {
        return Err(CacheError::MissingArgument("cache name"));
    }
    Ok(name)
}

/// A supplied TTL must be positive.
fn validate_ttl(ttl: Option<Duration>) -> Result<Option<Duration>> {
    match ttl {
        Some(ttl) if ttl.is_zero() => Err(CacheError::InvalidTtl(
            "time to live for cache entries must be positive".to_string(),
        )),
        other => Ok(other),
    }
}
