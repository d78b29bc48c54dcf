//! CCS Cache - A key/value cache client
//!
//! Talks to a remote caching service over HTTP when one is configured, and
//! falls back to a process-wide in-memory store otherwise. Both backends
//! offer get, put, put-if-absent, compare-and-replace, delete, clear and
//! stats with the same semantics.

pub mod cache;
pub mod codec;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;
pub mod transport;

pub use cache::{Cache, CacheBackend, CacheRegistry, CacheStats, MemoryCache, RemoteCache};
pub use config::Config;
pub use error::{CacheError, Result, TransportError, TransportErrorKind};
pub use models::{CacheKey, CacheValue, Decoded, IntoCacheKey, TypeHint};
pub use transport::{BackoffPolicy, BackoffTransport, HttpTransport, Transport};
