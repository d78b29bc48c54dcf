//! Configuration Module
//!
//! Handles discovering the remote caching service from environment variables.

use std::env;
use std::time::Duration;

use crate::transport::BackoffPolicy;

/// Path prefix the caching service mounts its caches under
pub const CACHE_BASE_PATH: &str = "ccs";

/// Client configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
/// The absence of `cache_host` is what selects the in-memory backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Host of the remote caching service, if one is bound
    pub cache_host: Option<String>,
    /// Port of the remote caching service
    pub cache_port: u16,
    /// First retry delay in milliseconds; doubles on each retry
    pub retry_base_ms: u64,
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,
    /// Timeout for establishing a connection in milliseconds
    pub connect_timeout_ms: u64,
    /// Timeout for a single HTTP attempt in seconds
    pub request_timeout_secs: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHING_INTERNAL_CACHE_URL` - Remote cache host (default: unset, in-memory)
    /// - `CACHING_INTERNAL_CACHE_PORT` - Remote cache port (default: 8080)
    /// - `CACHE_RETRY_BASE_MS` - First retry delay (default: 225)
    /// - `CACHE_MAX_RETRIES` - Retry budget per call (default: 5)
    /// - `CACHE_CONNECT_TIMEOUT_MS` - Connect timeout, retried like a refusal (default: 5000)
    /// - `CACHE_REQUEST_TIMEOUT_SECS` - Per-attempt timeout (default: 30)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_host: env::var("CACHING_INTERNAL_CACHE_URL")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            cache_port: env::var("CACHING_INTERNAL_CACHE_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cache_port),
            retry_base_ms: env::var("CACHE_RETRY_BASE_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.retry_base_ms),
            max_retries: env::var("CACHE_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_retries),
            connect_timeout_ms: env::var("CACHE_CONNECT_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|ms| *ms > 0)
                .unwrap_or(defaults.connect_timeout_ms),
            request_timeout_secs: env::var("CACHE_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.request_timeout_secs),
        }
    }

    /// Base URL caches live under, e.g. `http://host:8080/ccs`.
    pub fn base_url(&self) -> Option<String> {
        self.cache_host
            .as_ref()
            .map(|host| format!("http://{}:{}/{}", host, self.cache_port, CACHE_BASE_PATH))
    }

    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy::new(Duration::from_millis(self.retry_base_ms), self.max_retries)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_host: None,
            cache_port: 8080,
            retry_base_ms: 225,
            max_retries: 5,
            connect_timeout_ms: 5_000,
            request_timeout_secs: 30,
        }
    }
}
