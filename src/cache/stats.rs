//! Cache Statistics Module
//!
//! The `{cache, count, size}` summary both backends report.

use serde::{Deserialize, Serialize};

/// Approximate per-entry byte cost used by the in-memory backend.
///
/// The in-memory size is deliberately not real byte accounting: it is
/// always `count * APPROX_ENTRY_SIZE`.
pub const APPROX_ENTRY_SIZE: u64 = 4;

// == Cache Stats ==
/// Summary of one named cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Cache name
    pub cache: String,
    /// Number of live entries
    pub count: u64,
    /// Size of the cache in bytes, as reported by the backend
    pub size: u64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates stats for an in-memory cache, estimating its size.
    pub fn estimated(cache: impl Into<String>, count: u64) -> Self {
        Self {
            cache: cache.into(),
            count,
            size: count.saturating_mul(APPROX_ENTRY_SIZE),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Body returned by the remote service for `GET /{cache}`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RemoteStatsBody {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub size: u64,
}
