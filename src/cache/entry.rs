//! Cache Entry Module
//!
//! Defines the structure for individual in-memory entries with TTL support.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

// == Cache Entry ==
/// Represents a single in-memory entry with its raw payload and expiry.
///
/// An entry owns its expiry timer: dropping the entry (overwrite, delete,
/// clear) aborts the timer.
#[derive(Debug)]
pub struct CacheEntry {
    /// The stored payload
    pub value: Vec<u8>,
    /// Expiration time, None = no expiration
    pub expires_at: Option<Instant>,
    /// Distinguishes this write from earlier writes to the same key
    pub generation: u64,
    /// Pending expiry task, if a TTL was set
    timer: Option<JoinHandle<()>>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry with optional TTL.
    ///
    /// # Arguments
    /// * `value` - The payload to store
    /// * `ttl` - Optional time to live
    /// * `generation` - Write counter value for this entry
    pub fn new(value: Vec<u8>, ttl: Option<Duration>, generation: u64) -> Self {
        let now = Instant::now();
        Self {
            value,
            expires_at: ttl.map(|ttl| now + ttl),
            generation,
            timer: None,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time reaches its expiration
    /// time, even if its timer has not fired yet.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires) => Instant::now() >= expires,
            None => false,
        }
    }

    pub fn attach_timer(&mut self, timer: JoinHandle<()>) {
        if let Some(previous) = self.timer.replace(timer) {
            previous.abort();
        }
    }

    /// Releases the timer without aborting it, for use by the timer itself.
    pub fn detach_timer(&mut self) {
        self.timer = None;
    }
}

impl Drop for CacheEntry {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}
