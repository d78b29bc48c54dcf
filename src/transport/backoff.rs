//! Backoff Transport
//!
//! Connectivity to the caching service can drop for a few seconds while it
//! scales. Connection-level failures are retried with exponential backoff:
//! with the defaults the delays are 225, 450, 900, 1800 and 3600 ms, giving
//! up after about 7 seconds. HTTP error statuses are never retried.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{HttpRequest, HttpResponse, Transport};
use crate::error::TransportError;

// == Backoff Policy ==
/// Exponential retry schedule for one logical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Delay before the first retry; doubled for each following retry
    pub base_delay: Duration,
    /// Retries allowed after the initial attempt
    pub max_retries: u32,
}

impl BackoffPolicy {
    pub fn new(base_delay: Duration, max_retries: u32) -> Self {
        Self {
            base_delay,
            max_retries,
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::new(Duration::ZERO, 0)
    }

    /// Delay before retry number `retry` (0-indexed).
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let multiplier = 2u32.saturating_pow(retry);
        self.base_delay.saturating_mul(multiplier)
    }

    /// Sum of every delay in the schedule.
    pub fn total_delay(&self) -> Duration {
        (0..self.max_retries)
            .map(|retry| self.delay_for_retry(retry))
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(225), 5)
    }
}

// == Backoff Transport ==
/// Wraps a transport with bounded retries on connection failures.
///
/// Each call gets its own retry budget; exhausting it does not affect later
/// calls. Delays are async sleeps, so other tasks keep running meanwhile.
#[derive(Debug, Clone)]
pub struct BackoffTransport<T> {
    inner: T,
    policy: BackoffPolicy,
}

impl<T: Transport> BackoffTransport<T> {
    pub fn new(inner: T, policy: BackoffPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> BackoffPolicy {
        self.policy
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Executes `request`, retrying while the connection cannot be established.
    pub async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut retry = 0;
        loop {
            match self.inner.send(request).await {
                Ok(response) => {
                    if retry > 0 {
                        debug!(
                            "{} {} succeeded after {} retries",
                            request.method, request.url, retry
                        );
                    }
                    return Ok(response);
                }
                Err(err) if err.is_connect() && retry < self.policy.max_retries => {
                    let delay = self.policy.delay_for_retry(retry);
                    debug!(
                        "{} {} failed to connect ({}), retrying in {:?}",
                        request.method, request.url, err, delay
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                Err(err) => {
                    if err.is_connect() {
                        warn!(
                            "Retry budget of {} exhausted for {} {}, caching service might be down: {}",
                            self.policy.max_retries, request.method, request.url, err
                        );
                    }
                    return Err(err);
                }
            }
        }
    }
}

#[async_trait]
impl<T: Transport> Transport for BackoffTransport<T> {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.execute(request).await
    }
}
