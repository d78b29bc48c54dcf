//! reqwest-backed transport

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{HttpRequest, HttpResponse, Transport};
use crate::error::{TransportError, TransportErrorKind};

/// Connect-phase timeout used when none is configured
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Sends requests with a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport whose individual attempts time out after `timeout`.
    ///
    /// Falls back to reqwest's default client, with a warning, if the
    /// configured client cannot be built. Use [`HttpTransport::with_timeouts`]
    /// to get the error instead.
    pub fn new(timeout: Duration) -> Self {
        Self::with_timeouts(DEFAULT_CONNECT_TIMEOUT, timeout).unwrap_or_else(|err| {
            warn!("Falling back on a default HTTP client without timeouts: {}", err);
            Self::with_client(reqwest::Client::default())
        })
    }

    /// Creates a transport with separate connect and per-attempt timeouts.
    ///
    /// # Arguments
    /// * `connect_timeout` - Limit on establishing the connection; hitting it
    ///   is a connect failure and therefore retried by the backoff layer
    /// * `request_timeout` - Limit on one whole attempt
    pub fn with_timeouts(
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .user_agent(concat!("ccs_cache/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                TransportError::new(
                    TransportErrorKind::Other,
                    format!("failed to build HTTP client: {}", e),
                )
            })?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        debug!("{} {}", request.method, request.url);

        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(*name, value.as_str());
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        debug!("{} {} -> {}", request.method, request.url, status);
        Ok(HttpResponse { status, body })
    }
}
