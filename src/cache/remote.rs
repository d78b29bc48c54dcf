//! Remote cache client
//!
//! Maps each cache operation onto the caching service's REST interface:
//!
//! | Operation     | Request                                                     |
//! |---------------|-------------------------------------------------------------|
//! | get           | `GET /{cache}/{key}` (404 = absent)                         |
//! | put           | `PUT /{cache}/{key}`                                        |
//! | put_if_absent | `POST /{cache}/{key}`, `X-Method: putIfAbsent` (409 = taken)|
//! | replace       | `POST /{cache}/{key}`, `X-Method: replaceValue` (409 = miss)|
//! | delete        | `DELETE /{cache}/{key}`                                     |
//! | clear         | `DELETE /{cache}`                                           |
//! | stats         | `GET /{cache}`                                              |
//!
//! TTLs travel as a `ttl` query parameter in milliseconds.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, Url};
use tracing::debug;

use crate::cache::stats::RemoteStatsBody;
use crate::cache::{CacheBackend, CacheStats};
use crate::codec::{multivalue, MULTIVALUE_OCTET_STREAM, OCTET_STREAM};
use crate::error::{CacheError, Result};
use crate::models::CacheKey;
use crate::transport::{BackoffPolicy, BackoffTransport, HttpRequest, HttpResponse, HttpTransport, Transport};

const STATUS_NOT_FOUND: u16 = 404;
const STATUS_CONFLICT: u16 = 409;

// == Remote Cache ==
/// Client for one named cache on the remote caching service.
#[derive(Debug)]
pub struct RemoteCache<T = HttpTransport> {
    name: String,
    cache_url: Url,
    transport: BackoffTransport<T>,
}

impl<T: Transport> RemoteCache<T> {
    /// Creates a client for cache `name` under `base_url`.
    ///
    /// # Arguments
    /// * `name` - Cache name, percent-encoded into the path
    /// * `base_url` - Service root, e.g. `http://host:8080/ccs`
    /// * `transport` - Transport used for each attempt
    /// * `policy` - Retry schedule for connection failures
    pub fn new(name: impl Into<String>, base_url: &str, transport: T, policy: BackoffPolicy) -> Result<Self> {
        let name = name.into();
        let mut cache_url = Url::parse(base_url)
            .map_err(|e| CacheError::Config(format!("invalid cache URL '{}': {}", base_url, e)))?;
        cache_url
            .path_segments_mut()
            .map_err(|_| CacheError::Config(format!("cache URL '{}' cannot be a base", base_url)))?
            .pop_if_empty()
            .push(&name);

        Ok(Self {
            name,
            cache_url,
            transport: BackoffTransport::new(transport, policy),
        })
    }

    pub fn cache_url(&self) -> &Url {
        &self.cache_url
    }

    pub fn transport(&self) -> &BackoffTransport<T> {
        &self.transport
    }

    fn key_url(&self, key: &CacheKey) -> Url {
        let mut url = self.cache_url.clone();
        // cache_url was validated as a base URL in new()
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(key.as_str());
        }
        url
    }

    fn with_ttl(request: HttpRequest, ttl: Option<Duration>) -> HttpRequest {
        match ttl {
            Some(ttl) => request.query("ttl", ttl.as_millis().max(1).to_string()),
            None => request,
        }
    }

    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        Ok(self.transport.execute(&request).await?)
    }
}

fn unexpected(response: &HttpResponse) -> CacheError {
    CacheError::UnexpectedStatus {
        status: response.status,
        body: response.body_text(),
    }
}

#[async_trait]
impl<T: Transport + 'static> CacheBackend for RemoteCache<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_remote(&self) -> bool {
        true
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>> {
        let request = HttpRequest::new(Method::GET, self.key_url(key));
        let response = self.execute(request).await?;
        match response.status {
            STATUS_NOT_FOUND => Ok(None),
            _ if response.is_success() => Ok(Some(response.body)),
            _ => Err(unexpected(&response)),
        }
    }

    async fn put(&self, key: &CacheKey, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        let request = HttpRequest::new(Method::PUT, self.key_url(key))
            .header("Content-Type", OCTET_STREAM)
            .body(value);
        let response = self.execute(Self::with_ttl(request, ttl)).await?;
        if !response.is_success() {
            return Err(unexpected(&response));
        }
        Ok(())
    }

    async fn put_if_absent(
        &self,
        key: &CacheKey,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let request = HttpRequest::new(Method::POST, self.key_url(key))
            .header("Content-Type", OCTET_STREAM)
            .header("X-Method", "putIfAbsent")
            .query("returnOld", "true")
            .body(value);
        let response = self.execute(Self::with_ttl(request, ttl)).await?;
        match response.status {
            STATUS_CONFLICT => Err(CacheError::KeyAlreadyExists(key.to_string())),
            _ if response.is_success() => Ok(()),
            _ => Err(unexpected(&response)),
        }
    }

    async fn replace(
        &self,
        key: &CacheKey,
        new_value: Vec<u8>,
        old_value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<()> {
        // The service expects the expected value first, then the replacement
        let body = multivalue::encode([old_value, new_value])?;
        let request = HttpRequest::new(Method::POST, self.key_url(key))
            .header("Content-Type", MULTIVALUE_OCTET_STREAM)
            .header("X-Method", "replaceValue")
            .body(body);
        let response = self.execute(Self::with_ttl(request, ttl)).await?;
        match response.status {
            STATUS_CONFLICT => Err(CacheError::ValueMismatch(key.to_string())),
            _ if response.is_success() => Ok(()),
            _ => Err(unexpected(&response)),
        }
    }

    async fn delete(&self, key: &CacheKey) -> Result<()> {
        let request = HttpRequest::new(Method::DELETE, self.key_url(key));
        let response = self.execute(request).await?;
        // Deleting an absent key is not an error
        if response.is_success() || response.status == STATUS_NOT_FOUND {
            Ok(())
        } else {
            Err(unexpected(&response))
        }
    }

    async fn clear(&self) -> Result<()> {
        let request = HttpRequest::new(Method::DELETE, self.cache_url.clone());
        let response = self.execute(request).await?;
        if response.is_success() || response.status == STATUS_NOT_FOUND {
            debug!("Cleared remote cache '{}'", self.name);
            Ok(())
        } else {
            Err(unexpected(&response))
        }
    }

    async fn stats(&self) -> Result<CacheStats> {
        let request = HttpRequest::new(Method::GET, self.cache_url.clone());
        let response = self.execute(request).await?;
        if !response.is_success() {
            return Err(unexpected(&response));
        }
        let body: RemoteStatsBody = serde_json::from_slice(&response.body).map_err(|e| {
            CacheError::InvalidResponse(format!("stats body for '{}': {}", self.name, e))
        })?;
        Ok(CacheStats {
            cache: self.name.clone(),
            count: body.count,
            size: body.size,
        })
    }
}
