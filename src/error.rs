//! Error types for the cache client
//!
//! Provides unified error handling using thiserror.

use std::fmt;

use thiserror::Error;

// == Transport Error ==
/// Classification of a failed HTTP exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// DNS resolution failed or the connection was refused / could not be established
    Connect,
    /// The request was sent but no response arrived in time
    Timeout,
    /// Anything else (malformed response, body read failure, ...)
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransportErrorKind::Connect => "connect",
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::Other => "other",
        };
        f.write_str(label)
    }
}

/// Network-level failure surfaced by a [`Transport`](crate::transport::Transport).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} error: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Connect, message)
    }

    /// Only connection-establishment failures are worth retrying.
    pub fn is_connect(&self) -> bool {
        self.kind == TransportErrorKind::Connect
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_connect() {
            TransportErrorKind::Connect
        } else if err.is_timeout() {
            TransportErrorKind::Timeout
        } else {
            TransportErrorKind::Other
        };
        Self::new(kind, err.to_string())
    }
}

// == Cache Error Enum ==
/// Unified error type for the cache client.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key is neither a string nor an integral number
    #[error("Invalid key type: {0}")]
    InvalidKeyType(String),

    /// Unknown type hint or otherwise unusable value type
    #[error("Invalid value type: {0}")]
    InvalidValueType(String),

    /// TTL supplied but not positive
    #[error("Invalid TTL: {0}")]
    InvalidTtl(String),

    /// A required argument was empty
    #[error("Missing argument: {0}")]
    MissingArgument(&'static str),

    /// putIfAbsent found a live entry
    #[error("Did not insert entry, key already exists: {0}")]
    KeyAlreadyExists(String),

    /// replace found a value different from the expected old value
    #[error("Did not replace entry, cached value does not equal the old value: {0}")]
    ValueMismatch(String),

    /// Payload could not be coerced to the requested type
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// Multivalue component that is neither text nor raw bytes
    #[error("Invalid multivalue component: {0}")]
    InvalidComponentType(String),

    /// Multivalue buffer whose declared lengths do not fit the data
    #[error("Malformed multivalue: {0}")]
    MalformedMultivalue(String),

    /// Network failure, after retries when the failure was retryable
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Remote service answered with a status the operation does not expect
    #[error("Unexpected status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// Remote service answered with a body that could not be parsed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Unusable endpoint configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache client.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_display() {
        let err = TransportError::connect("connection refused");
        assert_eq!(err.to_string(), "connect error: connection refused");
        assert!(err.is_connect());
    }

    #[test]
    fn test_timeout_is_not_connect() {
        let err = TransportError::new(TransportErrorKind::Timeout, "slow");
        assert!(!err.is_connect());
    }

    #[test]
    fn test_transport_error_converts_into_cache_error() {
        let err: CacheError = TransportError::connect("refused").into();
        assert!(matches!(err, CacheError::Transport(ref t) if t.is_connect()));
    }
}
