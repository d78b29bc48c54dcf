//! Codec Module
//!
//! Payload coercion for cache values and the multivalue framing used by
//! compare-and-replace.

pub mod multivalue;
pub mod value;

pub use multivalue::{Component, TextEncoding};
pub use value::{decode, serialize};

/// Content type of plain cache payloads
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Content type of multivalue-framed payloads
pub const MULTIVALUE_OCTET_STREAM: &str = "application/x-multivalue-octet-stream";
