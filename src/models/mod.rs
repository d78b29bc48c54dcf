//! Data models for the cache client
//!
//! Defines keys, values and type hints shared by every backend.

pub mod key;
pub mod value;

pub use key::{CacheKey, IntoCacheKey};
pub use value::{CacheValue, Decoded, TypeHint};
