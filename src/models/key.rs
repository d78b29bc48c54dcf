//! Cache keys
//!
//! Every key is normalized to its string form before it reaches a backend,
//! so `155` and `"155"` address the same entry.

use std::fmt;

use serde_json::Value;

use crate::error::{CacheError, Result};

// == Cache Key ==
/// A validated, non-empty cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Validates a string key.
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        if key.is_empty() {
            return Err(CacheError::MissingArgument("key"));
        }
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// == Conversion Trait ==
/// Anything that can name a cache entry: strings and numbers.
///
/// Conversion happens before any I/O, so an invalid key never reaches a backend.
pub trait IntoCacheKey {
    fn into_cache_key(self) -> Result<CacheKey>;
}

impl IntoCacheKey for CacheKey {
    fn into_cache_key(self) -> Result<CacheKey> {
        Ok(self)
    }
}

impl IntoCacheKey for &CacheKey {
    fn into_cache_key(self) -> Result<CacheKey> {
        Ok(self.clone())
    }
}

impl IntoCacheKey for &str {
    fn into_cache_key(self) -> Result<CacheKey> {
        CacheKey::new(self)
    }
}

impl IntoCacheKey for String {
    fn into_cache_key(self) -> Result<CacheKey> {
        CacheKey::new(self)
    }
}

impl IntoCacheKey for &String {
    fn into_cache_key(self) -> Result<CacheKey> {
        CacheKey::new(self.as_str())
    }
}

macro_rules! integer_keys {
    ($($ty:ty),*) => {
        $(
            impl IntoCacheKey for $ty {
                fn into_cache_key(self) -> Result<CacheKey> {
                    Ok(CacheKey(self.to_string()))
                }
            }
        )*
    };
}

integer_keys!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl IntoCacheKey for f64 {
    fn into_cache_key(self) -> Result<CacheKey> {
        if !self.is_finite() {
            return Err(CacheError::InvalidKeyType(format!(
                "non-finite number {} cannot be a key",
                self
            )));
        }
        Ok(CacheKey(number_key(self)))
    }
}

/// Renders a finite number the way JavaScript's `String(n)` does, so keys
/// written by other clients of the service line up: plain decimal for
/// magnitudes in `[1e-6, 1e21)`, shortest exponent form with a signed
/// exponent outside it, and `0` for negative zero.
fn number_key(n: f64) -> String {
    if n == 0.0 {
        return "0".to_string();
    }
    if (1e-6..1e21).contains(&n.abs()) {
        // Display drops the fraction for integral values: 155.0 -> "155"
        return n.to_string();
    }
    let formatted = format!("{:e}", n);
    match formatted.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{}e+{}", mantissa, exponent)
        }
        _ => formatted,
    }
}

impl IntoCacheKey for f32 {
    fn into_cache_key(self) -> Result<CacheKey> {
        f64::from(self).into_cache_key()
    }
}

impl IntoCacheKey for &Value {
    fn into_cache_key(self) -> Result<CacheKey> {
        match self {
            Value::String(s) => CacheKey::new(s.as_str()),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    i.into_cache_key()
                } else if let Some(u) = n.as_u64() {
                    u.into_cache_key()
                } else {
                    n.as_f64().unwrap_or(f64::NAN).into_cache_key()
                }
            }
            other => Err(CacheError::InvalidKeyType(format!(
                "caching keys must be strings or numbers, got {}",
                json_type_name(other)
            ))),
        }
    }
}

impl IntoCacheKey for Value {
    fn into_cache_key(self) -> Result<CacheKey> {
        (&self).into_cache_key()
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
