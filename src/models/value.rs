//! Cache values
//!
//! Write-side values, read-side decoded values, and the type hints that
//! select how a raw payload is decoded.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CacheError, Result};

// == Cache Value ==
/// A value handed to `put`, `put_if_absent` or `replace`.
///
/// Text and bytes travel as-is; anything else is stored as its JSON text.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheValue {
    Text(String),
    Bytes(Vec<u8>),
    Json(Value),
}

impl CacheValue {
    /// Serializes any serde value into its JSON form.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        serde_json::to_value(value)
            .map(CacheValue::Json)
            .map_err(|e| CacheError::InvalidValueType(format!("failed to serialize value: {}", e)))
    }
}

impl From<&str> for CacheValue {
    fn from(value: &str) -> Self {
        CacheValue::Text(value.to_string())
    }
}

impl From<String> for CacheValue {
    fn from(value: String) -> Self {
        CacheValue::Text(value)
    }
}

impl From<&[u8]> for CacheValue {
    fn from(value: &[u8]) -> Self {
        CacheValue::Bytes(value.to_vec())
    }
}

impl From<Vec<u8>> for CacheValue {
    fn from(value: Vec<u8>) -> Self {
        CacheValue::Bytes(value)
    }
}

impl From<Value> for CacheValue {
    fn from(value: Value) -> Self {
        CacheValue::Json(value)
    }
}

impl From<bool> for CacheValue {
    fn from(value: bool) -> Self {
        CacheValue::Json(Value::Bool(value))
    }
}

impl From<i64> for CacheValue {
    fn from(value: i64) -> Self {
        CacheValue::Json(Value::from(value))
    }
}

impl From<f64> for CacheValue {
    fn from(value: f64) -> Self {
        CacheValue::Json(Value::from(value))
    }
}

// == Type Hint ==
/// How a raw payload should be decoded on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeHint {
    String,
    #[serde(alias = "buffer")]
    Blob,
    Number,
    Array,
    Object,
    Boolean,
}

impl FromStr for TypeHint {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "string" => Ok(TypeHint::String),
            "blob" | "buffer" => Ok(TypeHint::Blob),
            "number" => Ok(TypeHint::Number),
            "array" => Ok(TypeHint::Array),
            "object" => Ok(TypeHint::Object),
            "boolean" => Ok(TypeHint::Boolean),
            other => Err(CacheError::InvalidValueType(format!(
                "unknown type hint '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for TypeHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeHint::String => "string",
            TypeHint::Blob => "blob",
            TypeHint::Number => "number",
            TypeHint::Array => "array",
            TypeHint::Object => "object",
            TypeHint::Boolean => "boolean",
        };
        f.write_str(name)
    }
}

// == Decoded Value ==
/// A payload after coercion by the value codec.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Text(String),
    Bytes(Vec<u8>),
    Number(f64),
    Bool(bool),
    Json(Value),
}

impl Decoded {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Decoded::Text(s) => Some(s),
            Decoded::Json(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Decoded::Bytes(b) => Some(b),
            Decoded::Text(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Decoded::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Decoded::Number(n) => Some(*n),
            Decoded::Json(v) => v.as_f64(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Decoded::Bool(b) => Some(*b),
            Decoded::Json(Value::Bool(b)) => Some(*b),
            _ => None,
        }
    }
}
