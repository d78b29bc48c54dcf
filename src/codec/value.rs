//! Value Codec
//!
//! Converts typed values to the octet-stream payloads the cache stores, and
//! coerces payloads back using an optional [`TypeHint`].

use serde_json::Value;

use crate::error::{CacheError, Result};
use crate::models::{CacheValue, Decoded, TypeHint};

// == Serialize ==
/// Produces the payload for a write.
///
/// Text and raw bytes pass through unchanged; JSON values are written as
/// their UTF-8 JSON text.
pub fn serialize(value: CacheValue) -> Vec<u8> {
    match value {
        CacheValue::Text(text) => text.into_bytes(),
        CacheValue::Bytes(bytes) => bytes,
        CacheValue::Json(json) => json.to_string().into_bytes(),
    }
}

// == Decode ==
/// Coerces a raw payload into a typed value.
///
/// Without a hint the payload is parsed as JSON when possible and otherwise
/// returned as text (or bytes, when it is not valid UTF-8).
pub fn decode(raw: &[u8], hint: Option<TypeHint>) -> Result<Decoded> {
    let Some(hint) = hint else {
        return Ok(best_guess(raw));
    };

    match hint {
        TypeHint::String => String::from_utf8(raw.to_vec())
            .map(Decoded::Text)
            .map_err(|_| CacheError::TypeMismatch("string was requested, but payload is not UTF-8".to_string())),
        TypeHint::Blob => Ok(Decoded::Bytes(raw.to_vec())),
        TypeHint::Number => {
            let text = std::str::from_utf8(raw).map_err(|_| {
                CacheError::TypeMismatch("number was requested, but payload is not UTF-8".to_string())
            })?;
            parse_number(text).map(Decoded::Number)
        }
        TypeHint::Array => {
            let items = match serde_json::from_slice::<Value>(raw) {
                Ok(Value::Array(items)) => items,
                Ok(other) => vec![other],
                Err(_) => vec![Value::String(String::from_utf8_lossy(raw).into_owned())],
            };
            Ok(Decoded::Json(Value::Array(items)))
        }
        // Only the literal "false" is false; any other non-empty payload is true.
        TypeHint::Boolean => Ok(Decoded::Bool(raw != b"false" && !raw.is_empty())),
        TypeHint::Object => Ok(best_guess(raw)),
    }
}

fn best_guess(raw: &[u8]) -> Decoded {
    if let Ok(json) = serde_json::from_slice::<Value>(raw) {
        return Decoded::Json(json);
    }
    match String::from_utf8(raw.to_vec()) {
        Ok(text) => Decoded::Text(text),
        Err(err) => Decoded::Bytes(err.into_bytes()),
    }
}

fn parse_number(text: &str) -> Result<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }

    let parsed = match (trimmed, radix_prefix(trimmed)) {
        (_, Some(radix)) => parse_radix(&trimmed[2..], radix),
        ("Infinity" | "+Infinity", _) => Some(f64::INFINITY),
        ("-Infinity", _) => Some(f64::NEG_INFINITY),
        // f64::from_str also accepts "inf" and "nan", which are not numbers here
        _ if trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E')) =>
        {
            trimmed.parse::<f64>().ok()
        }
        _ => None,
    };

    parsed.filter(|n| !n.is_nan()).ok_or_else(|| {
        CacheError::TypeMismatch(format!(
            "number was requested, but '{}' is not a number",
            trimmed
        ))
    })
}

/// Radix of a `0x`, `0o` or `0b` prefixed literal.
fn radix_prefix(text: &str) -> Option<u32> {
    match text.get(..2) {
        Some("0x" | "0X") => Some(16),
        Some("0o" | "0O") => Some(8),
        Some("0b" | "0B") => Some(2),
        _ => None,
    }
}

/// Unsigned digits of any length. Values past `u128` keep growing as a
/// float and reach infinity rather than failing.
fn parse_radix(digits: &str, radix: u32) -> Option<f64> {
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    if let Ok(n) = u128::from_str_radix(digits, radix) {
        return Some(n as f64);
    }
    digits.chars().try_fold(0f64, |acc, c| {
        c.to_digit(radix)
            .map(|d| acc * f64::from(radix) + f64::from(d))
    })
}
