//! Multivalue Wire Format
//!
//! Frames several components into one `application/x-multivalue-octet-stream`
//! body. All integers are 32-bit big-endian:
//!
//! ```text
//! [component_count] { [component_length][component bytes] } * component_count
//! ```
//!
//! The format carries no type tags, so decoding yields either all text or all
//! raw bytes depending on what the caller asks for.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{CacheError, Result};
use crate::models::CacheValue;

/// Size of every length prefix in bytes
const PREFIX_LEN: usize = 4;

// == Component ==
/// One framed element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Component {
    Text(String),
    Bytes(Vec<u8>),
}

impl Component {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Component::Text(text) => text.as_bytes(),
            Component::Bytes(bytes) => bytes,
        }
    }
}

impl From<&str> for Component {
    fn from(value: &str) -> Self {
        Component::Text(value.to_string())
    }
}

impl From<String> for Component {
    fn from(value: String) -> Self {
        Component::Text(value)
    }
}

impl From<&[u8]> for Component {
    fn from(value: &[u8]) -> Self {
        Component::Bytes(value.to_vec())
    }
}

impl From<Vec<u8>> for Component {
    fn from(value: Vec<u8>) -> Self {
        Component::Bytes(value)
    }
}

/// Structured values must be serialized before they are framed.
impl TryFrom<CacheValue> for Component {
    type Error = CacheError;

    fn try_from(value: CacheValue) -> Result<Self> {
        match value {
            CacheValue::Text(text) => Ok(Component::Text(text)),
            CacheValue::Bytes(bytes) => Ok(Component::Bytes(bytes)),
            CacheValue::Json(_) => Err(CacheError::InvalidComponentType(
                "multivalue expects strings or byte buffers; serialize structured values first"
                    .to_string(),
            )),
        }
    }
}

// == Text Encoding ==
/// Encoding used to turn textual input into bytes before decoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextEncoding {
    #[default]
    Utf8,
    Latin1,
    Base64,
}

impl TextEncoding {
    fn to_bytes(self, input: &str) -> Result<Vec<u8>> {
        match self {
            TextEncoding::Utf8 => Ok(input.as_bytes().to_vec()),
            TextEncoding::Latin1 => input
                .chars()
                .map(|c| {
                    u8::try_from(u32::from(c)).map_err(|_| {
                        CacheError::MalformedMultivalue(format!(
                            "character {:?} is outside latin1",
                            c
                        ))
                    })
                })
                .collect(),
            TextEncoding::Base64 => STANDARD
                .decode(input.trim())
                .map_err(|e| CacheError::MalformedMultivalue(format!("invalid base64: {}", e))),
        }
    }
}

// == Encode ==
/// Encodes an ordered sequence of components.
///
/// Output size is `4 + sum(4 + len(component))`. Fails only when a count or
/// length does not fit in 32 bits.
pub fn encode<I>(components: I) -> Result<Vec<u8>>
where
    I: IntoIterator,
    I::Item: Into<Component>,
{
    let components: Vec<Component> = components.into_iter().map(Into::into).collect();

    let total = PREFIX_LEN
        + components
            .iter()
            .map(|c| PREFIX_LEN + c.as_bytes().len())
            .sum::<usize>();
    let mut buf = Vec::with_capacity(total);

    buf.extend_from_slice(&length_prefix(components.len())?);
    for component in &components {
        let bytes = component.as_bytes();
        buf.extend_from_slice(&length_prefix(bytes.len())?);
        buf.extend_from_slice(bytes);
    }

    Ok(buf)
}

/// Encodes a single component as a one-element multivalue.
pub fn encode_one(component: impl Into<Component>) -> Result<Vec<u8>> {
    encode(std::iter::once(component.into()))
}

fn length_prefix(len: usize) -> Result<[u8; PREFIX_LEN]> {
    u32::try_from(len)
        .map(u32::to_be_bytes)
        .map_err(|_| {
            CacheError::InvalidComponentType(format!(
                "length {} does not fit in a 32-bit prefix",
                len
            ))
        })
}

// == Decode ==
/// Decodes a framed buffer.
///
/// `as_raw` selects byte components; otherwise every component must be
/// valid UTF-8 text. Any declared length that overruns the buffer, and any
/// trailing data after the last component, is rejected as a whole.
pub fn decode(buf: &[u8], as_raw: bool) -> Result<Vec<Component>> {
    if as_raw {
        Ok(decode_raw(buf)?.into_iter().map(Component::Bytes).collect())
    } else {
        Ok(decode_text(buf)?.into_iter().map(Component::Text).collect())
    }
}

/// Decodes textual input, first converting it to bytes with `encoding`.
pub fn decode_str(input: &str, encoding: TextEncoding, as_raw: bool) -> Result<Vec<Component>> {
    let bytes = encoding.to_bytes(input)?;
    decode(&bytes, as_raw)
}

/// Decodes a framed buffer into raw byte components.
pub fn decode_raw(buf: &[u8]) -> Result<Vec<Vec<u8>>> {
    let mut reader = FrameReader::new(buf);
    let count = reader.read_prefix("component count")? as usize;

    // Each component needs at least its own prefix
    if count > reader.remaining() / PREFIX_LEN {
        return Err(CacheError::MalformedMultivalue(format!(
            "declared {} components but only {} bytes follow",
            count,
            reader.remaining()
        )));
    }

    let mut components = Vec::with_capacity(count);
    for index in 0..count {
        let len = reader.read_prefix("component length")? as usize;
        components.push(reader.read_bytes(len, index)?.to_vec());
    }

    if reader.remaining() > 0 {
        return Err(CacheError::MalformedMultivalue(format!(
            "{} trailing bytes after {} components",
            reader.remaining(),
            count
        )));
    }

    Ok(components)
}

/// Decodes a framed buffer into UTF-8 text components.
pub fn decode_text(buf: &[u8]) -> Result<Vec<String>> {
    decode_raw(buf)?
        .into_iter()
        .enumerate()
        .map(|(index, bytes)| {
            String::from_utf8(bytes).map_err(|_| {
                CacheError::MalformedMultivalue(format!("component {} is not valid UTF-8", index))
            })
        })
        .collect()
}

// == Frame Reader ==
/// Bounds-checked cursor over a multivalue buffer.
struct FrameReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> FrameReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn read_prefix(&mut self, what: &str) -> Result<u32> {
        let end = self.pos + PREFIX_LEN;
        let bytes: [u8; PREFIX_LEN] = self
            .buf
            .get(self.pos..end)
            .and_then(|slice| slice.try_into().ok())
            .ok_or_else(|| {
                CacheError::MalformedMultivalue(format!(
                    "truncated {} at offset {}",
                    what, self.pos
                ))
            })?;
        self.pos = end;
        Ok(u32::from_be_bytes(bytes))
    }

    fn read_bytes(&mut self, len: usize, index: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(CacheError::MalformedMultivalue(format!(
                "component {} declares {} bytes but only {} remain",
                index,
                len,
                self.remaining()
            )));
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }
}
