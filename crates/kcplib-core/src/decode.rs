//! Byte-to-value decoding primitives and the per-command decode mapping.
//!
//! KCP response arguments arrive as raw byte groups. Each command declares,
//! by position, whether a group is text or a signed integer
//! ([`FieldKind`]); [`decode_fields`] applies that layout. Positions beyond
//! the declared layout decode as text.

use std::fmt;

use crate::error::{Error, Result};

/// How a response argument at a given position is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// UTF-8 text.
    Text,
    /// ASCII decimal signed integer.
    SignedInteger,
}

/// A typed response argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedValue {
    /// A decoded string.
    Text(String),
    /// A decoded signed integer.
    Integer(i64),
}

impl DecodedValue {
    /// The text payload, if this is a [`DecodedValue::Text`].
    pub fn as_text(&self) -> Option<&str> {
        match self {
            DecodedValue::Text(s) => Some(s),
            DecodedValue::Integer(_) => None,
        }
    }

    /// The integer payload, if this is a [`DecodedValue::Integer`].
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            DecodedValue::Integer(n) => Some(*n),
            DecodedValue::Text(_) => None,
        }
    }

    /// Fetch the text field at `index`, failing with [`Error::Decode`] if it
    /// is missing or not text.
    pub fn text_at(values: &[DecodedValue], index: usize) -> Result<&str> {
        values
            .get(index)
            .and_then(DecodedValue::as_text)
            .ok_or_else(|| Error::Decode(format!("expected text field at position {index}")))
    }

    /// Fetch the integer field at `index`, failing with [`Error::Decode`] if
    /// it is missing or not an integer.
    pub fn integer_at(values: &[DecodedValue], index: usize) -> Result<i64> {
        values
            .get(index)
            .and_then(DecodedValue::as_integer)
            .ok_or_else(|| Error::Decode(format!("expected integer field at position {index}")))
    }
}

impl fmt::Display for DecodedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodedValue::Text(s) => f.write_str(s),
            DecodedValue::Integer(n) => write!(f, "{n}"),
        }
    }
}

/// Decode a byte group as a UTF-8 string.
///
/// # Example
///
/// ```
/// use kcplib_core::decode_string_bytes;
///
/// assert_eq!(decode_string_bytes(&[0x31, 0x32, 0x33]).unwrap(), "123");
/// assert!(decode_string_bytes(&[0xFF]).is_err());
/// ```
pub fn decode_string_bytes(bytes: &[u8]) -> Result<String> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| Error::Decode(format!("invalid UTF-8 in text field: {e}")))
}

/// Decode a byte group as an ASCII decimal signed integer.
///
/// Accepts an optional leading `+` or `-` followed by one or more digits.
///
/// # Example
///
/// ```
/// use kcplib_core::decode_signed_integer_bytes;
///
/// assert_eq!(decode_signed_integer_bytes(b"-42").unwrap(), -42);
/// assert_eq!(decode_signed_integer_bytes(b"+7").unwrap(), 7);
/// assert!(decode_signed_integer_bytes(b"4x").is_err());
/// ```
pub fn decode_signed_integer_bytes(bytes: &[u8]) -> Result<i64> {
    let digits = match bytes.first() {
        Some(b'+' | b'-') => &bytes[1..],
        _ => bytes,
    };
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return Err(Error::Decode(format!(
            "not a signed integer: {:?}",
            String::from_utf8_lossy(bytes)
        )));
    }
    // Only ASCII sign and digits remain, so the UTF-8 conversion cannot fail.
    let text = std::str::from_utf8(bytes)
        .map_err(|e| Error::Decode(format!("invalid UTF-8 in integer field: {e}")))?;
    text.parse::<i64>()
        .map_err(|e| Error::Decode(format!("integer out of range: {text}: {e}")))
}

/// Decode a byte group as an ASCII decimal number such as `"-12.0050"`.
///
/// Used for weight readings. Exponents, `inf` and `nan` are rejected.
///
/// # Example
///
/// ```
/// use kcplib_core::decode_decimal_bytes;
///
/// assert_eq!(decode_decimal_bytes(b"100.25").unwrap(), 100.25);
/// assert_eq!(decode_decimal_bytes(b"-0.5").unwrap(), -0.5);
/// assert!(decode_decimal_bytes(b"1e3").is_err());
/// ```
pub fn decode_decimal_bytes(bytes: &[u8]) -> Result<f64> {
    let body = match bytes.first() {
        Some(b'+' | b'-') => &bytes[1..],
        _ => bytes,
    };
    let digit_count = body.iter().filter(|b| b.is_ascii_digit()).count();
    let dot_count = body.iter().filter(|&&b| b == b'.').count();
    if digit_count == 0 || dot_count > 1 || digit_count + dot_count != body.len() {
        return Err(Error::Decode(format!(
            "not a decimal number: {:?}",
            String::from_utf8_lossy(bytes)
        )));
    }
    let text = std::str::from_utf8(bytes)
        .map_err(|e| Error::Decode(format!("invalid UTF-8 in decimal field: {e}")))?;
    text.parse::<f64>()
        .map_err(|e| Error::Decode(format!("not a decimal number: {text}: {e}")))
}

/// Decode a response's argument byte groups using a positional layout.
///
/// Positions not covered by `layout` decode as [`FieldKind::Text`]. Missing
/// positions are not an error here; drivers check the count they need.
pub fn decode_fields(layout: &[FieldKind], arguments: &[Vec<u8>]) -> Result<Vec<DecodedValue>> {
    arguments
        .iter()
        .enumerate()
        .map(|(i, group)| match layout.get(i).copied().unwrap_or(FieldKind::Text) {
            FieldKind::Text => decode_string_bytes(group).map(DecodedValue::Text),
            FieldKind::SignedInteger => decode_signed_integer_bytes(group).map(DecodedValue::Integer),
        })
        .collect()
}
