//! Coercion of loosely-typed caller input into frame fields.
//!
//! Addresses, commands, and scalar payloads arrive from command lines,
//! config files, and scripts in whatever shape the caller had at hand:
//! an integer, a hex or decimal string, a raw byte, or ASCII bytes such as
//! `b"0x01"`. [`Value`] captures those shapes as a closed set of variants,
//! and [`to_u8`] / [`to_payload`] normalize them into strict-domain values.
//!
//! # Hex/decimal trap
//!
//! [`to_u8`] parses bare text made only of hex digits **as hex**, so `"10"`
//! is 16 and `"25"` is 37. Only text containing a non-hex character (for
//! example `"-1"` or `"2 5"`) falls back to decimal. Hosts that talk to
//! existing firmware rely on this, so it is kept as is. Prefix numbers with
//! `0x` or pass integers to avoid surprises.
//!
//! [`to_payload`] does **not** share the heuristic: unprefixed text is
//! decimal there (`"25"` is 25).
//!
//! Both accept `_` between digits as a separator (`"1_0"`, `"0x_1f"`).

use std::num::IntErrorKind;

use picolink_core::{Error, Result};

/// A caller-supplied value of not-yet-known representation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Value {
    /// No value. Valid as an empty payload, rejected as an address/command.
    #[default]
    None,
    /// A native integer.
    Int(i64),
    /// Text holding a hex (`0x19`, `ff`) or decimal (`25`) number.
    Text(String),
    /// Raw bytes. A single byte is taken literally; longer sequences are
    /// read as ASCII text by [`to_u8`] and passed through by [`to_payload`].
    Bytes(Vec<u8>),
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::Int(i64::from(v))
                }
            }
        )*
    };
}

impl_from_int!(u8, u16, u32, i8, i16, i32, i64);

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Bytes(b.to_vec())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl<const N: usize> From<[u8; N]> for Value {
    fn from(b: [u8; N]) -> Self {
        Value::Bytes(b.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for Value {
    fn from(b: &[u8; N]) -> Self {
        Value::Bytes(b.to_vec())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::None, Into::into)
    }
}

/// Coerce a value into a single byte (address or command field).
///
/// - `Int`: must be within `0..=255`.
/// - `Bytes` of length 1: the byte itself.
/// - `Text`, or `Bytes` of any other length read as ASCII: trimmed, then
///   `0x`-prefixed text is hex, all-hex-digit text is hex, anything else is
///   decimal. See the module docs for why `"10"` yields 16.
///
/// # Example
///
/// ```
/// use picolink_protocol::value::{to_u8, Value};
///
/// assert_eq!(to_u8(&Value::from(0x42)).unwrap(), 0x42);
/// assert_eq!(to_u8(&Value::from("0x1F")).unwrap(), 0x1F);
/// assert_eq!(to_u8(&Value::from(b"\x07")).unwrap(), 0x07);
/// assert_eq!(to_u8(&Value::from("10")).unwrap(), 16);
/// assert!(to_u8(&Value::from(256)).is_err());
/// ```
pub fn to_u8(value: &Value) -> Result<u8> {
    match value {
        Value::None => Err(Error::UnsupportedType(
            "no value given for a byte field".into(),
        )),
        Value::Int(v) => byte_in_range(i128::from(*v)),
        Value::Bytes(b) if b.len() == 1 => Ok(b[0]),
        Value::Bytes(b) => text_to_u8(bytes_as_text(b)?),
        Value::Text(s) => text_to_u8(s),
    }
}

/// Coerce a value into a frame payload.
///
/// - `None`, empty bytes, or blank text: empty payload.
/// - `Bytes` of length 1: promoted to `[0x00, b]`.
/// - `Bytes` of any other length: used verbatim.
/// - `Text`: trimmed, `0x`-prefixed text is hex, otherwise decimal, then
///   treated as an integer.
/// - `Int` in `0..=255`: big-endian u16, `[0x00, v]`. Zero is accepted and
///   encodes as `[0x00, 0x00]`.
///
/// # Example
///
/// ```
/// use picolink_protocol::value::{to_payload, Value};
///
/// assert_eq!(to_payload(&Value::from(25)).unwrap(), vec![0x00, 0x19]);
/// assert_eq!(to_payload(&Value::from("0x19")).unwrap(), vec![0x00, 0x19]);
/// assert_eq!(to_payload(&Value::None).unwrap(), Vec::<u8>::new());
/// assert_eq!(to_payload(&Value::from([1u8, 2, 3])).unwrap(), vec![1, 2, 3]);
/// ```
pub fn to_payload(value: &Value) -> Result<Vec<u8>> {
    match value {
        Value::None => Ok(Vec::new()),
        Value::Bytes(b) if b.len() == 1 => Ok(vec![0x00, b[0]]),
        Value::Bytes(b) => Ok(b.clone()),
        Value::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(Vec::new());
            }
            let v = match strip_hex_prefix(trimmed) {
                Some(hex) => parse_hex(hex, s)?,
                None => parse_int(trimmed, 10, s)?,
            };
            int_to_payload(v)
        }
        Value::Int(v) => int_to_payload(i128::from(*v)),
    }
}

fn int_to_payload(v: i128) -> Result<Vec<u8>> {
    let byte = u8::try_from(v)
        .map_err(|_| Error::OutOfRange(format!("payload value {v} is outside 0..=255")))?;
    Ok(u16::from(byte).to_be_bytes().to_vec())
}

fn text_to_u8(text: &str) -> Result<u8> {
    let s = text.trim();
    let v = if let Some(hex) = strip_hex_prefix(s) {
        parse_hex(hex, text)?
    } else if s.chars().all(|c| c.is_ascii_hexdigit()) {
        parse_hex(s, text)?
    } else {
        parse_int(s, 10, text)?
    };
    byte_in_range(v)
}

fn byte_in_range(v: i128) -> Result<u8> {
    u8::try_from(v).map_err(|_| Error::OutOfRange(format!("{v} is outside 0..=255")))
}

fn bytes_as_text(b: &[u8]) -> Result<&str> {
    std::str::from_utf8(b)
        .map_err(|_| Error::Format(format!("bytes {b:02X?} are neither a single byte nor text")))
}

fn strip_hex_prefix(s: &str) -> Option<&str> {
    s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))
}

/// Digits after a `0x` prefix, or bare hex text. Signs are not allowed here,
/// which `from_str_radix` would otherwise accept.
fn parse_hex(digits: &str, original: &str) -> Result<i128> {
    let digits = without_separators(digits, true).ok_or_else(|| not_a_number(original))?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(not_a_number(original));
    }
    parse_int(&digits, 16, original)
}

fn parse_int(digits: &str, radix: u32, original: &str) -> Result<i128> {
    let digits = without_separators(digits, false).ok_or_else(|| not_a_number(original))?;
    i128::from_str_radix(&digits, radix).map_err(|e| match e.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
            Error::OutOfRange(format!("{original:?} is outside 0..=255"))
        }
        _ => not_a_number(original),
    })
}

/// Drop `_` digit separators (`1_000`, `0x_ff`). Each `_` must sit between
/// two digits, or directly after a `0x` prefix when `after_prefix` is set.
fn without_separators(digits: &str, after_prefix: bool) -> Option<String> {
    if !digits.contains('_') {
        return Some(digits.to_string());
    }
    let bytes = digits.as_bytes();
    for (i, _) in bytes.iter().enumerate().filter(|(_, b)| **b == b'_') {
        let before = match i {
            0 => after_prefix,
            _ => bytes[i - 1].is_ascii_hexdigit(),
        };
        let after = bytes.get(i + 1).is_some_and(|b| b.is_ascii_hexdigit());
        if !(before && after) {
            return None;
        }
    }
    Some(digits.replace('_', ""))
}

fn not_a_number(original: &str) -> Error {
    Error::Format(format!("{original:?} is not a number"))
}
