//! Hex formatting helpers for logging and command-line tools.
//!
//! Frames are usually shown as upper-case, space-separated hex bytes
//! (`A5 04 01 02 00 00 75 FC`), which is how serial monitors print them.

use crate::error::{Error, Result};

/// Format bytes as upper-case hex pairs separated by single spaces.
///
/// # Example
///
/// ```
/// use picolink_core::hex_string;
///
/// assert_eq!(hex_string(&[0xA5, 0x04, 0x0f]), "A5 04 0F");
/// assert_eq!(hex_string(&[]), "");
/// ```
pub fn hex_string(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| hex::encode_upper([*b]))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse hex text into bytes.
///
/// Whitespace, `:` and `-` separators are ignored, as is a leading `0x`, so
/// `"A5 04 01"`, `"a50401"`, and `"0xA5:04:01"` are all accepted.
///
/// # Example
///
/// ```
/// use picolink_core::parse_hex_bytes;
///
/// assert_eq!(parse_hex_bytes("A5 04 01").unwrap(), vec![0xA5, 0x04, 0x01]);
/// assert!(parse_hex_bytes("A5 0").is_err());
/// ```
pub fn parse_hex_bytes(text: &str) -> Result<Vec<u8>> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let digits: String = body
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && *c != ':' && *c != '-')
        .collect();

    hex::decode(&digits).map_err(|e| Error::Format(format!("invalid hex in {text:?}: {e}")))
}
