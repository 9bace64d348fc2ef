//! Identifier canonicalization
//!
//! Identifiers arrive in two encodings: settings ids of the form
//! `PREFIX_HEXBLOCK_DEC.DEC.DEC` and free-text byte runs from test steps
//! (`aa bb cc`). Both are reduced to canonical hex, space-separated uppercase
//! byte pairs, and compared as strings.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Three or more two-digit hex groups, optionally separated by whitespace.
static BYTE_RUN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)([0-9A-F]{2}(?:\s*[0-9A-F]{2}){2,})").expect("valid byte run regex")
});

/// Hex block and decimal tail of a settings id, compared independently in
/// the PDI workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifierComponents {
    /// Last four characters of the hex block, uppercased.
    pub hex_part: String,
    /// Decimal tail as written, e.g. `010.020.003`.
    pub dec_part: String,
}

impl IdentifierComponents {
    pub fn new(hex_part: impl Into<String>, dec_part: impl Into<String>) -> Self {
        Self {
            hex_part: hex_part.into(),
            dec_part: dec_part.into(),
        }
    }
}

/// Uppercase, keep only `[0-9A-F]`, group into byte pairs joined by single
/// spaces. A trailing unpaired nibble is dropped.
pub fn canonicalize_hex(raw: &str) -> String {
    let digits: Vec<char> = raw
        .chars()
        .flat_map(char::to_uppercase)
        .filter(|c| matches!(c, '0'..='9' | 'A'..='F'))
        .collect();

    let mut out = String::with_capacity(digits.len() / 2 * 3);
    for pair in digits.chunks_exact(2) {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push(pair[0]);
        out.push(pair[1]);
    }
    out
}

/// Canonical hex of a settings id: last four hex digits of the second
/// segment followed by each decimal sub-token of the third segment as one
/// byte. Returns an empty string for ids with fewer than three segments.
///
/// Decimal values above 255 wrap modulo 256.
pub fn parse_identifier_to_hex(raw_identifier: &str) -> String {
    let Some((hex_block, dec_tail)) = split_segments(raw_identifier) else {
        return String::new();
    };

    let hex_digits: Vec<char> = hex_block.chars().filter(char::is_ascii_hexdigit).collect();
    let mut combined: String = hex_digits[hex_digits.len().saturating_sub(4)..]
        .iter()
        .collect();

    for token in dec_tail.split('.') {
        if let Some(byte) = decimal_byte(token) {
            combined.push_str(&format!("{byte:02X}"));
        }
    }

    canonicalize_hex(&combined)
}

/// Hex block (last four characters, uppercased, not filtered) and the
/// decimal tail verbatim. Both empty for ids with fewer than three segments.
pub fn parse_identifier_components(raw_identifier: &str) -> IdentifierComponents {
    match split_segments(raw_identifier) {
        Some((hex_block, dec_tail)) => {
            let chars: Vec<char> = hex_block.chars().collect();
            let hex_part: String = chars[chars.len().saturating_sub(4)..].iter().collect();
            IdentifierComponents::new(hex_part.to_uppercase(), dec_tail)
        }
        None => IdentifierComponents::default(),
    }
}

/// Canonical hex of the first run of three or more byte pairs in `text`.
pub fn extract_bytes_from_free_text(text: &str) -> String {
    BYTE_RUN
        .find(text)
        .map(|m| canonicalize_hex(m.as_str()))
        .unwrap_or_default()
}

/// Second and third `_` segments. Segments after the third are ignored.
fn split_segments(raw: &str) -> Option<(&str, &str)> {
    let mut parts = raw.split('_');
    let _prefix = parts.next()?;
    let hex_block = parts.next()?;
    let dec_tail = parts.next()?;
    Some((hex_block, dec_tail))
}

/// Purely numeric token reduced to one byte, `None` for anything else.
fn decimal_byte(token: &str) -> Option<u8> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value = token
        .bytes()
        .fold(0u32, |acc, b| (acc * 10 + u32::from(b - b'0')) % 256);
    u8::try_from(value).ok()
}
