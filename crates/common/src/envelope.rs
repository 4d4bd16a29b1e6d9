//! Ciphertext envelope wire contract.
//!
//! # Format
//!
//! ```text
//! <hex(iv)>:<hex(ciphertext)>
//! ```
//!
//! The IV segment is exactly [`IV_HEX_LEN`] hex digits and the data segment is
//! one or more hex digits, either case. The envelope carries no algorithm
//! identifier, version, or authentication tag; the shape check below is the
//! only thing that marks a string as "already encrypted".
//!
//! The check is a heuristic. A plaintext that happens to look like
//! `<32 hex>:<hex>` is classified as an envelope, fails to decrypt, and is
//! returned unchanged by both runtimes.

use crate::value::Value;

/// Byte length of the random IV drawn for every encryption (one AES block).
pub const IV_LEN: usize = 16;

/// Hex length of the IV segment.
pub const IV_HEX_LEN: usize = IV_LEN * 2;

/// Separator between the IV and data segments.
pub const SEPARATOR: char = ':';

/// The two hex segments of a string that passed the shape check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeParts<'a> {
    /// Hex-encoded IV, exactly [`IV_HEX_LEN`] characters.
    pub iv_hex: &'a str,
    /// Hex-encoded ciphertext, non-empty. Not guaranteed to be even-length.
    pub data_hex: &'a str,
}

/// Split `value` into its envelope segments if it has the envelope shape.
///
/// Returns `None` unless `value` splits on [`SEPARATOR`] into exactly two
/// parts, the first matching `^[0-9a-fA-F]{32}$` and the second matching
/// `^[0-9a-fA-F]+$`.
pub fn split(value: &str) -> Option<EnvelopeParts<'_>> {
    let mut parts = value.split(SEPARATOR);
    let iv_hex = parts.next()?;
    let data_hex = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    if iv_hex.len() != IV_HEX_LEN || !is_hex(iv_hex) {
        return None;
    }
    if data_hex.is_empty() || !is_hex(data_hex) {
        return None;
    }
    Some(EnvelopeParts { iv_hex, data_hex })
}

/// Returns `true` if `value` has the envelope shape.
pub fn is_envelope(value: &str) -> bool {
    split(value).is_some()
}

/// Returns `true` if `value` is a string with the envelope shape.
///
/// Every non-string value is `false`.
pub fn is_envelope_value(value: &Value) -> bool {
    match value {
        Value::String(s) => is_envelope(s),
        _ => false,
    }
}

fn is_hex(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    const IV: &str = "000102030405060708090a0b0c0d0e0f";

    #[test]
    fn accepts_lower_and_upper_case() {
        assert!(is_envelope(&format!("{IV}:82b8eb101452d8d165e080cc0d34f451")));
        assert!(is_envelope(
            "000102030405060708090A0B0C0D0E0F:82B8EB101452D8D165E080CC0D34F451"
        ));
    }

    #[test]
    fn split_returns_segments() {
        let s = format!("{IV}:abcd");
        let parts = split(&s).unwrap();
        assert_eq!(parts.iv_hex, IV);
        assert_eq!(parts.data_hex, "abcd");
    }

    #[test]
    fn short_strings_are_never_envelopes() {
        assert!(!is_envelope("Juan Cruz!"));
        assert!(!is_envelope(""));
        assert!(!is_envelope(":"));
    }

    #[test]
    fn rejects_wrong_iv_length() {
        assert!(!is_envelope("0001020304050607:abcd"));
        assert!(!is_envelope(&format!("{IV}00:abcd")));
    }

    #[test]
    fn rejects_empty_or_non_hex_data() {
        assert!(!is_envelope(&format!("{IV}:")));
        assert!(!is_envelope(&format!("{IV}:xyz")));
        assert!(!is_envelope(&format!("{IV}:ab cd")));
    }

    #[test]
    fn rejects_extra_separators() {
        assert!(!is_envelope(&format!("{IV}:abcd:ef")));
        assert!(!is_envelope(&format!(":{IV}:abcd")));
    }

    #[test]
    fn odd_length_data_still_has_the_shape() {
        // Shape only; decoding is the cipher's job.
        assert!(is_envelope(&format!("{IV}:abc")));
    }

    #[test]
    fn coincidental_plaintext_is_misclassified() {
        let lookalike = "deadbeefdeadbeefdeadbeefdeadbeef:cafe";
        assert!(is_envelope(lookalike));
    }

    #[test]
    fn non_strings_are_not_envelopes() {
        assert!(!is_envelope_value(&Value::Null));
        assert!(!is_envelope_value(&Value::Bool(true)));
        assert!(!is_envelope_value(&Value::List(vec![Value::String(format!(
            "{IV}:abcd"
        ))])));
        assert!(is_envelope_value(&Value::String(format!("{IV}:abcd"))));
    }
}
