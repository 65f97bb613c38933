//! Deterministic identifiers for projects, folders and filters.
//!
//! An identifier is derived from the SHA-256 digest of a canonical string
//! form of its input and formatted like a version 4 UUID. Mappings are
//! canonicalised (RFC 8785) so key order never changes the result.
//!
//! # Examples
//!
//! ```
//! use serde_json::json;
//! use slnweave::identify::identify;
//!
//! let a = identify(&json!({"x": 1, "y": 2}), None).unwrap();
//! let b = identify(&json!({"y": 2, "x": 1}), None).unwrap();
//! assert_eq!(a, b);
//! assert_eq!(a.as_str().len(), 36);
//! ```

use std::fmt;

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

const HEX_DIGITS: usize = 32;
const VERSION_INDEX: usize = 12;
const VARIANT_INDEX: usize = 16;
const GROUPS: [usize; 4] = [8, 12, 16, 20];

/// Stable identifier in `8-4-4-4-12` upper-case hex form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// Borrow the formatted identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The first `len` hex digits, skipping separators.
    #[must_use]
    pub fn hex_prefix(&self, len: usize) -> String {
        self.0.chars().filter(|c| *c != '-').take(len).collect()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors raised while deriving an identifier.
#[derive(Debug, Error)]
pub enum IdentifyError {
    /// The value could not be canonicalised.
    #[error("failed to canonicalise identifier input")]
    Canonicalise(#[source] serde_json::Error),
    /// The prefix contains non-hex characters or is too long.
    #[error("identifier prefix `{prefix}` must be at most 32 hex digits")]
    InvalidPrefix {
        /// The rejected prefix.
        prefix: String,
    },
}

/// Derive an identifier from `value`, optionally splicing `prefix` over the
/// leading hex digits.
///
/// # Errors
///
/// Returns [`IdentifyError::InvalidPrefix`] for a malformed prefix and
/// [`IdentifyError::Canonicalise`] if a structured value cannot be
/// canonicalised.
pub fn identify(value: &Value, prefix: Option<&str>) -> Result<Identifier, IdentifyError> {
    if let Some(p) = prefix
        && (p.len() > HEX_DIGITS || !p.chars().all(|c| c.is_ascii_hexdigit()))
    {
        return Err(IdentifyError::InvalidPrefix {
            prefix: p.to_owned(),
        });
    }
    let canonical = canonical_text(value)?;
    let digest = Sha256::digest(canonical.as_bytes());
    let hex: String = digest
        .iter()
        .take(HEX_DIGITS / 2)
        .map(|byte| format!("{byte:02X}"))
        .collect();
    let lead = prefix.unwrap_or_default().to_ascii_uppercase();
    let spliced = lead.chars().chain(hex.chars().skip(lead.len()));
    Ok(Identifier(format_uuid(spliced)))
}

/// Identifier of a plain string, such as a path or a directory prefix.
///
/// # Errors
///
/// See [`identify`]; a string input never fails canonicalisation.
pub fn identify_str(text: &str) -> Result<Identifier, IdentifyError> {
    identify(&Value::String(text.to_owned()), None)
}

fn canonical_text(value: &Value) -> Result<String, IdentifyError> {
    match value {
        Value::String(text) => Ok(text.clone()),
        Value::Object(_) | Value::Array(_) => {
            serde_json_canonicalizer::to_string(value).map_err(IdentifyError::Canonicalise)
        }
        scalar => Ok(scalar.to_string()),
    }
}

fn format_uuid(digits: impl Iterator<Item = char>) -> String {
    let mut out = String::with_capacity(HEX_DIGITS + GROUPS.len());
    for (index, digit) in digits.enumerate() {
        if GROUPS.contains(&index) {
            out.push('-');
        }
        out.push(match index {
            VERSION_INDEX => '4',
            VARIANT_INDEX => variant_digit(digit),
            _ => digit,
        });
    }
    out
}

fn variant_digit(digit: char) -> char {
    let low = digit.to_digit(16).unwrap_or_default() & 0x3;
    char::from_digit(0x8 | low, 16)
        .unwrap_or('8')
        .to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, reason = "identifier tests use expect for clearer failures")]

    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    fn key_order_does_not_matter() {
        let a = identify(&json!({"b": {"y": 1, "x": 2}, "a": [1]}), None).expect("id");
        let b = identify(&json!({"a": [1], "b": {"x": 2, "y": 1}}), None).expect("id");
        assert_eq!(a, b);
    }

    #[rstest]
    #[case(json!("Code/Framework"), json!("Code/Tools"))]
    #[case(json!(1), json!("1.0"))]
    #[case(json!({"a": 1}), json!({"a": 2}))]
    fn different_inputs_differ(#[case] left: Value, #[case] right: Value) {
        let a = identify(&left, None).expect("id");
        let b = identify(&right, None).expect("id");
        assert_ne!(a, b);
    }

    #[rstest]
    fn scalars_hash_their_text() {
        let number = identify(&json!(42), None).expect("id");
        let text = identify_str("42").expect("id");
        assert_eq!(number, text);
    }

    #[rstest]
    fn has_uuid_shape() {
        let id = identify_str("anything").expect("id");
        let groups: Vec<usize> = id.as_str().split('-').map(str::len).collect();
        assert_eq!(groups, vec![8, 4, 4, 4, 12]);
        let digits = id.hex_prefix(32);
        assert_eq!(digits.chars().nth(12), Some('4'));
        assert!(matches!(digits.chars().nth(16), Some('8' | '9' | 'A' | 'B')));
        assert!(digits.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[rstest]
    fn prefix_is_spliced_over_leading_digits() {
        let plain = identify_str("folder").expect("id");
        let prefixed = identify(&json!("folder"), Some("abcdef01")).expect("id");
        assert!(prefixed.as_str().starts_with("ABCDEF01-"));
        assert_eq!(plain.as_str().get(8..), prefixed.as_str().get(8..));
    }

    #[rstest]
    #[case("xyz")]
    #[case("000000000000000000000000000000000")]
    fn rejects_bad_prefixes(#[case] prefix: &str) {
        let err = identify_str("x").and_then(|_| identify(&json!("x"), Some(prefix)));
        assert!(matches!(err, Err(IdentifyError::InvalidPrefix { .. })));
    }
}
