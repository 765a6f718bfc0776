//! Strong validators for static responses.
//!
//! Provides `ETag` generation and conditional request handling.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Generate a quoted `ETag` for a body, e.g. `"abc123def"`.
pub fn generate_etag(content: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    let v = hasher.finish();
    format!("\"{v:x}\"")
}

/// Derive the validator for an encoded representation of the same body,
/// e.g. `"abc123"` + `gzip` becomes `"abc123-gzip"`. Each representation
/// carries a distinct strong validator.
pub fn encoded_etag(etag: &str, encoding: &str) -> String {
    format!("\"{}-{}\"", etag.trim_matches('"'), encoding)
}

/// Check whether a client `If-None-Match` header matches the server `ETag`.
///
/// Supports single values, comma-separated lists, and the `*` wildcard.
/// Returns true when the client's copy is current (respond 304).
pub fn etag_matches(if_none_match: Option<&str>, etag: &str) -> bool {
    if_none_match.is_some_and(|client_etag| {
        client_etag
            .split(',')
            .any(|candidate| candidate.trim() == etag || candidate.trim() == "*")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn etag_is_quoted_and_stable() {
        let first = generate_etag(b"same content");
        let second = generate_etag(b"same content");
        assert_eq!(first, second);
        assert!(first.starts_with('"') && first.ends_with('"'));
    }

    #[test]
    fn etag_differs_per_content() {
        assert_ne!(generate_etag(b"content a"), generate_etag(b"content b"));
    }

    #[test]
    fn encoded_representation_gets_a_derived_tag() {
        assert_eq!(encoded_etag("\"abc123\"", "gzip"), "\"abc123-gzip\"");
        assert_ne!(encoded_etag("\"abc123\"", "gzip"), "\"abc123\"");
    }

    #[test]
    fn if_none_match_variants() {
        let etag = "\"abc123\"";
        assert!(etag_matches(Some("\"abc123\""), etag));
        assert!(etag_matches(Some("\"xyz\", \"abc123\""), etag));
        assert!(etag_matches(Some("*"), etag));
        assert!(!etag_matches(Some("\"different\""), etag));
        assert!(!etag_matches(None, etag));
    }
}
