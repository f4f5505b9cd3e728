//! Conditional request support
//!
//! `ETag` generation and `If-None-Match` checks for static assets.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Quoted `ETag` for `content`, e.g. `"9f3a01c2"`
pub fn generate_etag(content: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    format!("\"{:x}\"", hasher.finish())
}

/// Whether an `If-None-Match` value names `etag` (or `*`)
///
/// Comma-separated lists are accepted.
pub fn etag_matches(if_none_match: Option<&str>, etag: &str) -> bool {
    if_none_match.is_some_and(|value| {
        value
            .split(',')
            .map(str::trim)
            .any(|candidate| candidate == etag || candidate == "*")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_etag_stable_and_distinct() {
        let a = generate_etag(b"same content");
        assert_eq!(a, generate_etag(b"same content"));
        assert_ne!(a, generate_etag(b"other content"));
        assert!(a.starts_with('"') && a.ends_with('"'));
    }

    #[test]
    fn test_etag_matches() {
        let etag = "\"abc123\"";
        assert!(etag_matches(Some("\"abc123\""), etag));
        assert!(etag_matches(Some("\"xyz\", \"abc123\""), etag));
        assert!(etag_matches(Some("*"), etag));
        assert!(!etag_matches(Some("\"different\""), etag));
        assert!(!etag_matches(None, etag));
    }
}
