//! Conditional-request helpers for the alert feed.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use axum::http::{header, HeaderMap};

/// Strong, quoted entity tag for a serialized body. Stable for the lifetime
/// of the process.
pub fn compute_etag(body: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("\"{:016x}\"", hasher.finish())
}

/// `true` when any `If-None-Match` header lists `*` or `current_etag`.
///
/// Comparison is weak (RFC 9110 13.1.2): a `W/` prefix on the client's tag
/// is ignored.
pub fn if_none_match_matches(headers: &HeaderMap, current_etag: &str) -> bool {
    headers
        .get_all(header::IF_NONE_MATCH)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(','))
        .map(|tag| tag.trim())
        .map(|tag| tag.strip_prefix("W/").unwrap_or(tag))
        .any(|tag| tag == "*" || tag == current_etag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn etag_is_quoted() {
        let etag = compute_etag(br#"[{"id":-1002}]"#);
        assert!(etag.starts_with('"'));
        assert!(etag.ends_with('"'));
    }

    #[test]
    fn etag_differs_for_different_feeds() {
        assert_ne!(compute_etag(b"[]"), compute_etag(br#"[{"id":1}]"#));
        assert_eq!(compute_etag(b"[]"), compute_etag(b"[]"));
    }

    #[test]
    fn if_none_match_matches_exact_tag() {
        let mut headers = HeaderMap::new();
        headers.insert(header::IF_NONE_MATCH, HeaderValue::from_static("\"abc\""));

        assert!(if_none_match_matches(&headers, "\"abc\""));
        assert!(!if_none_match_matches(&headers, "\"def\""));
    }

    #[test]
    fn if_none_match_accepts_lists_and_wildcard() {
        let mut headers = HeaderMap::new();
        headers.insert(header::IF_NONE_MATCH, HeaderValue::from_static("\"x\", \"abc\""));
        assert!(if_none_match_matches(&headers, "\"abc\""));

        headers.insert(header::IF_NONE_MATCH, HeaderValue::from_static("*"));
        assert!(if_none_match_matches(&headers, "\"anything\""));
    }

    #[test]
    fn weak_validator_matches_strong_tag() {
        let etag = compute_etag(b"[]");
        let mut headers = HeaderMap::new();
        headers.insert(
            header::IF_NONE_MATCH,
            HeaderValue::from_str(&format!("W/{}", etag)).unwrap(),
        );
        assert!(if_none_match_matches(&headers, &etag));
    }

    #[test]
    fn missing_header_never_matches() {
        assert!(!if_none_match_matches(&HeaderMap::new(), "\"abc\""));
    }
}
