//! Header manipulation for forwarded requests.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers
//! - Rewrite Host to the upstream authority
//!
//! # Design Decisions
//! - End-to-end headers are copied verbatim, including duplicates
//! - No X-Forwarded-* headers are added

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Uri};

/// Hop-by-hop headers (RFC 7230 §6.1) plus the common non-standard ones.
static HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-connection"),
    header::PROXY_AUTHENTICATE,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Headers for the outbound request: hop-by-hop removed, Host rewritten.
pub fn upstream_headers(original: &HeaderMap, upstream: &Uri) -> HeaderMap {
    let mut headers = original.clone();

    // Tokens listed in Connection name additional per-hop headers.
    let named: Vec<HeaderName> = original
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|token| HeaderName::from_bytes(token.trim().as_bytes()).ok())
        .collect();

    for name in HOP_BY_HOP.iter().chain(named.iter()) {
        headers.remove(name);
    }

    headers.remove(header::HOST);
    if let Some(value) = upstream
        .authority()
        .and_then(|a| HeaderValue::from_str(a.as_str()).ok())
    {
        headers.insert(header::HOST, value);
    }

    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_rewritten() {
        let mut original = HeaderMap::new();
        original.insert(header::HOST, HeaderValue::from_static("proxy.local:3000"));
        let upstream: Uri = "http://localhost:9999/x".parse().unwrap();

        let headers = upstream_headers(&original, &upstream);
        assert_eq!(headers[header::HOST], "localhost:9999");
    }

    #[test]
    fn test_hop_by_hop_stripped() {
        let mut original = HeaderMap::new();
        original.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, x-trace-hop"));
        original.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        original.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        original.insert("x-trace-hop", HeaderValue::from_static("1"));
        original.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        original.append("x-multi", HeaderValue::from_static("a"));
        original.append("x-multi", HeaderValue::from_static("b"));
        let upstream: Uri = "http://localhost:9999/".parse().unwrap();

        let headers = upstream_headers(&original, &upstream);
        assert!(headers.get(header::CONNECTION).is_none());
        assert!(headers.get("keep-alive").is_none());
        assert!(headers.get(header::TRANSFER_ENCODING).is_none());
        assert!(headers.get("x-trace-hop").is_none());
        assert_eq!(headers[header::AUTHORIZATION], "Bearer abc");
        assert_eq!(headers.get_all("x-multi").iter().count(), 2);
    }
}
