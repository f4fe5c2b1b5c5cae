//! Credential and client identifier extraction.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use std::net::SocketAddr;

pub(crate) const UNKNOWN_CLIENT: &str = "unknown";

/// Bearer token from the `Authorization` header, if present and non-empty.
pub(crate) fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// `token` query parameter, if present and non-empty.
pub(crate) fn extract_query_token(query: Option<&str>) -> Option<String> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == "token")
        .map(|(_, value)| value.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Header credential first, query parameter as fallback.
pub(crate) fn extract_token(headers: &HeaderMap, query: Option<&str>) -> Option<String> {
    extract_bearer_token(headers).or_else(|| extract_query_token(query))
}

/// Identify the client for rate limiting.
///
/// The socket peer is the key unless `trust_proxy_headers` is set; clients
/// write `x-forwarded-for` themselves, so it is only honoured behind a proxy
/// that overwrites it.
pub(crate) fn client_id(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_proxy_headers: bool,
) -> String {
    let forwarded = if trust_proxy_headers {
        extract_client_ip(headers)
    } else {
        None
    };
    forwarded
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

fn extract_client_ip(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if forwarded.is_some() {
        return forwarded.map(str::to_string);
    }
    headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_is_trimmed() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer  abc123 "));
        assert_eq!(extract_bearer_token(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn bearer_token_rejects_other_schemes_and_blank() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_bearer_token(&headers), None);
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_bearer_token(&headers), None);
    }

    #[test]
    fn query_token_is_decoded() {
        assert_eq!(
            extract_query_token(Some("a=1&token=ab%20cd")),
            Some("ab cd".to_string())
        );
        assert_eq!(extract_query_token(Some("token=")), None);
        assert_eq!(extract_query_token(None), None);
    }

    #[test]
    fn header_wins_over_query() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer header"));
        assert_eq!(
            extract_token(&headers, Some("token=query")),
            Some("header".to_string())
        );
        assert_eq!(
            extract_token(&HeaderMap::new(), Some("token=query")),
            Some("query".to_string())
        );
    }

    #[test]
    fn client_id_ignores_proxy_headers_by_default() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("1.2.3.4"));
        headers.insert("x-real-ip", HeaderValue::from_static("9.9.9.9"));
        let peer: SocketAddr = ([203, 0, 113, 9], 5555).into();
        assert_eq!(client_id(&headers, Some(peer), false), "203.0.113.9");
        assert_eq!(client_id(&headers, None, false), UNKNOWN_CLIENT);
    }

    #[test]
    fn client_id_prefers_forwarded_when_trusted() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("1.2.3.4, 5.6.7.8"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("9.9.9.9"));
        let peer: SocketAddr = ([10, 0, 0, 1], 80).into();
        assert_eq!(client_id(&headers, Some(peer), true), "1.2.3.4");
    }

    #[test]
    fn client_id_falls_back_to_real_ip_then_peer_when_trusted() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("9.9.9.9"));
        assert_eq!(client_id(&headers, None, true), "9.9.9.9");

        let peer: SocketAddr = ([127, 0, 0, 1], 4000).into();
        assert_eq!(client_id(&HeaderMap::new(), Some(peer), true), "127.0.0.1");
        assert_eq!(client_id(&HeaderMap::new(), None, true), UNKNOWN_CLIENT);
    }
}
