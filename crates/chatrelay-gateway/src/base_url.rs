// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Externally visible base URL used when handing stream URLs to the platform.

use axum::http::HeaderMap;
use axum::http::header::HOST;

/// Resolve the base URL (scheme + authority, no trailing slash).
///
/// A configured value wins. Otherwise it is derived from the proxy headers
/// of the webhook request, then from `Host`.
pub fn external_base_url(configured: Option<&str>, headers: &HeaderMap) -> String {
    if let Some(base) = configured.map(str::trim).filter(|b| !b.is_empty()) {
        return base.trim_end_matches('/').to_string();
    }

    let scheme = header_str(headers, "x-forwarded-proto")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("http");

    let host = header_str(headers, "x-forwarded-host")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| header_str(headers, HOST.as_str()))
        .unwrap_or("localhost");

    format!("{scheme}://{host}")
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Stream URL for a session token.
pub fn stream_url(base: &str, token: &str) -> String {
    format!("{base}/service/stream/{token}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(*k, HeaderValue::from_static(v));
        }
        map
    }

    #[test]
    fn configured_base_wins() {
        let h = headers(&[("host", "internal:8000")]);
        assert_eq!(
            external_base_url(Some("https://relay.example.com/"), &h),
            "https://relay.example.com"
        );
    }

    #[test]
    fn forwarded_headers_are_used() {
        let h = headers(&[
            ("host", "internal:8000"),
            ("x-forwarded-proto", "https, http"),
            ("x-forwarded-host", "chat.example.com"),
        ]);
        assert_eq!(external_base_url(None, &h), "https://chat.example.com");
    }

    #[test]
    fn falls_back_to_host_header() {
        let h = headers(&[("host", "10.0.0.5:8000")]);
        assert_eq!(external_base_url(None, &h), "http://10.0.0.5:8000");
        assert_eq!(external_base_url(Some("  "), &HeaderMap::new()), "http://localhost");
    }

    #[test]
    fn stream_url_embeds_token() {
        assert_eq!(
            stream_url("http://relay", "AbC123"),
            "http://relay/service/stream/AbC123"
        );
    }
}
