//! Client IP extraction for rate-limit keys
//!
//! `X-Forwarded-For` is only trusted as far as the configured number of proxies
//! in front of the service. With no trusted proxies the forwarding headers are
//! ignored and the socket address is the key.

use axum::http::HeaderMap;
use std::net::{IpAddr, SocketAddr};

const UNKNOWN: &str = "unknown";

/// Client IP from `X-Forwarded-For`, then `X-Real-IP`, then the socket address.
///
/// The headers are only consulted when `trusted_proxy_count > 0`. Returns
/// `"unknown"` when nothing yields a valid address.
pub fn extract_client_ip(
    headers: &HeaderMap,
    socket_addr: Option<&SocketAddr>,
    trusted_proxy_count: usize,
) -> String {
    let socket_ip = || {
        socket_addr
            .map(|addr| addr.ip().to_string())
            .unwrap_or_else(|| UNKNOWN.to_string())
    };

    if trusted_proxy_count == 0 {
        return socket_ip();
    }

    if let Some(ip) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| from_forwarded_for(v, trusted_proxy_count))
    {
        return ip;
    }

    if let Some(ip) = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| is_valid_ip(v))
    {
        return ip.to_string();
    }

    socket_ip()
}

/// With N trusted proxies the client is the entry just before the last N.
/// A chain shorter than that falls back to the entry nearest to us.
fn from_forwarded_for(header_value: &str, trusted_proxy_count: usize) -> Option<String> {
    let ips: Vec<&str> = header_value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    let candidate = if ips.len() <= trusted_proxy_count {
        ips.last()?
    } else {
        ips.get(ips.len() - trusted_proxy_count - 1)?
    };

    is_valid_ip(candidate).then(|| candidate.to_string())
}

fn is_valid_ip(ip_str: &str) -> bool {
    ip_str.parse::<IpAddr>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn xff(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_single_forwarded_ip() {
        assert_eq!(extract_client_ip(&xff("192.168.1.1"), None, 1), "192.168.1.1");
    }

    #[test]
    fn test_forwarded_chain_respects_trusted_proxies() {
        assert_eq!(
            extract_client_ip(&xff("203.0.113.7, 10.0.0.1"), None, 1),
            "203.0.113.7"
        );
        assert_eq!(
            extract_client_ip(&xff("198.51.100.2, 203.0.113.7, 10.0.0.1, 10.0.0.2"), None, 2),
            "203.0.113.7"
        );
        // Chain shorter than the proxy count: nearest hop
        assert_eq!(extract_client_ip(&xff("203.0.113.7"), None, 2), "203.0.113.7");
    }

    #[test]
    fn test_no_trusted_proxies_ignores_forwarding_headers() {
        let socket = SocketAddr::from(([198, 51, 100, 9], 40000));
        let mut headers = xff("203.0.113.7, 10.0.0.1");
        headers.insert("x-real-ip", HeaderValue::from_static("203.0.113.8"));

        assert_eq!(extract_client_ip(&headers, Some(&socket), 0), "198.51.100.9");
        assert_eq!(extract_client_ip(&headers, None, 0), "unknown");
    }

    #[test]
    fn test_invalid_forwarded_falls_back() {
        let mut headers = xff("not.an.ip.address");
        assert_eq!(extract_client_ip(&headers, None, 1), "unknown");

        headers.insert("x-real-ip", HeaderValue::from_static("2001:db8::1"));
        assert_eq!(extract_client_ip(&headers, None, 1), "2001:db8::1");
    }

    #[test]
    fn test_socket_fallback() {
        let socket = SocketAddr::from(([127, 0, 0, 1], 8080));
        assert_eq!(
            extract_client_ip(&HeaderMap::new(), Some(&socket), 1),
            "127.0.0.1"
        );
    }
}
