use super::{extract_client_ip, HttpRateLimiter};
use crate::error::ErrorResponse;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use std::sync::Arc;

/// HTTP rate limiting middleware
///
/// Keys requests by client IP. Adds `X-RateLimit-Limit` and
/// `X-RateLimit-Remaining` to every response it lets through; over the limit it
/// answers `429 Too Many Requests` with a numeric `Retry-After` (seconds).
pub async fn rate_limit_middleware(
    State(rate_limiter): State<Arc<HttpRateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let socket_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ip = extract_client_ip(
        request.headers(),
        socket_addr.as_ref(),
        rate_limiter.trusted_proxy_count(),
    );
    let key = format!("ip:{}", ip);
    let limit = rate_limiter.limit();

    match rate_limiter.check(&key).await {
        Ok(remaining) => {
            let mut response = next.run(request).await;
            set_limit_headers(&mut response, limit, remaining);
            response
        }
        Err(reset_in) => {
            let retry_after = reset_in.as_secs().max(1);
            tracing::warn!(
                client = %ip,
                path = %request.uri().path(),
                limit,
                retry_after_secs = retry_after,
                "Rate limit exceeded"
            );

            let body = ErrorResponse::new("Too many requests. Please slow down.")
                .with_code("RATE_LIMITED");
            let mut response = (StatusCode::TOO_MANY_REQUESTS, axum::Json(body)).into_response();

            set_limit_headers(&mut response, limit, 0);
            response
                .headers_mut()
                .insert("Retry-After", HeaderValue::from(retry_after));
            response
        }
    }
}

fn set_limit_headers(response: &mut Response, limit: u32, remaining: u32) {
    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Limit", HeaderValue::from(limit));
    headers.insert("X-RateLimit-Remaining", HeaderValue::from(remaining));
}
