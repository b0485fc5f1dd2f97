//! CSRF protection middleware
//!
//! Form submissions (the content types a browser can send cross-site without a
//! preflight) must carry an `Origin` header naming this application. The origin
//! is accepted when it is one of the configured origins, or, when none are
//! configured, when its authority equals the request's `Host`.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use crate::error::ErrorResponse;
use std::sync::Arc;

const FORM_CONTENT_TYPES: &[&str] = &[
    "multipart/form-data",
    "application/x-www-form-urlencoded",
    "text/plain",
];

#[derive(Debug, Clone, Default)]
pub struct CsrfConfig {
    /// Normalized `scheme://host[:port]` values, without trailing slash.
    pub allowed_origins: Vec<String>,
}

impl CsrfConfig {
    pub fn new(allowed_origins: Vec<String>) -> Self {
        Self {
            allowed_origins: allowed_origins
                .into_iter()
                .map(|o| o.trim().trim_end_matches('/').to_lowercase())
                .filter(|o| !o.is_empty())
                .collect(),
        }
    }

    fn origin_allowed(&self, origin: &str, host: Option<&str>) -> bool {
        let origin = origin.trim().trim_end_matches('/').to_lowercase();

        if !self.allowed_origins.is_empty() {
            return self.allowed_origins.iter().any(|o| *o == origin);
        }

        let Ok(uri) = origin.parse::<Uri>() else {
            return false;
        };
        let scheme_ok = matches!(uri.scheme_str(), Some("http") | Some("https"));
        match (uri.authority(), host) {
            (Some(authority), Some(host)) => {
                scheme_ok && authority.as_str().eq_ignore_ascii_case(host.trim())
            }
            _ => false,
        }
    }
}

fn is_form_submission(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase();
    FORM_CONTENT_TYPES.contains(&essence.as_str())
}

/// CSRF protection middleware
///
/// Safe methods and non-form bodies pass through untouched.
pub async fn csrf_middleware(
    State(config): State<Arc<CsrfConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method();
    let mutating = matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    );

    if !mutating || !is_form_submission(request.headers()) {
        return next.run(request).await;
    }

    let headers = request.headers();
    let origin = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok());
    let host = headers.get(header::HOST).and_then(|v| v.to_str().ok());

    let allowed = origin.is_some_and(|o| config.origin_allowed(o, host));
    if !allowed {
        tracing::warn!(
            origin = origin.unwrap_or("<none>"),
            host = host.unwrap_or("<none>"),
            path = %request.uri().path(),
            "Cross-site form submission rejected"
        );
        let body = ErrorResponse::new("Cross-site form submissions are forbidden")
            .with_code("FORBIDDEN");
        return (StatusCode::FORBIDDEN, axum::Json(body)).into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, middleware, routing::post, Router};
    use tower::ServiceExt;

    fn app(config: CsrfConfig) -> Router {
        Router::new()
            .route("/submit", post(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(
                Arc::new(config),
                csrf_middleware,
            ))
    }

    fn form_post(origin: Option<&str>) -> Request {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/submit")
            .header(header::HOST, "jamin.example")
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=x");
        if let Some(origin) = origin {
            builder = builder.header(header::ORIGIN, origin);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_same_host_origin_allowed_without_config() {
        let response = app(CsrfConfig::default())
            .oneshot(form_post(Some("https://jamin.example")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_foreign_or_missing_origin_forbidden() {
        for origin in [Some("https://evil.example"), None] {
            let response = app(CsrfConfig::default())
                .oneshot(form_post(origin))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::FORBIDDEN);

            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let body: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(body.code.as_deref(), Some("FORBIDDEN"));
            assert!(!body.error.is_empty());
        }
    }

    #[tokio::test]
    async fn test_configured_origins_take_precedence() {
        let config = CsrfConfig::new(vec!["https://app.jamin.example/".to_string()]);

        let ok = app(config.clone())
            .oneshot(form_post(Some("https://app.jamin.example")))
            .await
            .unwrap();
        assert_eq!(ok.status(), StatusCode::OK);

        let same_host = app(config)
            .oneshot(form_post(Some("https://jamin.example")))
            .await
            .unwrap();
        assert_eq!(same_host.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_json_body_passes_through() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/submit")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::empty())
            .unwrap();
        let response = app(CsrfConfig::default()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
