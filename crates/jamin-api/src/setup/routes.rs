//! Route configuration and setup

use crate::api_doc::ApiDoc;
use crate::auth::auth_middleware;
use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::{DefaultBodyLimit, Request},
    http::{HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
    Json, Router,
};
use jamin_infra::{csrf_middleware, get_request_id, rate_limit_middleware, request_id_middleware};
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{AllowHeaders, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

const HTTP_CONCURRENCY_LIMIT: usize = 10_000;

/// Build the application router.
///
/// Layer routes are checked in this order: origin (CSRF), session, rate limit,
/// then the handler's own multipart validation.
pub fn build_router(state: Arc<AppState>) -> Router {
    let body_limit = state.body_limit();

    let layer_routes = Router::new()
        .route(
            "/api/themes/{id}/add-layer",
            post(handlers::add_layer::add_layer),
        )
        .route(
            "/api/themes/{id}/layers",
            get(handlers::layers::list_layers),
        )
        .layer(from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit_middleware,
        ))
        .layer(from_fn_with_state(state.auth.clone(), auth_middleware))
        .layer(from_fn_with_state(state.csrf.clone(), csrf_middleware));

    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(
            "/api/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        );

    let trace_layer = TraceLayer::new_for_http().make_span_with(|request: &Request| {
        tracing::info_span!(
            "http_request",
            method = %request.method(),
            path = %request.uri().path(),
            request_id = %get_request_id(request).unwrap_or_default(),
        )
    });

    public_routes
        .merge(layer_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(ConcurrencyLimitLayer::new(HTTP_CONCURRENCY_LIMIT))
        .layer(setup_cors(&state.csrf.allowed_origins))
        .layer(trace_layer)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .with_state(state)
}

/// Cross-origin reads are allowed for the same origins the CSRF check accepts.
fn setup_cors(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}
