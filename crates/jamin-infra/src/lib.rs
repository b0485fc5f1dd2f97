//! Jamin Infrastructure Library
//!
//! Shared HTTP infrastructure for the Jamin API:
//! - Middleware (request ID, CSRF origin check)
//! - Per-client rate limiting
//! - Telemetry initialization
//! - Error response body

#[cfg(feature = "middleware")]
pub mod middleware;

#[cfg(feature = "observability-basic")]
pub mod telemetry;

pub mod error;

#[cfg(feature = "rate-limit")]
pub mod rate_limit;

// Re-export commonly used types
#[cfg(feature = "middleware")]
pub use middleware::{
    csrf_middleware, get_request_id, request_id_middleware, CsrfConfig, RequestId,
};

#[cfg(feature = "observability-basic")]
pub use telemetry::{init_telemetry, LogFormat};

pub use error::ErrorResponse;

#[cfg(feature = "rate-limit")]
pub use rate_limit::{
    extract_client_ip, rate_limit_middleware, spawn_cleanup_task, HttpRateLimiter,
};
