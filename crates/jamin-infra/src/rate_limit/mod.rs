//! Per-client HTTP rate limiting
//!
//! Fixed-window counters keyed by client IP, held in process memory. Counters
//! reset on restart and are not shared between processes.

mod ip;
mod limiter;
mod middleware;

pub use ip::extract_client_ip;
pub use limiter::{spawn_cleanup_task, HttpRateLimiter};
pub use middleware::rate_limit_middleware;
