//! Shared HTTP middleware for Jamin services

pub mod csrf;
pub mod request_id;

pub use csrf::{csrf_middleware, CsrfConfig};
pub use request_id::{get_request_id, request_id_middleware, RequestId};
