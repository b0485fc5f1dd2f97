//! Jamin Core Library
//!
//! This crate provides the domain models, error types, configuration and constants
//! shared by every Jamin component.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{clean_env_value, Config};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use storage_types::StorageBackend;
