//! Jamin API
//!
//! HTTP surface of the layer ingestion pipeline: session authentication, the
//! add-layer endpoint and the wiring that connects it to storage and the
//! database.

pub mod api_doc;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod services;
pub mod setup;
pub mod state;
