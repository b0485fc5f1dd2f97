//! Data models for the ingestion pipeline
//!
//! Each sub-module represents one feature area.

mod layer;
mod media;
mod theme;

pub use layer::*;
pub use media::*;
pub use theme::*;
