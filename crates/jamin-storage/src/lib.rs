//! Jamin Storage Library
//!
//! Object storage for layer recordings: the `Storage` trait with S3 and local
//! filesystem backends, upload key generation, byte source adapters, and the
//! retrying `UploadTransport` that the ingestion service calls.
//!
//! # Storage key format
//!
//! `{folder}/{timestamp_ms}-{random}-{file_name}`, e.g.
//! `layers/1717171717171-4821-take1.webm`. Keys never contain `..` or a
//! leading `/`. All key generation goes through the `keys` module.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod source;
pub mod traits;
pub mod transport;

// Re-export commonly used types
pub use factory::create_storage;
pub use jamin_core::StorageBackend;
pub use keys::{build_key, UploadKey};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use source::{ByteSource, FileSource, MemorySource, ReadError, ReaderSource};
pub use traits::{Storage, StorageError, StorageResult};
pub use transport::{RetryPolicy, Sleeper, TokioSleeper, TransportError, UploadTransport};
