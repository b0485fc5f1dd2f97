//! Upload policy constants shared by the processing, storage and API crates.

/// Fallback MIME type for recorded media that arrives without one.
pub const DEFAULT_MEDIA_TYPE: &str = "audio/webm";

/// Maximum accepted upload size in megabytes (MiB).
pub const MAX_UPLOAD_SIZE_MB: usize = 50;

/// MIME types the layer ingestion endpoint accepts.
pub const ALLOWED_UPLOAD_TYPES: &[&str] = &[
    "audio/webm",
    "audio/mp3",
    "audio/wav",
    "audio/mpeg",
    "video/webm",
];

/// Storage folder for layer recordings.
pub const LAYER_UPLOAD_FOLDER: &str = "layers";

/// Probe timeout for duration/playability checks, in milliseconds.
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 5000;

/// Total upload attempts, including the first one.
pub const UPLOAD_MAX_ATTEMPTS: u32 = 3;

/// Base of the exponential backoff between upload attempts.
pub const UPLOAD_BASE_DELAY_MS: u64 = 1000;
