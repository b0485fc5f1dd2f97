//! Jamin Processing Library
//!
//! Everything that happens to a recording between capture and upload:
//! - MIME normalization for files whose declared type is missing
//! - duration and playability probing with bounded waits
//! - size and type validation against the upload policy

pub mod capture;
pub mod normalize;
pub mod validator;

pub use capture::{
    classify_media, measure_duration, validate_playable, CaptureError, FfprobeProbe, MediaProbe,
    MediaStager, StagedMedia, TempFileStager,
};
pub use normalize::{infer_content_type, normalize_type, rehydrate, NormalizedFile};
pub use validator::{UploadValidator, ValidationError};
