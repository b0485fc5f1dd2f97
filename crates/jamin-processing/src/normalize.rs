//! MIME normalization for captured media
//!
//! Some recorders hand over files with an empty `content_type`. Before upload the
//! type is repaired from the file extension; since a blob's declared type is
//! treated as immutable, repair produces a new [`NormalizedFile`] that shares
//! the original bytes.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use jamin_core::constants::DEFAULT_MEDIA_TYPE;
use jamin_core::models::MediaBlob;
use std::path::Path;

/// A media file whose content type is guaranteed non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedFile {
    name: String,
    content_type: String,
    data: Bytes,
    last_modified: DateTime<Utc>,
}

impl NormalizedFile {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// MIME type without parameters, lowercased (`audio/webm;codecs=opus` -> `audio/webm`).
    pub fn essence(&self) -> String {
        self.content_type
            .split(';')
            .next()
            .unwrap_or(&self.content_type)
            .trim()
            .to_lowercase()
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Turn back into a plain blob, e.g. to hand to the capture probes.
    pub fn into_blob(self) -> MediaBlob {
        MediaBlob {
            name: self.name,
            content_type: self.content_type,
            data: self.data,
            last_modified: self.last_modified,
        }
    }

    pub fn to_blob(&self) -> MediaBlob {
        self.clone().into_blob()
    }
}

/// Content type for a file name, from a fixed extension table.
///
/// `.webm` and `.mp4` resolve to their video variant when the name mentions "video".
/// Unknown extensions fall back to `audio/webm`.
pub fn infer_content_type(file_name: &str) -> &'static str {
    let lower = file_name.to_lowercase();
    let video_context = lower.contains("video");
    let extension = Path::new(&lower)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");

    match extension {
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "webm" if video_context => "video/webm",
        "webm" => "audio/webm",
        "mp4" if video_context => "video/mp4",
        "mp4" => "audio/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        _ => DEFAULT_MEDIA_TYPE,
    }
}

/// Guarantee a non-empty content type.
///
/// A declared type is kept verbatim; only an empty (or blank) one is inferred.
pub fn normalize_type(blob: MediaBlob) -> NormalizedFile {
    if !blob.content_type.trim().is_empty() {
        let content_type = blob.content_type.clone();
        return rehydrate(blob, &content_type);
    }

    let inferred = infer_content_type(&blob.name);
    tracing::debug!(
        file_name = %blob.name,
        inferred_type = inferred,
        "Recovered missing content type from file extension"
    );
    rehydrate(blob, inferred)
}

/// Rebuild a file with a corrected type, keeping bytes and modification time.
pub fn rehydrate(blob: MediaBlob, content_type: &str) -> NormalizedFile {
    let content_type = match content_type.trim() {
        "" => DEFAULT_MEDIA_TYPE.to_string(),
        _ => content_type.to_string(),
    };

    NormalizedFile {
        name: blob.name,
        content_type,
        data: blob.data,
        last_modified: blob.last_modified,
    }
}
