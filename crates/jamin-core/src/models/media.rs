use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Raw media as captured or selected, before normalization.
///
/// `content_type` is whatever the client declared and may be empty.
#[derive(Debug, Clone)]
pub struct MediaBlob {
    pub name: String,
    pub content_type: String,
    pub data: Bytes,
    pub last_modified: DateTime<Utc>,
}

impl MediaBlob {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, data: Bytes) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data,
            last_modified: Utc::now(),
        }
    }

    pub fn with_last_modified(mut self, last_modified: DateTime<Utc>) -> Self {
        self.last_modified = last_modified;
        self
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Coarse media category derived from the declared MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
    Unknown,
}

impl MediaKind {
    /// Classify purely from the MIME prefix. No content sniffing.
    pub fn from_content_type(content_type: &str) -> Self {
        let normalized = content_type.trim().to_ascii_lowercase();
        if normalized.starts_with("audio/") {
            MediaKind::Audio
        } else if normalized.starts_with("video/") {
            MediaKind::Video
        } else {
            MediaKind::Unknown
        }
    }
}
