//! Capture checks - duration and playability of a recording
//!
//! A blob is staged somewhere a probe can read it, the probe runs under a
//! deadline, and the staged copy is released no matter how the probe ends.
//! Neither check ever fails: a probe error or a timeout resolves to `0.0`
//! (duration) or `false` (playable).

mod ffprobe;
mod stager;

use async_trait::async_trait;
use jamin_core::models::{MediaBlob, MediaKind};
use std::path::Path;
use std::time::Duration;

pub use ffprobe::FfprobeProbe;
pub use stager::{MediaStager, StagedMedia, TempFileStager};

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Failed to stage media: {0}")]
    Stage(#[from] std::io::Error),

    #[error("Probe failed: {0}")]
    Probe(String),
}

/// Reads media properties from a staged file.
#[async_trait]
pub trait MediaProbe: Send + Sync {
    /// Duration in seconds.
    async fn duration(&self, path: &Path) -> Result<f64, CaptureError>;

    /// Whether the file decodes as audio or video.
    async fn playable(&self, path: &Path) -> Result<bool, CaptureError>;
}

pub fn classify_media(content_type: &str) -> MediaKind {
    MediaKind::from_content_type(content_type)
}

/// Duration of `blob` in seconds, or `0.0` when it cannot be determined in time.
#[tracing::instrument(skip_all, fields(file_name = %blob.name, size = blob.len()))]
pub async fn measure_duration(
    stager: &dyn MediaStager,
    probe: &dyn MediaProbe,
    blob: &MediaBlob,
    timeout: Duration,
) -> f64 {
    let check = async {
        let staged = StagedMedia::stage(stager, blob).await?;
        probe.duration(staged.path()).await
    };

    match tokio::time::timeout(timeout, check).await {
        Ok(Ok(seconds)) if seconds.is_finite() && seconds >= 0.0 => seconds,
        Ok(Ok(seconds)) => {
            tracing::debug!(seconds, "Probe returned a non-finite duration");
            0.0
        }
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Duration probe failed");
            0.0
        }
        Err(_) => {
            tracing::warn!(timeout_ms = timeout.as_millis() as u64, "Duration probe timed out");
            0.0
        }
    }
}

/// `true` only if the probe confirms the blob is playable before the deadline.
#[tracing::instrument(skip_all, fields(file_name = %blob.name, size = blob.len()))]
pub async fn validate_playable(
    stager: &dyn MediaStager,
    probe: &dyn MediaProbe,
    blob: &MediaBlob,
    timeout: Duration,
) -> bool {
    let check = async {
        let staged = StagedMedia::stage(stager, blob).await?;
        probe.playable(staged.path()).await
    };

    match tokio::time::timeout(timeout, check).await {
        Ok(Ok(playable)) => playable,
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Playability probe failed");
            false
        }
        Err(_) => {
            tracing::warn!(timeout_ms = timeout.as_millis() as u64, "Playability probe timed out");
            false
        }
    }
}
