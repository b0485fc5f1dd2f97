use super::{CaptureError, MediaProbe};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use tokio::process::Command;

#[derive(Debug, Deserialize)]
struct FFprobeOutput {
    format: Option<FFprobeFormat>,
    streams: Option<Vec<FFprobeStream>>,
}

#[derive(Debug, Deserialize)]
struct FFprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FFprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
}

impl FFprobeOutput {
    fn duration(&self) -> Option<f64> {
        self.format
            .as_ref()
            .and_then(|f| f.duration.as_ref())
            .and_then(|d| d.parse::<f64>().ok())
    }

    fn has_media_stream(&self) -> bool {
        self.streams.iter().flatten().any(|s| {
            matches!(s.codec_type.as_deref(), Some("audio") | Some("video"))
                && s.codec_name.is_some()
        })
    }
}

/// Probe backed by the `ffprobe` binary.
///
/// The child process is killed if the probe future is dropped, so a timed-out
/// probe does not leave ffprobe running.
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    ffprobe_path: String,
}

impl FfprobeProbe {
    pub fn new(ffprobe_path: impl Into<String>) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
        }
    }

    #[tracing::instrument(skip(self), fields(service = "ffprobe"))]
    async fn probe(&self, path: &Path) -> Result<FFprobeOutput, CaptureError> {
        let output = Command::new(&self.ffprobe_path)
            .args(["-v", "error", "-show_format", "-show_streams", "-of", "json"])
            .arg(path)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| CaptureError::Probe(format!("Failed to run ffprobe: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::debug!(stderr = %stderr, "ffprobe rejected input");
            return Err(CaptureError::Probe(format!("ffprobe failed: {}", stderr.trim())));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| CaptureError::Probe(format!("Failed to parse ffprobe output: {}", e)))
    }
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

#[async_trait]
impl MediaProbe for FfprobeProbe {
    async fn duration(&self, path: &Path) -> Result<f64, CaptureError> {
        self.probe(path)
            .await?
            .duration()
            .ok_or_else(|| CaptureError::Probe("No duration reported".to_string()))
    }

    async fn playable(&self, path: &Path) -> Result<bool, CaptureError> {
        Ok(self.probe(path).await?.has_media_stream())
    }
}
