use super::CaptureError;
use async_trait::async_trait;
use jamin_core::models::MediaBlob;
use std::path::{Path, PathBuf};

/// Makes a blob readable by a probe and frees it afterwards.
#[async_trait]
pub trait MediaStager: Send + Sync {
    async fn stage(&self, blob: &MediaBlob) -> Result<PathBuf, CaptureError>;

    /// Must be safe to call for a path that is already gone.
    fn release(&self, path: &Path);
}

/// A staged blob. Dropping it releases the staged copy, so every exit path
/// (including a cancelled probe) cleans up.
pub struct StagedMedia<'a> {
    stager: &'a dyn MediaStager,
    path: PathBuf,
}

impl<'a> StagedMedia<'a> {
    pub async fn stage(
        stager: &'a dyn MediaStager,
        blob: &MediaBlob,
    ) -> Result<StagedMedia<'a>, CaptureError> {
        let path = stager.stage(blob).await?;
        Ok(Self { stager, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedMedia<'_> {
    fn drop(&mut self) {
        self.stager.release(&self.path);
    }
}

/// Stages blobs as files in the system temp directory.
#[derive(Debug, Clone, Default)]
pub struct TempFileStager;

impl TempFileStager {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MediaStager for TempFileStager {
    async fn stage(&self, blob: &MediaBlob) -> Result<PathBuf, CaptureError> {
        let suffix = Path::new(&blob.name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e))
            .unwrap_or_default();

        let path = tempfile::Builder::new()
            .prefix("jamin-capture-")
            .suffix(&suffix)
            .tempfile()?
            .into_temp_path()
            .keep()
            .map_err(|e| CaptureError::Stage(e.error))?;

        if let Err(e) = tokio::fs::write(&path, &blob.data).await {
            self.release(&path);
            return Err(e.into());
        }

        tracing::debug!(path = %path.display(), size = blob.len(), "Staged media for probing");
        Ok(path)
    }

    fn release(&self, path: &Path) {
        match std::fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove staged media");
            }
        }
    }
}
