//! Layer creation: store the recording, then persist the layer row.

use jamin_core::constants::{DEFAULT_PROBE_TIMEOUT_MS, LAYER_UPLOAD_FOLDER};
use jamin_core::models::{LayerForm, LayerRecord, NewLayerRecord};
use jamin_core::AppError;
use jamin_db::LayerStore;
use jamin_processing::{
    classify_media, measure_duration, MediaProbe, MediaStager, NormalizedFile,
};
use jamin_storage::UploadTransport;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// A validated add-layer submission.
#[derive(Debug, Clone)]
pub struct NewLayer {
    pub theme_id: Uuid,
    pub user_id: Uuid,
    pub form: LayerForm,
    pub file: NormalizedFile,
}

#[derive(Clone)]
pub struct LayerService {
    transport: UploadTransport,
    layers: Arc<dyn LayerStore>,
    stager: Arc<dyn MediaStager>,
    probe: Arc<dyn MediaProbe>,
    probe_timeout: Duration,
}

impl LayerService {
    pub fn new(
        transport: UploadTransport,
        layers: Arc<dyn LayerStore>,
        stager: Arc<dyn MediaStager>,
        probe: Arc<dyn MediaProbe>,
    ) -> Self {
        Self {
            transport,
            layers,
            stager,
            probe,
            probe_timeout: Duration::from_millis(DEFAULT_PROBE_TIMEOUT_MS),
        }
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Upload the recording and insert the layer.
    ///
    /// A missing theme is `NotFound` and nothing is uploaded. Upload and insert
    /// failures are both reported as `LayerCreation`. The duration is best
    /// effort: an unreadable recording is stored without one.
    #[tracing::instrument(
        skip(self, layer),
        fields(
            theme_id = %layer.theme_id,
            user_id = %layer.user_id,
            size = layer.file.len()
        )
    )]
    pub async fn create_layer(&self, layer: NewLayer) -> Result<LayerRecord, AppError> {
        let NewLayer {
            theme_id,
            user_id,
            form,
            file,
        } = layer;

        if !self.layers.theme_exists(theme_id).await? {
            return Err(AppError::NotFound(format!("Theme {} not found", theme_id)));
        }

        let duration = measure_duration(
            self.stager.as_ref(),
            self.probe.as_ref(),
            &file.to_blob(),
            self.probe_timeout,
        )
        .await;

        let audio_url = self
            .transport
            .upload_with_retry(&file, LAYER_UPLOAD_FOLDER, None)
            .await
            .map_err(|e| AppError::LayerCreation(e.to_string()))?;

        let record = NewLayerRecord {
            theme_id,
            user_id,
            title: form.title,
            instrument: form.instrument,
            tempo: form.tempo,
            description: form.description,
            audio_url,
            content_type: file.essence(),
            file_size: file.len() as i64,
            duration_seconds: (duration > 0.0).then_some(duration),
        };

        let created = self.layers.insert_layer(record).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to save layer after upload");
            AppError::LayerCreation("Failed to save layer".to_string())
        })?;

        tracing::info!(
            layer_id = %created.id,
            audio_url = %created.audio_url,
            media_kind = ?classify_media(&created.content_type),
            duration_seconds = ?created.duration_seconds,
            "Layer created"
        );
        Ok(created)
    }

    pub async fn list_layers(&self, theme_id: Uuid) -> Result<Vec<LayerRecord>, AppError> {
        if !self.layers.theme_exists(theme_id).await? {
            return Err(AppError::NotFound(format!("Theme {} not found", theme_id)));
        }
        self.layers.list_layers(theme_id).await
    }
}
