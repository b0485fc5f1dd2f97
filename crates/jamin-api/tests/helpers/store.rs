//! In-memory layer store so API tests run without Postgres.

use async_trait::async_trait;
use jamin_core::models::{LayerRecord, NewLayerRecord};
use jamin_core::AppError;
use jamin_db::LayerStore;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryLayerStore {
    themes: Mutex<Vec<Uuid>>,
    layers: Mutex<Vec<LayerRecord>>,
}

impl MemoryLayerStore {
    pub fn add_theme(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.themes.lock().unwrap().push(id);
        id
    }

    pub fn layers(&self) -> Vec<LayerRecord> {
        self.layers.lock().unwrap().clone()
    }
}

#[async_trait]
impl LayerStore for MemoryLayerStore {
    async fn theme_exists(&self, theme_id: Uuid) -> Result<bool, AppError> {
        Ok(self.themes.lock().unwrap().contains(&theme_id))
    }

    async fn insert_layer(&self, layer: NewLayerRecord) -> Result<LayerRecord, AppError> {
        let record = LayerRecord {
            id: Uuid::new_v4(),
            theme_id: layer.theme_id,
            user_id: layer.user_id,
            title: layer.title,
            instrument: layer.instrument,
            tempo: layer.tempo,
            description: layer.description,
            audio_url: layer.audio_url,
            content_type: layer.content_type,
            file_size: layer.file_size,
            duration_seconds: layer.duration_seconds,
            created_at: chrono::Utc::now(),
        };
        self.layers.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn list_layers(&self, theme_id: Uuid) -> Result<Vec<LayerRecord>, AppError> {
        Ok(self
            .layers
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.theme_id == theme_id)
            .cloned()
            .collect())
    }
}
