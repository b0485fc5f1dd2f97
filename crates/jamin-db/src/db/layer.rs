use super::ThemeRepository;
use async_trait::async_trait;
use jamin_core::{
    models::{LayerRecord, NewLayerRecord},
    AppError,
};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

const LAYER_COLUMNS: &str = "id, theme_id, user_id, title, instrument, tempo, description, \
     audio_url, content_type, file_size, duration_seconds, created_at";

/// Persistence seam for the ingestion service.
#[async_trait]
pub trait LayerStore: Send + Sync {
    async fn theme_exists(&self, theme_id: Uuid) -> Result<bool, AppError>;

    async fn insert_layer(&self, layer: NewLayerRecord) -> Result<LayerRecord, AppError>;

    async fn list_layers(&self, theme_id: Uuid) -> Result<Vec<LayerRecord>, AppError>;
}

/// Repository for theme layers
#[derive(Clone)]
pub struct LayerRepository {
    pool: PgPool,
    themes: ThemeRepository,
}

impl LayerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            themes: ThemeRepository::new(pool.clone()),
            pool,
        }
    }

    #[tracing::instrument(
        skip(self, layer),
        fields(db.table = "layers", db.operation = "insert", theme_id = %layer.theme_id)
    )]
    pub async fn create_layer(&self, layer: NewLayerRecord) -> Result<LayerRecord, AppError> {
        let query = format!(
            r#"
            INSERT INTO layers (theme_id, user_id, title, instrument, tempo, description,
                                audio_url, content_type, file_size, duration_seconds)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            LAYER_COLUMNS
        );

        let record = sqlx::query_as::<Postgres, LayerRecord>(&query)
            .bind(layer.theme_id)
            .bind(layer.user_id)
            .bind(&layer.title)
            .bind(&layer.instrument)
            .bind(layer.tempo)
            .bind(&layer.description)
            .bind(&layer.audio_url)
            .bind(&layer.content_type)
            .bind(layer.file_size)
            .bind(layer.duration_seconds)
            .fetch_one(&self.pool)
            .await?;

        tracing::info!(layer_id = %record.id, "Layer created");
        Ok(record)
    }

    /// Layers of a theme, oldest first.
    #[tracing::instrument(skip(self), fields(db.table = "layers", db.operation = "select"))]
    pub async fn list_for_theme(&self, theme_id: Uuid) -> Result<Vec<LayerRecord>, AppError> {
        let query = format!(
            "SELECT {} FROM layers WHERE theme_id = $1 ORDER BY created_at ASC",
            LAYER_COLUMNS
        );

        let layers = sqlx::query_as::<Postgres, LayerRecord>(&query)
            .bind(theme_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(layers)
    }
}

#[async_trait]
impl LayerStore for LayerRepository {
    async fn theme_exists(&self, theme_id: Uuid) -> Result<bool, AppError> {
        Ok(self.themes.get_theme(theme_id).await?.is_some())
    }

    async fn insert_layer(&self, layer: NewLayerRecord) -> Result<LayerRecord, AppError> {
        self.create_layer(layer).await
    }

    async fn list_layers(&self, theme_id: Uuid) -> Result<Vec<LayerRecord>, AppError> {
        self.list_for_theme(theme_id).await
    }
}
