use jamin_core::{models::Theme, AppError};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Read access to themes. Themes are created elsewhere.
#[derive(Clone)]
pub struct ThemeRepository {
    pool: PgPool,
}

impl ThemeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(
        skip(self),
        fields(db.table = "themes", db.operation = "select", db.record_id = %id)
    )]
    pub async fn get_theme(&self, id: Uuid) -> Result<Option<Theme>, AppError> {
        let theme = sqlx::query_as::<Postgres, Theme>(
            "SELECT id, user_id, title, audio_url, created_at FROM themes WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(theme)
    }
}
