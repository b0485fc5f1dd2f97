use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Original recording that collaborators add layers to.
///
/// Read-only from the ingestion pipeline's point of view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Theme {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub audio_url: String,
    pub created_at: DateTime<Utc>,
}

impl Theme {
    /// Page that lists this theme and its layers.
    pub fn page_path(&self) -> String {
        theme_page_path(self.id)
    }
}

/// Page path for a theme id, used as the redirect target after adding a layer.
pub fn theme_page_path(theme_id: Uuid) -> String {
    format!("/themes/{}", theme_id)
}
