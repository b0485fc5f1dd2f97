use crate::auth::Session;
use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use jamin_core::models::LayerRecord;
use jamin_infra::ErrorResponse;
use std::sync::Arc;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/api/themes/{id}/layers",
    tag = "layers",
    params(
        ("id" = Uuid, Path, description = "Theme id")
    ),
    responses(
        (status = 200, description = "Layers of the theme, oldest first"),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 404, description = "Theme not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip_all, fields(theme_id = %theme_id))]
pub async fn list_layers(
    State(state): State<Arc<AppState>>,
    _session: Session,
    Path(theme_id): Path<Uuid>,
) -> Result<Json<Vec<LayerRecord>>, HttpAppError> {
    let layers = state.layers.list_layers(theme_id).await?;
    Ok(Json(layers))
}
