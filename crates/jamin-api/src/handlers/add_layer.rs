use crate::auth::Session;
use crate::error::HttpAppError;
use crate::services::NewLayer;
use crate::state::AppState;
use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use bytes::BytesMut;
use jamin_core::models::{theme_page_path, AddLayerResponse, LayerForm, MediaBlob};
use jamin_core::AppError;
use jamin_infra::ErrorResponse;
use jamin_processing::{normalize_type, UploadValidator};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Multipart fields of an add-layer submission, before validation.
#[derive(Debug, Default)]
struct LayerUpload {
    file: Option<MediaBlob>,
    title: Option<String>,
    instrument: Option<String>,
    tempo: Option<String>,
    description: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/themes/{id}/add-layer",
    tag = "layers",
    params(
        ("id" = Uuid, Path, description = "Theme the layer belongs to")
    ),
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Layer added", body = AddLayerResponse),
        (status = 400, description = "Missing file, file too large, disallowed type, invalid fields or failed upload", body = ErrorResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 403, description = "Cross-site form submission", body = ErrorResponse),
        (status = 404, description = "Theme not found", body = ErrorResponse),
        (status = 429, description = "Rate limit exceeded", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip_all,
    fields(
        theme_id = %theme_id,
        user_id = %session.user_id,
        operation = "add_layer"
    )
)]
pub async fn add_layer(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(theme_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<AddLayerResponse>, HttpAppError> {
    let upload = read_layer_upload(multipart, &state.upload_validator).await?;

    let blob = upload
        .file
        .ok_or_else(|| AppError::BadRequest("No file provided".to_string()))?;

    let file = normalize_type(blob);
    state.upload_validator.validate_content_type(&file)?;

    let form = LayerForm::from_raw(
        upload.title,
        upload.instrument,
        upload.tempo,
        upload.description,
    );
    form.validate()?;

    let layer = state
        .layers
        .create_layer(NewLayer {
            theme_id,
            user_id: session.user_id,
            form,
            file,
        })
        .await?;

    tracing::info!(layer_id = %layer.id, "Layer added to theme");

    Ok(Json(AddLayerResponse {
        success: true,
        message: "Layer added successfully".to_string(),
        redirect_to: theme_page_path(theme_id),
    }))
}

/// Drain the multipart body.
///
/// The file is read chunk by chunk and rejected as soon as it passes the size
/// limit. A `file` part without a file name or without bytes counts as absent.
async fn read_layer_upload(
    mut multipart: Multipart,
    validator: &UploadValidator,
) -> Result<LayerUpload, HttpAppError> {
    let mut upload = LayerUpload::default();

    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field
                    .file_name()
                    .map(|n| n.trim().to_string())
                    .unwrap_or_default();
                let content_type = field.content_type().unwrap_or_default().to_string();

                let mut data = BytesMut::new();
                while let Some(chunk) = field.chunk().await? {
                    validator.validate_size(data.len() + chunk.len())?;
                    data.extend_from_slice(&chunk);
                }

                if file_name.is_empty() || data.is_empty() {
                    tracing::debug!(file_name = %file_name, "Ignoring empty file part");
                    continue;
                }

                tracing::debug!(
                    file_name = %file_name,
                    content_type = %content_type,
                    size = data.len(),
                    "Received layer file"
                );
                upload.file = Some(MediaBlob::new(file_name, content_type, data.freeze()));
            }
            "title" => upload.title = Some(field.text().await?),
            "instrument" => upload.instrument = Some(field.text().await?),
            "tempo" => upload.tempo = Some(field.text().await?),
            "description" => upload.description = Some(field.text().await?),
            other => {
                tracing::debug!(field = %other, "Ignoring unknown multipart field");
            }
        }
    }

    Ok(upload)
}
