//! OpenAPI documentation, served at `/api/openapi.json`.

use crate::handlers;
use jamin_core::models::{AddLayerResponse, LayerForm};
use jamin_infra::ErrorResponse;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Jamin API",
        version = "0.1.0",
        description = "Layer ingestion for collaborative music themes. Collaborators upload a recording plus descriptive fields; the recording is stored in object storage and the layer is attached to the theme."
    ),
    paths(
        handlers::add_layer::add_layer,
        handlers::layers::list_layers,
        handlers::health::health_check,
    ),
    components(schemas(
        AddLayerResponse,
        LayerForm,
        ErrorResponse,
        handlers::health::HealthResponse,
    )),
    tags(
        (name = "layers", description = "Theme layers"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;
