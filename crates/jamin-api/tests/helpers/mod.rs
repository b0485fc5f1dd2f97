//! Test helpers: build AppState and router for integration tests.
//!
//! Storage is a `LocalStorage` in a temp directory and layers live in memory,
//! so no external services are needed. Run with `cargo test -p jamin-api`.

#![allow(dead_code)]

pub mod store;

use async_trait::async_trait;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::{TestRequest, TestServer};
use jamin_api::auth::{AuthState, JwtSessionProvider};
use jamin_api::services::LayerService;
use jamin_api::setup::routes::build_router;
use jamin_api::state::AppState;
use jamin_core::constants::{ALLOWED_UPLOAD_TYPES, UPLOAD_MAX_ATTEMPTS};
use jamin_infra::{CsrfConfig, HttpRateLimiter};
use jamin_processing::{CaptureError, MediaProbe, TempFileStager, UploadValidator};
use jamin_storage::{LocalStorage, RetryPolicy, Storage, UploadTransport};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use store::MemoryLayerStore;
use tempfile::TempDir;
use uuid::Uuid;

pub const TEST_SESSION_SECRET: &str = "integration-test-session-secret-0123456789";
pub const TEST_ORIGIN: &str = "http://localhost:4000";
pub const TEST_MEDIA_BASE_URL: &str = "http://localhost:4000/media";
pub const TEST_MAX_UPLOAD_BYTES: usize = 1024 * 1024;
pub const TEST_DURATION_SECONDS: f64 = 42.0;

/// Probe that reports a fixed duration without running ffprobe.
struct FixedProbe;

#[async_trait]
impl MediaProbe for FixedProbe {
    async fn duration(&self, _path: &Path) -> Result<f64, CaptureError> {
        Ok(TEST_DURATION_SECONDS)
    }

    async fn playable(&self, _path: &Path) -> Result<bool, CaptureError> {
        Ok(true)
    }
}

/// Test application: server plus the resources it owns.
pub struct TestApp {
    pub server: TestServer,
    pub layers: Arc<MemoryLayerStore>,
    pub theme_id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    sessions: JwtSessionProvider,
    pub temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    pub fn add_layer_path(&self, theme_id: Uuid) -> String {
        format!("/api/themes/{}/add-layer", theme_id)
    }

    /// Signed-in, same-origin add-layer request from `client_ip`.
    pub fn add_layer_request(&self, theme_id: Uuid, client_ip: &str) -> TestRequest {
        self.server
            .post(&self.add_layer_path(theme_id))
            .add_header("Authorization", format!("Bearer {}", self.token))
            .add_header("Origin", TEST_ORIGIN)
            .add_header("X-Forwarded-For", client_ip.to_string())
    }

    pub fn token_for(&self, user_id: Uuid) -> String {
        self.sessions
            .issue(user_id, chrono::Duration::hours(1))
            .expect("Failed to sign test token")
    }
}

/// Setup test app with one existing theme and a signed-in user.
pub async fn setup_test_app() -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let storage: Arc<dyn Storage> = Arc::new(
        LocalStorage::new(temp_dir.path().to_path_buf(), TEST_MEDIA_BASE_URL.to_string())
            .await
            .expect("Failed to create local storage"),
    );

    let layers = Arc::new(MemoryLayerStore::default());
    let theme_id = layers.add_theme();

    let transport = UploadTransport::new(storage).with_policy(RetryPolicy::new(
        UPLOAD_MAX_ATTEMPTS,
        Duration::from_millis(10),
    ));
    let service = LayerService::new(
        transport,
        layers.clone(),
        Arc::new(TempFileStager::new()),
        Arc::new(FixedProbe),
    )
    .with_probe_timeout(Duration::from_secs(2));

    let sessions = JwtSessionProvider::new(TEST_SESSION_SECRET);
    let user_id = Uuid::new_v4();
    let token = sessions
        .issue(user_id, chrono::Duration::hours(1))
        .expect("Failed to sign test token");

    let state = Arc::new(AppState {
        layers: service,
        upload_validator: UploadValidator::new(
            TEST_MAX_UPLOAD_BYTES,
            ALLOWED_UPLOAD_TYPES.iter().map(|s| s.to_string()).collect(),
        ),
        auth: Arc::new(AuthState::new(Arc::new(sessions.clone()))),
        csrf: Arc::new(CsrfConfig::new(vec![TEST_ORIGIN.to_string()])),
        rate_limiter: Arc::new(HttpRateLimiter::new(60)),
    });

    let app = build_router(state);
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        layers,
        theme_id,
        user_id,
        token,
        sessions,
        temp_dir,
    }
}

/// Multipart body with a recording and the descriptive fields.
pub fn layer_form(file_name: &str, mime_type: &str, data: Vec<u8>) -> MultipartForm {
    let part = Part::bytes(data)
        .file_name(file_name.to_string())
        .mime_type(mime_type.to_string());
    text_fields().add_part("file", part)
}

/// Descriptive fields only, no file part.
pub fn text_fields() -> MultipartForm {
    MultipartForm::new()
        .add_text("title", "Bass line")
        .add_text("instrument", "Bass")
        .add_text("tempo", "120")
        .add_text("description", "Walking bass over the chorus")
}
