//! Application bootstrap: telemetry, database, storage, services, routes.

pub mod routes;
pub mod server;

use crate::auth::{AuthState, JwtSessionProvider};
use crate::services::LayerService;
use crate::state::AppState;
use anyhow::Context;
use axum::Router;
use jamin_core::Config;
use jamin_db::LayerRepository;
use jamin_infra::{init_telemetry, spawn_cleanup_task, CsrfConfig, HttpRateLimiter, LogFormat};
use jamin_processing::{FfprobeProbe, TempFileStager, UploadValidator};
use jamin_storage::{create_storage, RetryPolicy, UploadTransport};
use std::sync::Arc;
use std::time::Duration;

/// Build everything the server needs from `config`.
pub async fn initialize_app(config: Config) -> anyhow::Result<(Arc<AppState>, Router)> {
    init_telemetry(LogFormat::from_env())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        environment = %config.environment,
        port = config.server_port,
        "Starting Jamin API"
    );

    let pool = jamin_db::connect(&config).await?;
    jamin_db::run_migrations(&pool).await?;

    let storage = create_storage(&config.storage)
        .await
        .context("Failed to initialize storage backend")?;
    tracing::info!(backend = ?storage.backend_type(), "Storage initialized");

    let transport = UploadTransport::new(storage).with_policy(RetryPolicy::new(
        config.upload.max_attempts,
        Duration::from_millis(config.upload.base_delay_ms),
    ));

    let layers = LayerService::new(
        transport,
        Arc::new(LayerRepository::new(pool)),
        Arc::new(TempFileStager::new()),
        Arc::new(FfprobeProbe::new(config.upload.ffprobe_path.clone())),
    );

    let rate_limiter = Arc::new(
        HttpRateLimiter::new(config.http_rate_limit_per_minute)
            .with_trusted_proxy_count(config.trusted_proxy_count),
    );
    spawn_cleanup_task(
        rate_limiter.clone(),
        Duration::from_secs(config.rate_limit_cleanup_interval_secs),
    );
    tracing::info!(
        rate_limit_per_minute = config.http_rate_limit_per_minute,
        trusted_proxy_count = config.trusted_proxy_count,
        "HTTP rate limiting enabled"
    );

    let state = Arc::new(AppState {
        layers,
        upload_validator: UploadValidator::new(
            config.upload.max_upload_size_bytes,
            config.upload.allowed_content_types.clone(),
        ),
        auth: Arc::new(AuthState::new(Arc::new(JwtSessionProvider::new(
            &config.session_secret,
        )))),
        csrf: Arc::new(CsrfConfig::new(config.app_origins.clone())),
        rate_limiter,
    });

    let router = routes::build_router(state.clone());
    Ok((state, router))
}
