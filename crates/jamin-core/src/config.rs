//! Configuration module
//!
//! Process configuration is read once at startup from the environment (and an
//! optional `.env` file). Nothing here is hot-reloaded.
//!
//! Storage credentials are provisioned through files that sometimes carry
//! trailing comments (`us-east-1 # primary`), so every storage value goes
//! through [`clean_env_value`] before use.

use std::env;

use crate::constants::{
    ALLOWED_UPLOAD_TYPES, MAX_UPLOAD_SIZE_MB, UPLOAD_BASE_DELAY_MS, UPLOAD_MAX_ATTEMPTS,
};
use crate::storage_types::StorageBackend;

// Common constants
const SERVER_PORT: u16 = 4000;
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const HTTP_RATE_LIMIT_PER_MINUTE: u32 = 60;
const TRUSTED_PROXY_COUNT: usize = 1;
const RATE_LIMIT_CLEANUP_INTERVAL_SECS: u64 = 60;
const MIN_SESSION_SECRET_LEN: usize = 32;

/// Strip an inline `#` comment, whitespace and surrounding quotes from an env value.
///
/// Returns `None` when nothing is left.
pub fn clean_env_value(raw: &str) -> Option<String> {
    let without_comment = match raw.find('#') {
        Some(idx) => &raw[..idx],
        None => raw,
    };
    let cleaned = without_comment
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim();

    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

fn env_clean(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|v| clean_env_value(&v))
}

fn env_list(key: &str) -> Option<Vec<String>> {
    env::var(key).ok().map(|s| {
        s.split(',')
            .map(|item| item.trim().to_lowercase())
            .filter(|item| !item.is_empty())
            .collect()
    })
}

/// Object storage settings
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, etc.)
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
}

/// Upload pipeline settings
#[derive(Clone, Debug)]
pub struct UploadConfig {
    pub max_upload_size_bytes: usize,
    pub allowed_content_types: Vec<String>,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub ffprobe_path: String,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub session_secret: String,
    /// Origins allowed to submit forms. Empty means "same origin as the Host header".
    pub app_origins: Vec<String>,
    pub http_rate_limit_per_minute: u32,
    pub rate_limit_cleanup_interval_secs: u64,
    pub trusted_proxy_count: usize,
    pub storage: StorageConfig,
    pub upload: UploadConfig,
}

impl Config {
    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let backend = match env_clean("STORAGE_BACKEND") {
            Some(value) => value.parse::<StorageBackend>()?,
            None => StorageBackend::S3,
        };

        let storage = StorageConfig {
            backend,
            s3_bucket: env_clean("S3_BUCKET"),
            s3_region: env_clean("S3_REGION").or_else(|| env_clean("AWS_REGION")),
            s3_endpoint: env_clean("S3_ENDPOINT"),
            aws_access_key_id: env_clean("AWS_ACCESS_KEY_ID"),
            aws_secret_access_key: env_clean("AWS_SECRET_ACCESS_KEY"),
            local_storage_path: env_clean("LOCAL_STORAGE_PATH"),
            local_storage_base_url: env_clean("LOCAL_STORAGE_BASE_URL"),
        };

        let max_upload_size_mb = env::var("MAX_UPLOAD_SIZE_MB")
            .unwrap_or_else(|_| MAX_UPLOAD_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_UPLOAD_SIZE_MB);

        let upload = UploadConfig {
            max_upload_size_bytes: max_upload_size_mb * 1024 * 1024,
            allowed_content_types: env_list("ALLOWED_UPLOAD_TYPES")
                .filter(|types| !types.is_empty())
                .unwrap_or_else(|| {
                    ALLOWED_UPLOAD_TYPES
                        .iter()
                        .map(|s| s.to_string())
                        .collect()
                }),
            max_attempts: env::var("UPLOAD_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&n: &u32| n > 0)
                .unwrap_or(UPLOAD_MAX_ATTEMPTS),
            base_delay_ms: env::var("UPLOAD_BASE_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(UPLOAD_BASE_DELAY_MS),
            ffprobe_path: env::var("FFPROBE_PATH").unwrap_or_else(|_| "ffprobe".to_string()),
        };

        let config = Config {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            environment,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            session_secret: env::var("SESSION_SECRET")
                .map_err(|_| anyhow::anyhow!("SESSION_SECRET must be set for authentication"))?,
            app_origins: env::var("APP_ORIGINS")
                .map(|s| {
                    s.split(',')
                        .map(|origin| origin.trim().trim_end_matches('/').to_string())
                        .filter(|origin| !origin.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            http_rate_limit_per_minute: env::var("HTTP_RATE_LIMIT_PER_MINUTE")
                .unwrap_or_else(|_| HTTP_RATE_LIMIT_PER_MINUTE.to_string())
                .parse()
                .unwrap_or(HTTP_RATE_LIMIT_PER_MINUTE),
            rate_limit_cleanup_interval_secs: env::var("RATE_LIMIT_CLEANUP_INTERVAL_SECS")
                .unwrap_or_else(|_| RATE_LIMIT_CLEANUP_INTERVAL_SECS.to_string())
                .parse()
                .unwrap_or(RATE_LIMIT_CLEANUP_INTERVAL_SECS),
            trusted_proxy_count: env::var("TRUSTED_PROXY_COUNT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(TRUSTED_PROXY_COUNT),
            storage,
            upload,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.session_secret.len() < MIN_SESSION_SECRET_LEN {
            return Err(anyhow::anyhow!(
                "SESSION_SECRET must be at least {} characters long",
                MIN_SESSION_SECRET_LEN
            ));
        }

        if !self.database_url.starts_with("postgres://")
            && !self.database_url.starts_with("postgresql://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if self.is_production() && self.app_origins.is_empty() {
            return Err(anyhow::anyhow!(
                "APP_ORIGINS must be set in production so form submissions can be origin-checked"
            ));
        }

        match self.storage.backend {
            StorageBackend::S3 => {
                if self.storage.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.storage.s3_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.storage.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
                if self.storage.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                    ));
                }
            }
        }

        Ok(())
    }
}
