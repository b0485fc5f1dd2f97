//! Upload transport - single attempts and bounded retry with exponential backoff

use crate::keys::{build_key, UploadKey};
use crate::source::{ByteSource, ReadError};
use crate::traits::{Storage, StorageError};
use async_trait::async_trait;
use bytes::Bytes;
use jamin_core::constants::{DEFAULT_MEDIA_TYPE, UPLOAD_BASE_DELAY_MS, UPLOAD_MAX_ATTEMPTS};
use std::sync::Arc;
use std::time::Duration;

const FALLBACK_FILE_NAME: &str = "recording.webm";

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Invalid storage credentials: {0}")]
    CredentialsInvalid(String),

    #[error("Storage signature mismatch: {0}")]
    SignatureMismatch(String),

    #[error("Could not read upload data: {0}")]
    ReadFailure(#[from] ReadError),

    #[error("Upload failed after {attempts} attempt(s): {message}")]
    TransportFailure { attempts: u32, message: String },
}

impl TransportError {
    /// The transport gave up after spending its attempts.
    pub fn retries_exhausted(&self) -> bool {
        matches!(self, TransportError::TransportFailure { .. })
    }

    /// Credential, signature and read failures fail the same way on every attempt.
    fn is_retryable(&self) -> bool {
        matches!(self, TransportError::TransportFailure { .. })
    }

    fn cause(&self) -> String {
        match self {
            TransportError::TransportFailure { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<StorageError> for TransportError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::CredentialsInvalid(msg) => TransportError::CredentialsInvalid(msg),
            StorageError::SignatureMismatch(msg) => TransportError::SignatureMismatch(msg),
            other => TransportError::TransportFailure {
                attempts: 1,
                message: other.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Wait after failed attempt number `attempt` (1-based): `base * 2^attempt`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay
            .checked_mul(2u32.saturating_pow(attempt))
            .unwrap_or(Duration::MAX)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            UPLOAD_MAX_ATTEMPTS,
            Duration::from_millis(UPLOAD_BASE_DELAY_MS),
        )
    }
}

/// Waits between attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Sends recordings to object storage and returns their public URL.
#[derive(Clone)]
pub struct UploadTransport {
    storage: Arc<dyn Storage>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl UploadTransport {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            policy: RetryPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// One attempt: read the source, store it under `key`, check the returned URL.
    pub async fn upload(
        &self,
        file: &dyn ByteSource,
        key: &UploadKey,
    ) -> Result<String, TransportError> {
        let data = file.read_all().await?;
        self.send(data, content_type_of(file), key).await
    }

    /// Upload with up to `max_attempts` attempts, each under a freshly built key.
    ///
    /// Only transport failures are retried. The final error names the attempt
    /// count and the last cause.
    #[tracing::instrument(skip(self, file), fields(folder = %folder))]
    pub async fn upload_with_retry(
        &self,
        file: &dyn ByteSource,
        folder: &str,
        file_name: Option<&str>,
    ) -> Result<String, TransportError> {
        let data = file.read_all().await?;
        let content_type = content_type_of(file);
        let file_name = file_name
            .or_else(|| file.file_name())
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(FALLBACK_FILE_NAME);

        let max_attempts = self.policy.max_attempts;
        let mut attempt = 1;
        loop {
            let key = build_key(folder, file_name);
            let err = match self.send(data.clone(), content_type, &key).await {
                Ok(url) => {
                    if attempt > 1 {
                        tracing::info!(attempt, key = %key, "Upload succeeded after retry");
                    }
                    return Ok(url);
                }
                Err(err) => err,
            };

            if !err.is_retryable() {
                tracing::error!(attempt, key = %key, error = %err, "Upload failed, not retrying");
                return Err(err);
            }

            if attempt >= max_attempts {
                tracing::error!(
                    attempts = attempt,
                    key = %key,
                    error = %err,
                    "Upload failed, retries exhausted"
                );
                return Err(TransportError::TransportFailure {
                    attempts: attempt,
                    message: err.cause(),
                });
            }

            let delay = self.policy.delay_after(attempt);
            tracing::warn!(
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Upload attempt failed, retrying"
            );
            self.sleeper.sleep(delay).await;
            attempt += 1;
        }
    }

    async fn send(
        &self,
        data: Bytes,
        content_type: &str,
        key: &UploadKey,
    ) -> Result<String, TransportError> {
        let url = self.storage.put(key.as_str(), data, content_type).await?;

        if !is_well_formed_url(&url) {
            return Err(TransportError::TransportFailure {
                attempts: 1,
                message: format!("Storage returned an invalid URL: {:?}", url),
            });
        }

        Ok(url)
    }
}

fn content_type_of(file: &dyn ByteSource) -> &str {
    file.content_type()
        .map(str::trim)
        .filter(|ct| !ct.is_empty())
        .unwrap_or(DEFAULT_MEDIA_TYPE)
}

fn is_well_formed_url(url: &str) -> bool {
    match url.parse::<http::Uri>() {
        Ok(uri) => {
            matches!(uri.scheme_str(), Some("http") | Some("https"))
                && uri.host().is_some_and(|h| !h.is_empty())
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use crate::StorageBackend;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Storage that plays back a script of outcomes, then succeeds.
    #[derive(Default)]
    struct ScriptedStorage {
        script: Mutex<VecDeque<Result<String, StorageError>>>,
        puts: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedStorage {
        fn failing_with(errors: Vec<StorageError>) -> Self {
            Self {
                script: Mutex::new(errors.into_iter().map(Err).collect()),
                puts: Mutex::default(),
            }
        }

        fn returning(url: &str) -> Self {
            Self {
                script: Mutex::new(VecDeque::from([Ok(url.to_string())])),
                puts: Mutex::default(),
            }
        }

        fn keys(&self) -> Vec<String> {
            self.puts.lock().unwrap().iter().map(|(k, _)| k.clone()).collect()
        }
    }

    #[async_trait]
    impl Storage for ScriptedStorage {
        async fn put(
            &self,
            key: &str,
            _data: Bytes,
            content_type: &str,
        ) -> crate::StorageResult<String> {
            self.puts
                .lock()
                .unwrap()
                .push((key.to_string(), content_type.to_string()));
            match self.script.lock().unwrap().pop_front() {
                Some(outcome) => outcome,
                None => Ok(self.public_url(key)),
            }
        }

        async fn delete(&self, _key: &str) -> crate::StorageResult<()> {
            Ok(())
        }

        async fn exists(&self, _key: &str) -> crate::StorageResult<bool> {
            Ok(false)
        }

        fn public_url(&self, key: &str) -> String {
            format!("https://jamin-media.s3.us-east-1.amazonaws.com/{}", key)
        }

        fn backend_type(&self) -> StorageBackend {
            StorageBackend::S3
        }
    }

    #[derive(Default)]
    struct RecordingSleeper(Mutex<Vec<Duration>>);

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.0.lock().unwrap().push(duration);
        }
    }

    fn transport(storage: Arc<ScriptedStorage>, sleeper: Arc<RecordingSleeper>) -> UploadTransport {
        UploadTransport::new(storage).with_sleeper(sleeper)
    }

    fn recording() -> MemorySource {
        MemorySource::new(Bytes::from_static(b"webm")).with_content_type("audio/webm")
    }

    fn failed(msg: &str) -> StorageError {
        StorageError::UploadFailed(msg.to_string())
    }

    #[test]
    fn test_delay_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay_after(1), Duration::from_millis(2000));
        assert_eq!(policy.delay_after(2), Duration::from_millis(4000));
    }

    #[tokio::test]
    async fn test_succeeds_on_third_attempt_with_backoff() {
        let storage = Arc::new(ScriptedStorage::failing_with(vec![
            failed("connection reset"),
            failed("connection reset"),
        ]));
        let sleeper = Arc::new(RecordingSleeper::default());

        let url = transport(storage.clone(), sleeper.clone())
            .upload_with_retry(&recording(), "layers", Some("take1.webm"))
            .await
            .unwrap();

        assert!(url.starts_with("https://jamin-media.s3.us-east-1.amazonaws.com/layers/"));
        assert!(url.ends_with("-take1.webm"));
        assert_eq!(
            *sleeper.0.lock().unwrap(),
            vec![Duration::from_millis(2000), Duration::from_millis(4000)]
        );

        let keys = storage.keys();
        assert_eq!(keys.len(), 3);
        assert_ne!(keys[0], keys[1]);
        assert_ne!(keys[1], keys[2]);
    }

    #[tokio::test]
    async fn test_exhaustion_reports_attempts_and_last_cause() {
        let storage = Arc::new(ScriptedStorage::failing_with(vec![
            failed("timeout"),
            failed("timeout"),
            failed("bucket unreachable"),
        ]));
        let sleeper = Arc::new(RecordingSleeper::default());

        let err = transport(storage.clone(), sleeper.clone())
            .upload_with_retry(&recording(), "layers", Some("take1.webm"))
            .await
            .unwrap_err();

        assert!(err.retries_exhausted());
        let message = err.to_string();
        assert!(message.contains("3 attempt"), "{message}");
        assert!(message.contains("bucket unreachable"), "{message}");
        assert_eq!(storage.keys().len(), 3);
        assert_eq!(sleeper.0.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_credential_errors_are_not_retried() {
        let storage = Arc::new(ScriptedStorage::failing_with(vec![
            StorageError::CredentialsInvalid("InvalidAccessKeyId".to_string()),
        ]));
        let sleeper = Arc::new(RecordingSleeper::default());

        let err = transport(storage.clone(), sleeper.clone())
            .upload_with_retry(&recording(), "layers", None)
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::CredentialsInvalid(_)));
        assert!(!err.retries_exhausted());
        assert_eq!(storage.keys().len(), 1);
        assert!(sleeper.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_signature_mismatch_is_not_retried() {
        let storage = Arc::new(ScriptedStorage::failing_with(vec![
            StorageError::SignatureMismatch("SignatureDoesNotMatch".to_string()),
        ]));
        let err = transport(storage.clone(), Arc::new(RecordingSleeper::default()))
            .upload_with_retry(&recording(), "layers", None)
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::SignatureMismatch(_)));
        assert_eq!(storage.keys().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_url_counts_as_failure() {
        let storage = Arc::new(ScriptedStorage::returning("not a url"));
        let key = build_key("layers", "take1.webm");

        let err = transport(storage, Arc::new(RecordingSleeper::default()))
            .upload(&recording(), &key)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::TransportFailure { .. }));
    }

    #[tokio::test]
    async fn test_missing_content_type_sent_as_webm() {
        let storage = Arc::new(ScriptedStorage::default());
        let key = build_key("layers", "take1.webm");

        transport(storage.clone(), Arc::new(RecordingSleeper::default()))
            .upload(&MemorySource::new(Bytes::from_static(b"x")), &key)
            .await
            .unwrap();

        let puts = storage.puts.lock().unwrap();
        assert_eq!(puts[0].1, "audio/webm");
    }

    #[tokio::test]
    async fn test_read_failure_is_not_retried() {
        let storage = Arc::new(ScriptedStorage::default());
        let source = crate::source::FileSource::new("/nonexistent/take1.webm");

        let err = transport(storage.clone(), Arc::new(RecordingSleeper::default()))
            .upload_with_retry(&source, "layers", None)
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::ReadFailure(_)));
        assert!(storage.keys().is_empty());
    }

    #[test]
    fn test_url_check() {
        assert!(is_well_formed_url("https://b.s3.us-east-1.amazonaws.com/layers/a.webm"));
        assert!(is_well_formed_url("http://localhost:4000/media/a.webm"));
        assert!(!is_well_formed_url("ftp://host/a.webm"));
        assert!(!is_well_formed_url("/media/a.webm"));
        assert!(!is_well_formed_url(""));
    }
}
