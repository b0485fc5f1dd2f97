//! Application state shared by handlers and middleware.

use crate::auth::AuthState;
use crate::services::LayerService;
use jamin_infra::{CsrfConfig, HttpRateLimiter};
use jamin_processing::UploadValidator;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub layers: LayerService,
    pub upload_validator: UploadValidator,
    pub auth: Arc<AuthState>,
    pub csrf: Arc<CsrfConfig>,
    pub rate_limiter: Arc<HttpRateLimiter>,
}

impl AppState {
    /// Largest request body the router accepts: the file limit plus room for
    /// the text fields and multipart framing.
    pub fn body_limit(&self) -> usize {
        self.upload_validator.max_file_size() + BODY_LIMIT_SLACK
    }
}

const BODY_LIMIT_SLACK: usize = 1024 * 1024;
