use crate::auth::session::SessionProvider;
use crate::error::HttpAppError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jamin_core::AppError;
use std::sync::Arc;

#[derive(Clone)]
pub struct AuthState {
    pub sessions: Arc<dyn SessionProvider>,
}

impl AuthState {
    pub fn new(sessions: Arc<dyn SessionProvider>) -> Self {
        Self { sessions }
    }
}

/// Rejects requests without a session with 401; otherwise stores the
/// [`Session`](crate::auth::Session) in request extensions.
pub async fn auth_middleware(
    State(auth_state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    match auth_state.sessions.current_session(request.headers()).await {
        Some(session) => {
            tracing::debug!(user_id = %session.user_id, "Session authenticated");
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        None => HttpAppError(AppError::Unauthorized(
            "Authentication required".to_string(),
        ))
        .into_response(),
    }
}
