use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts, HeaderMap, StatusCode};
use axum::Json;
use jamin_core::AppError;
use jamin_infra::ErrorResponse;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Cookie carrying the session token when no `Authorization` header is sent.
pub const SESSION_COOKIE: &str = "session";

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: Uuid, // user_id
    pub exp: i64,
    pub iat: i64,
}

/// Authenticated user, stored in request extensions by the auth middleware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub user_id: Uuid,
}

/// Resolves the session of the caller, if any.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn current_session(&self, headers: &HeaderMap) -> Option<Session>;
}

/// HS256 session tokens signed with `SESSION_SECRET`.
#[derive(Clone)]
pub struct JwtSessionProvider {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtSessionProvider {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Sign a token for `user_id` valid for `ttl`.
    pub fn issue(&self, user_id: Uuid, ttl: chrono::Duration) -> Result<String, AppError> {
        let now = chrono::Utc::now();
        let claims = SessionClaims {
            sub: user_id,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign session token: {}", e)))
    }

    pub fn validate_token(&self, token: &str) -> Result<SessionClaims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        let token_data =
            decode::<SessionClaims>(token, &self.decoding_key, &validation).map_err(|e| {
                tracing::debug!("Session token validation failed: {}", e);
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                        AppError::Unauthorized("Session has expired".to_string())
                    }
                    _ => AppError::Unauthorized("Invalid session token".to_string()),
                }
            })?;

        Ok(token_data.claims)
    }
}

#[async_trait]
impl SessionProvider for JwtSessionProvider {
    async fn current_session(&self, headers: &HeaderMap) -> Option<Session> {
        let token = token_from_headers(headers)?;
        let claims = self.validate_token(&token).ok()?;
        Some(Session {
            user_id: claims.sub,
        })
    }
}

/// Bearer token first, then the session cookie.
fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

// Multipart handlers cannot use `Extension`, so the session is read from parts directly
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Session>().copied().ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::new("Authentication required").with_code("UNAUTHORIZED")),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &str = "test-session-secret-with-at-least-32-chars";

    #[tokio::test]
    async fn test_bearer_token_resolves_session() {
        let provider = JwtSessionProvider::new(SECRET);
        let user_id = Uuid::new_v4();
        let token = provider.issue(user_id, chrono::Duration::hours(1)).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );

        let session = provider.current_session(&headers).await.unwrap();
        assert_eq!(session.user_id, user_id);
    }

    #[tokio::test]
    async fn test_session_cookie_resolves_session() {
        let provider = JwtSessionProvider::new(SECRET);
        let user_id = Uuid::new_v4();
        let token = provider.issue(user_id, chrono::Duration::hours(1)).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("theme=dark; session={}", token)).unwrap(),
        );

        let session = provider.current_session(&headers).await.unwrap();
        assert_eq!(session.user_id, user_id);
    }

    #[tokio::test]
    async fn test_expired_or_foreign_token_is_rejected() {
        let provider = JwtSessionProvider::new(SECRET);
        let expired = provider
            .issue(Uuid::new_v4(), chrono::Duration::hours(-1))
            .unwrap();
        assert!(matches!(
            provider.validate_token(&expired),
            Err(AppError::Unauthorized(msg)) if msg.contains("expired")
        ));

        let other = JwtSessionProvider::new("another-secret-that-is-also-32-chars-long");
        let foreign = other.issue(Uuid::new_v4(), chrono::Duration::hours(1)).unwrap();
        assert!(provider.validate_token(&foreign).is_err());
    }

    #[tokio::test]
    async fn test_no_credentials_no_session() {
        let provider = JwtSessionProvider::new(SECRET);
        assert!(provider.current_session(&HeaderMap::new()).await.is_none());
    }
}
