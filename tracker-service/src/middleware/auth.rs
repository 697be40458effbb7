use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use service_core::error::AppError;
use uuid::Uuid;

use crate::startup::AppState;

/// Authenticated user extracted from the bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::AuthError(anyhow::anyhow!("Missing Authorization header"))
            })?;

        let token = header_value.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::AuthError(anyhow::anyhow!("Authorization header is not a bearer token"))
        })?;

        let claims = state.jwt.verify(token)?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| {
            AppError::AuthError(anyhow::anyhow!("Token subject is not a valid user id"))
        })?;

        // Add to tracing span for observability
        tracing::Span::current().record("user_id", claims.sub.as_str());

        Ok(AuthUser {
            user_id,
            email: claims.email,
        })
    }
}
