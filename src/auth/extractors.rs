use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;
use uuid::Uuid;

use super::{jwt::JwtKeys, token::extract_identity};
use crate::{error::AppError, state::AppState};

/// Authenticated caller, as far as the bearer token can tell.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("No authorization header".into()))?;

        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Invalid auth scheme".into()))?;

        if state.config.trust_gateway {
            let identity = extract_identity(token).map_err(|e| {
                warn!(error = %e, "undecodable gateway token");
                AppError::Unauthorized(e.to_string())
            })?;
            let id = Uuid::parse_str(&identity.subject)
                .map_err(|_| AppError::Unauthorized("Invalid user ID in token".into()))?;
            return Ok(AuthUser {
                id,
                email: identity.email,
            });
        }

        let claims = JwtKeys::from_ref(state).verify(token).map_err(|e| {
            warn!(error = %e, "invalid or expired token");
            AppError::Unauthorized("Invalid or expired token".into())
        })?;

        Ok(AuthUser {
            id: claims.sub,
            email: claims.email,
        })
    }
}
