use std::{future::Future, time::Duration};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};

/// Every handler failure funnels through this type and is rendered as `{ "error": ... }`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Cannot remove yourself as an admin")]
    SelfRemoval,
    #[error("{service}: {message}")]
    Upstream { service: &'static str, message: String },
    #[error("{0} did not respond in time")]
    Timeout(&'static str),
    #[error("{0}")]
    Unknown(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) | AppError::SelfRemoval | AppError::Conflict(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Upstream { .. } | AppError::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        AppError::InvalidInput(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        AppError::Forbidden(msg.into())
    }

    pub fn user_not_found(email: &str) -> Self {
        AppError::NotFound(format!("User with email \"{email}\" not found"))
    }

    pub fn database(err: sqlx::Error) -> Self {
        AppError::Upstream {
            service: "database",
            message: err.to_string(),
        }
    }

    pub fn identity(msg: impl Into<String>) -> Self {
        AppError::Upstream {
            service: "identity provider",
            message: msg.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            AppError::Upstream { .. } | AppError::Unknown(_) => {
                error!(error = %self, %status, "request failed")
            }
            AppError::Timeout(_) => warn!(error = %self, "upstream timeout"),
            _ => {}
        }
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Unknown(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut => AppError::Timeout("database"),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict(db.message().to_string())
            }
            _ => AppError::database(err),
        }
    }
}

/// Bounds an upstream call so a stalled store surfaces as `Timeout` instead of hanging.
pub async fn timed<T, F>(service: &'static str, limit: Duration, fut: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(res) => res,
        Err(_) => Err(AppError::Timeout(service)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_taxonomy() {
        assert_eq!(AppError::Unauthorized("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::forbidden("x").status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::invalid("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::SelfRemoval.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Conflict("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::identity("down").status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(AppError::Timeout("database").status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            AppError::from(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn upstream_message_is_passed_through() {
        let err = AppError::identity("rate limited");
        assert_eq!(err.to_string(), "identity provider: rate limited");
    }

    #[tokio::test]
    async fn timed_maps_elapsed_deadline_to_timeout() {
        let res: Result<(), AppError> = timed("database", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(res, Err(AppError::Timeout("database"))));

        let ok = timed("database", Duration::from_secs(1), async { Ok(7) }).await;
        assert_eq!(ok.unwrap(), 7);
    }
}
