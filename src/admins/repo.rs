use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

use crate::error::{timed, AppError};

/// Row of the `admins` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AdminRecord {
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub created_by: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    Absent,
    /// Refused: the target is the only admin left.
    LastAdmin,
}

#[async_trait]
pub trait AdminRepo: Send + Sync {
    /// Newest first.
    async fn list(&self) -> Result<Vec<AdminRecord>, AppError>;
    async fn contains(&self, email: &str) -> Result<bool, AppError>;
    /// Fails with `Conflict` when the email is already registered.
    async fn insert(&self, email: &str, created_by: &str) -> Result<AdminRecord, AppError>;
    async fn remove(&self, email: &str) -> Result<RemoveOutcome, AppError>;
}

pub struct PgAdminRepo {
    db: PgPool,
    timeout: Duration,
}

impl PgAdminRepo {
    pub fn new(db: PgPool, timeout: Duration) -> Self {
        Self { db, timeout }
    }
}

#[async_trait]
impl AdminRepo for PgAdminRepo {
    async fn list(&self) -> Result<Vec<AdminRecord>, AppError> {
        timed("database", self.timeout, async {
            let rows = sqlx::query_as::<_, AdminRecord>(
                r#"
                SELECT email, created_at, created_by
                FROM admins
                ORDER BY created_at DESC
                "#,
            )
            .fetch_all(&self.db)
            .await?;
            Ok(rows)
        })
        .await
    }

    async fn contains(&self, email: &str) -> Result<bool, AppError> {
        timed("database", self.timeout, async {
            let found: Option<(String,)> =
                sqlx::query_as(r#"SELECT email FROM admins WHERE email = $1"#)
                    .bind(email)
                    .fetch_optional(&self.db)
                    .await?;
            Ok(found.is_some())
        })
        .await
    }

    async fn insert(&self, email: &str, created_by: &str) -> Result<AdminRecord, AppError> {
        timed("database", self.timeout, async {
            let row = sqlx::query_as::<_, AdminRecord>(
                r#"
                INSERT INTO admins (email, created_by)
                VALUES ($1, $2)
                RETURNING email, created_at, created_by
                "#,
            )
            .bind(email)
            .bind(created_by)
            .fetch_one(&self.db)
            .await
            .map_err(|e| match AppError::from(e) {
                AppError::Conflict(_) => AppError::Conflict(format!("{email} is already an admin")),
                other => other,
            })?;
            Ok(row)
        })
        .await
    }

    async fn remove(&self, email: &str) -> Result<RemoveOutcome, AppError> {
        timed("database", self.timeout, async {
            let mut tx = self.db.begin().await?;
            // Row locks serialize concurrent removals so two admins cannot remove each other.
            let emails: Vec<(String,)> =
                sqlx::query_as(r#"SELECT email FROM admins FOR UPDATE"#)
                    .fetch_all(&mut *tx)
                    .await?;

            if !emails.iter().any(|(e,)| e == email) {
                tx.rollback().await?;
                return Ok(RemoveOutcome::Absent);
            }
            if emails.len() <= 1 {
                tx.rollback().await?;
                return Ok(RemoveOutcome::LastAdmin);
            }

            sqlx::query(r#"DELETE FROM admins WHERE email = $1"#)
                .bind(email)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            Ok(RemoveOutcome::Removed)
        })
        .await
    }
}
