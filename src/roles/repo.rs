use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::error::{timed, AppError};

/// Row of the `role_hierarchy` table, keyed by `role_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct RoleDefinition {
    pub role_name: String,
    pub hierarchy_order: i32,
    pub color: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl RoleDefinition {
    /// Blank descriptions read back as `None`.
    pub(crate) fn normalized(mut self) -> Self {
        self.description = self.description.filter(|d| !d.trim().is_empty());
        self
    }
}

#[async_trait]
pub trait RoleRepo: Send + Sync {
    /// Ascending by `hierarchy_order`, ties by name.
    async fn list(&self) -> Result<Vec<RoleDefinition>, AppError>;
    /// Upserts every entry or none of them.
    async fn upsert_batch(&self, roles: &[RoleDefinition]) -> Result<(), AppError>;
    /// Returns `false` when no definition had that name. With `cascade`, users
    /// holding the role lose it in the same transaction.
    async fn delete(&self, role_name: &str, cascade: bool) -> Result<bool, AppError>;
}

pub struct PgRoleRepo {
    db: PgPool,
    timeout: Duration,
}

impl PgRoleRepo {
    pub fn new(db: PgPool, timeout: Duration) -> Self {
        Self { db, timeout }
    }
}

#[async_trait]
impl RoleRepo for PgRoleRepo {
    async fn list(&self) -> Result<Vec<RoleDefinition>, AppError> {
        timed("database", self.timeout, async {
            let rows = sqlx::query_as::<_, RoleDefinition>(
                r#"
                SELECT role_name, hierarchy_order, color, description
                FROM role_hierarchy
                ORDER BY hierarchy_order ASC, role_name ASC
                "#,
            )
            .fetch_all(&self.db)
            .await?;
            Ok(rows.into_iter().map(RoleDefinition::normalized).collect())
        })
        .await
    }

    async fn upsert_batch(&self, roles: &[RoleDefinition]) -> Result<(), AppError> {
        timed("database", self.timeout, async {
            let mut tx = self.db.begin().await?;
            for role in roles {
                sqlx::query(
                    r#"
                    INSERT INTO role_hierarchy (role_name, hierarchy_order, color, description)
                    VALUES ($1, $2, $3, $4)
                    ON CONFLICT (role_name) DO UPDATE
                       SET hierarchy_order = EXCLUDED.hierarchy_order,
                           color = EXCLUDED.color,
                           description = EXCLUDED.description
                    "#,
                )
                .bind(&role.role_name)
                .bind(role.hierarchy_order)
                .bind(&role.color)
                .bind(role.description.as_deref())
                .execute(&mut *tx)
                .await?;
            }
            tx.commit().await?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, role_name: &str, cascade: bool) -> Result<bool, AppError> {
        timed("database", self.timeout, async {
            let mut tx = self.db.begin().await?;
            let deleted = sqlx::query(r#"DELETE FROM role_hierarchy WHERE role_name = $1"#)
                .bind(role_name)
                .execute(&mut *tx)
                .await?
                .rows_affected();
            if deleted == 0 {
                tx.rollback().await?;
                return Ok(false);
            }
            if cascade {
                sqlx::query(
                    r#"
                    UPDATE profiles
                       SET role = NULL, role_color = NULL, updated_at = now()
                     WHERE role = $1
                    "#,
                )
                .bind(role_name)
                .execute(&mut *tx)
                .await?;
            }
            tx.commit().await?;
            Ok(true)
        })
        .await
    }
}
