use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::{
    error::{timed, AppError},
    roles::FALLBACK_ROLE_COLOR,
};

/// A user's role and its badge color. The pair is stored and cleared together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleBadge {
    pub role: String,
    pub color: String,
}

#[derive(Debug, FromRow)]
struct ProfileRoleRow {
    id: Uuid,
    role: Option<String>,
    role_color: Option<String>,
}

impl ProfileRoleRow {
    fn into_badge(self) -> Option<(Uuid, RoleBadge)> {
        let role = self.role.filter(|r| !r.is_empty())?;
        let color = self
            .role_color
            .unwrap_or_else(|| FALLBACK_ROLE_COLOR.to_string());
        Some((self.id, RoleBadge { role, color }))
    }
}

#[async_trait]
pub trait ProfileRepo: Send + Sync {
    async fn badge_of(&self, user_id: Uuid) -> Result<Option<RoleBadge>, AppError>;
    async fn badges_for(&self, user_ids: &[Uuid]) -> Result<HashMap<Uuid, RoleBadge>, AppError>;
    /// `None` clears role and color together.
    async fn set_badge(&self, user_id: Uuid, badge: Option<&RoleBadge>) -> Result<(), AppError>;
}

pub struct PgProfileRepo {
    db: PgPool,
    timeout: Duration,
}

impl PgProfileRepo {
    pub fn new(db: PgPool, timeout: Duration) -> Self {
        Self { db, timeout }
    }
}

#[async_trait]
impl ProfileRepo for PgProfileRepo {
    async fn badge_of(&self, user_id: Uuid) -> Result<Option<RoleBadge>, AppError> {
        timed("database", self.timeout, async {
            let row = sqlx::query_as::<_, ProfileRoleRow>(
                r#"SELECT id, role, role_color FROM profiles WHERE id = $1"#,
            )
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?;
            Ok(row.and_then(ProfileRoleRow::into_badge).map(|(_, b)| b))
        })
        .await
    }

    async fn badges_for(&self, user_ids: &[Uuid]) -> Result<HashMap<Uuid, RoleBadge>, AppError> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }
        timed("database", self.timeout, async {
            let rows = sqlx::query_as::<_, ProfileRoleRow>(
                r#"
                SELECT id, role, role_color
                FROM profiles
                WHERE id = ANY($1)
                "#,
            )
            .bind(user_ids)
            .fetch_all(&self.db)
            .await?;
            Ok(rows.into_iter().filter_map(ProfileRoleRow::into_badge).collect())
        })
        .await
    }

    async fn set_badge(&self, user_id: Uuid, badge: Option<&RoleBadge>) -> Result<(), AppError> {
        timed("database", self.timeout, async {
            sqlx::query(
                r#"
                INSERT INTO profiles (id, role, role_color, updated_at)
                VALUES ($1, $2, $3, now())
                ON CONFLICT (id) DO UPDATE
                   SET role = EXCLUDED.role,
                       role_color = EXCLUDED.role_color,
                       updated_at = now()
                "#,
            )
            .bind(user_id)
            .bind(badge.map(|b| b.role.as_str()))
            .bind(badge.map(|b| b.color.as_str()))
            .execute(&self.db)
            .await?;
            Ok(())
        })
        .await
    }
}
