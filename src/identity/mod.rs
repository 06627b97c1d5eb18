//! The hosted identity provider owns user accounts. This service only reads them
//! and patches metadata / ban state through the provider's admin API.

mod gotrue;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use tracing::warn;
use uuid::Uuid;

use crate::error::AppError;

pub use gotrue::GoTrueClient;

/// Metadata key holding a per-user trial length override.
pub const TRIAL_DAYS_KEY: &str = "custom_trial_days";

/// Page size used when a lookup has to walk the whole user list.
pub const SCAN_PAGE_SIZE: u32 = 100;
const MAX_SCAN_PAGES: u32 = 1_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_sign_in_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub banned_until: Option<OffsetDateTime>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub user_metadata: Map<String, Value>,
}

fn null_as_empty<'de, D>(de: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(de)?.unwrap_or_default())
}

impl DirectoryUser {
    pub fn display_name(&self) -> Option<&str> {
        ["full_name", "name"]
            .iter()
            .find_map(|k| self.user_metadata.get(*k).and_then(Value::as_str))
            .filter(|s| !s.is_empty())
    }

    pub fn avatar_url(&self) -> Option<&str> {
        self.user_metadata
            .get("avatar_url")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Custom trial length, if one was set and is a non-negative integer.
    pub fn trial_override(&self) -> Option<u32> {
        self.user_metadata
            .get(TRIAL_DAYS_KEY)
            .and_then(Value::as_u64)
            .and_then(|d| u32::try_from(d).ok())
    }

    pub fn is_banned(&self, now: OffsetDateTime) -> bool {
        self.banned_until.is_some_and(|until| until > now)
    }

    pub fn email_matches(&self, email: &str) -> bool {
        self.email
            .as_deref()
            .is_some_and(|e| e.eq_ignore_ascii_case(email.trim()))
    }
}

#[derive(Debug, Clone)]
pub struct UserPage {
    pub users: Vec<DirectoryUser>,
    /// Total user count when the provider reports it.
    pub total: Option<u64>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// 1-based page of users in provider order.
    async fn list_users(&self, page: u32, per_page: u32) -> Result<UserPage, AppError>;
    async fn get_user(&self, id: Uuid) -> Result<Option<DirectoryUser>, AppError>;
    /// Replaces the user's metadata with `metadata`. Callers merge first.
    async fn update_user_metadata(
        &self,
        id: Uuid,
        metadata: Map<String, Value>,
    ) -> Result<DirectoryUser, AppError>;
    async fn ban_user(&self, id: Uuid, duration: &str) -> Result<(), AppError>;
    async fn generate_magic_link(&self, email: &str) -> Result<String, AppError>;
    async fn send_recovery(&self, email: &str) -> Result<(), AppError>;
}

/// Walks every page until `email` shows up or the list runs out.
pub async fn find_by_email(
    provider: &dyn IdentityProvider,
    email: &str,
) -> Result<Option<DirectoryUser>, AppError> {
    find_by_email_within(provider, email, MAX_SCAN_PAGES).await
}

pub async fn list_all(provider: &dyn IdentityProvider) -> Result<Vec<DirectoryUser>, AppError> {
    list_all_within(provider, MAX_SCAN_PAGES).await
}

pub(crate) async fn find_by_email_within(
    provider: &dyn IdentityProvider,
    email: &str,
    max_pages: u32,
) -> Result<Option<DirectoryUser>, AppError> {
    for page in 1..=max_pages {
        let batch = provider.list_users(page, SCAN_PAGE_SIZE).await?;
        let short = batch.users.len() < SCAN_PAGE_SIZE as usize;
        if let Some(found) = batch.users.into_iter().find(|u| u.email_matches(email)) {
            return Ok(Some(found));
        }
        if short {
            return Ok(None);
        }
    }
    warn!(%email, max_pages, "user scan stopped at page cap; lookup may be incomplete");
    Ok(None)
}

pub(crate) async fn list_all_within(
    provider: &dyn IdentityProvider,
    max_pages: u32,
) -> Result<Vec<DirectoryUser>, AppError> {
    let mut all = Vec::new();
    for page in 1..=max_pages {
        let batch = provider.list_users(page, SCAN_PAGE_SIZE).await?;
        let short = batch.users.len() < SCAN_PAGE_SIZE as usize;
        all.extend(batch.users);
        if short {
            return Ok(all);
        }
    }
    warn!(max_pages, scanned = all.len(), "user scan stopped at page cap; listing is truncated");
    Ok(all)
}
