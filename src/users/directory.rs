//! Paged user directory: provider accounts joined with role badges and trial state.
//!
//! Without a search term only the requested provider page is loaded, so sorting is
//! correct within that page only. A search walks every provider page, filters, sorts
//! across all matches and then pages the result.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{
    repo::RoleBadge,
    trial::{classify, compute_expiry, trial_days_for, TrialState},
};
use crate::{
    access::{Caller, Capability},
    config::PolicyConfig,
    error::AppError,
    identity::{list_all, DirectoryUser},
    state::AppState,
};

pub const DEFAULT_PAGE_SIZE: u32 = 30;
pub const MAX_PAGE_SIZE: u32 = 100;
const MISSING_NAME: &str = "N/A";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortColumn {
    #[default]
    #[serde(alias = "uid")]
    Id,
    Email,
    Name,
    Role,
    CreatedAt,
    TrialEnd,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub search: Option<String>,
    pub sort: Option<SortColumn>,
    pub direction: Option<SortDirection>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub avatar_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_sign_in_at: Option<OffsetDateTime>,
    pub role: Option<String>,
    pub role_color: Option<String>,
    pub trial_days: u32,
    #[serde(with = "time::serde::rfc3339::option")]
    pub trial_end: Option<OffsetDateTime>,
    pub trial_state: TrialState,
    pub banned: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListing {
    pub users: Vec<UserRow>,
    pub page: u32,
    pub total_pages: u32,
}

pub(crate) fn join_row(
    user: DirectoryUser,
    badge: Option<RoleBadge>,
    policy: &PolicyConfig,
    now: OffsetDateTime,
) -> UserRow {
    let trial_days = trial_days_for(&user, policy.default_trial_days);
    let trial_end = compute_expiry(user.created_at, trial_days, policy.trial_offset);
    let trial_state = trial_end.map_or(TrialState::Active, |end| classify(now, end));
    let (role, role_color) = match badge {
        Some(b) => (Some(b.role), Some(b.color)),
        None => (None, None),
    };
    UserRow {
        id: user.id,
        name: user.display_name().unwrap_or(MISSING_NAME).to_string(),
        avatar_url: user.avatar_url().map(String::from),
        banned: user.is_banned(now),
        email: user.email.unwrap_or_default(),
        created_at: user.created_at,
        last_sign_in_at: user.last_sign_in_at,
        role,
        role_color,
        trial_days,
        trial_end,
        trial_state,
    }
}

/// Case-insensitive substring match on email, name or role. `needle` is lowercase.
pub(crate) fn matches(row: &UserRow, needle: &str) -> bool {
    [Some(row.email.as_str()), Some(row.name.as_str()), row.role.as_deref()]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(needle))
}

fn text_key(value: Option<&str>) -> String {
    value.unwrap_or_default().to_lowercase()
}

fn compare(a: &UserRow, b: &UserRow, column: SortColumn) -> Ordering {
    match column {
        SortColumn::Id => a.id.to_string().cmp(&b.id.to_string()),
        SortColumn::Email => text_key(Some(&a.email)).cmp(&text_key(Some(&b.email))),
        SortColumn::Name => text_key(Some(&a.name)).cmp(&text_key(Some(&b.name))),
        SortColumn::Role => text_key(a.role.as_deref()).cmp(&text_key(b.role.as_deref())),
        SortColumn::CreatedAt => a.created_at.cmp(&b.created_at),
        SortColumn::TrialEnd => a.trial_end.cmp(&b.trial_end),
    }
}

/// Stable: equal keys keep provider order in both directions.
pub(crate) fn sort_rows(rows: &mut [UserRow], column: SortColumn, direction: SortDirection) {
    rows.sort_by(|a, b| {
        let ord = compare(a, b, column);
        match direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
}

fn page_count(total: u64, page_size: u32) -> u32 {
    let pages = total.div_ceil(u64::from(page_size)).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

async fn join_all(
    state: &AppState,
    users: Vec<DirectoryUser>,
    now: OffsetDateTime,
) -> Result<Vec<UserRow>, AppError> {
    let ids: Vec<Uuid> = users.iter().map(|u| u.id).collect();
    let mut badges = state.profiles.badges_for(&ids).await?;
    let policy = &state.config.policy;
    Ok(users
        .into_iter()
        .map(|u| {
            let badge = badges.remove(&u.id);
            join_row(u, badge, policy, now)
        })
        .collect())
}

pub async fn list_users(
    state: &AppState,
    caller: &Caller,
    query: ListQuery,
    now: OffsetDateTime,
) -> Result<UserListing, AppError> {
    caller.require(Capability::ViewDirectory, &state.config.policy)?;

    let page = query.page.unwrap_or(1).max(1);
    let page_size = query
        .page_size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let column = query.sort.unwrap_or_default();
    let direction = query.direction.unwrap_or_default();
    let needle = query
        .search
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());

    let Some(needle) = needle else {
        let batch = state.identity.list_users(page, page_size).await?;
        let fetched = batch.users.len() as u64;
        // Without a reported total, a full page means there may be one more.
        let total = batch.total.unwrap_or_else(|| {
            let before = u64::from(page - 1) * u64::from(page_size);
            if fetched == u64::from(page_size) {
                before + fetched + 1
            } else {
                before + fetched
            }
        });
        let mut rows = join_all(state, batch.users, now).await?;
        sort_rows(&mut rows, column, direction);
        return Ok(UserListing {
            users: rows,
            page,
            total_pages: page_count(total, page_size),
        });
    };

    let everyone = list_all(state.identity.as_ref()).await?;
    let mut rows: Vec<UserRow> = join_all(state, everyone, now)
        .await?
        .into_iter()
        .filter(|r| matches(r, &needle))
        .collect();
    sort_rows(&mut rows, column, direction);

    let total_pages = page_count(rows.len() as u64, page_size);
    let start = (page as usize - 1).saturating_mul(page_size as usize);
    let users = rows.into_iter().skip(start).take(page_size as usize).collect();
    Ok(UserListing {
        users,
        page,
        total_pages,
    })
}
