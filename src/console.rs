//! State of one admin console session, kept out of any rendering layer.
//!
//! The session decides what to fetch and which request an action turns into. It
//! never performs I/O itself except for the countdown ticker.

use std::{collections::BTreeSet, time::Duration};

use axum::http::Method;
use serde_json::{json, Value};
use time::OffsetDateTime;
use tokio::{
    sync::watch,
    time::{interval, MissedTickBehavior},
};
use tracing::debug;

use crate::{
    error::AppError,
    users::{
        directory::{ListQuery, SortColumn, SortDirection, UserListing, UserRow},
        trial::remaining,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Column {
    Avatar,
    Id,
    Name,
    Email,
    Role,
    CreatedAt,
    LastSignIn,
    Trial,
}

impl Column {
    fn sort_key(self) -> Option<SortColumn> {
        match self {
            Column::Id => Some(SortColumn::Id),
            Column::Name => Some(SortColumn::Name),
            Column::Email => Some(SortColumn::Email),
            Column::Role => Some(SortColumn::Role),
            Column::CreatedAt => Some(SortColumn::CreatedAt),
            Column::Trial => Some(SortColumn::TrialEnd),
            Column::Avatar | Column::LastSignIn => None,
        }
    }

    pub fn always_visible(self) -> bool {
        matches!(self, Column::Avatar | Column::Trial)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SetRole { role: String, color: Option<String> },
    ClearRole,
    SetTrial { days: u32 },
    Ban { duration: Option<String> },
    Impersonate,
    SendRecovery,
    AddAdmin { email: String },
    RemoveAdmin { email: String },
    DeleteRoleDefinition { role_name: String },
}

impl Action {
    pub fn requires_confirmation(&self) -> bool {
        matches!(
            self,
            Action::Ban { .. }
                | Action::ClearRole
                | Action::RemoveAdmin { .. }
                | Action::DeleteRoleDefinition { .. }
        )
    }

    fn targets_selected_user(&self) -> bool {
        !matches!(
            self,
            Action::AddAdmin { .. } | Action::RemoveAdmin { .. } | Action::DeleteRoleDefinition { .. }
        )
    }

    /// HTTP call for this action against the `/api/v1` routes.
    fn into_request(self, target: Option<&str>) -> ApiRequest {
        let target = target.unwrap_or_default();
        let (method, path, body) = match self {
            Action::SetRole { role, color } => (
                Method::POST,
                "/api/v1/users/role".to_string(),
                json!({ "targetEmail": target, "role": role, "roleColor": color }),
            ),
            Action::ClearRole => (
                Method::DELETE,
                "/api/v1/users/role".to_string(),
                json!({ "targetEmail": target }),
            ),
            Action::SetTrial { days } => (
                Method::POST,
                "/api/v1/users/trial".to_string(),
                json!({ "targetEmail": target, "days": days }),
            ),
            Action::Ban { duration } => (
                Method::POST,
                "/api/v1/users/ban".to_string(),
                json!({ "targetEmail": target, "duration": duration }),
            ),
            Action::Impersonate => (
                Method::POST,
                "/api/v1/users/impersonate".to_string(),
                json!({ "targetEmail": target }),
            ),
            Action::SendRecovery => (
                Method::POST,
                "/api/v1/users/recovery".to_string(),
                json!({ "targetEmail": target }),
            ),
            Action::AddAdmin { email } => {
                (Method::POST, "/api/v1/admins".to_string(), json!({ "email": email }))
            }
            Action::RemoveAdmin { email } => {
                (Method::DELETE, "/api/v1/admins".to_string(), json!({ "email": email }))
            }
            Action::DeleteRoleDefinition { role_name } => (
                Method::DELETE,
                "/api/v1/roles".to_string(),
                json!({ "roleName": role_name }),
            ),
        };
        ApiRequest { method, path, body }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Send right away.
    Send(ApiRequest),
    /// Waiting for `confirm` or `cancel`.
    Staged,
}

#[derive(Debug)]
pub struct Session {
    pub page: u32,
    pub total_pages: u32,
    pub page_size: u32,
    pub search: String,
    pub sort: SortColumn,
    pub direction: SortDirection,
    visible: BTreeSet<Column>,
    selected: Option<UserRow>,
    pending: Option<ApiRequest>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            page: 1,
            total_pages: 1,
            page_size: crate::users::directory::DEFAULT_PAGE_SIZE,
            search: String::new(),
            sort: SortColumn::default(),
            direction: SortDirection::default(),
            visible: [Column::Avatar, Column::Name, Column::Email, Column::Role, Column::Trial]
                .into_iter()
                .collect(),
            selected: None,
            pending: None,
        }
    }
}

impl Session {
    /// Query for the next directory fetch.
    pub fn query(&self) -> ListQuery {
        ListQuery {
            page: Some(self.page),
            page_size: Some(self.page_size),
            search: Some(self.search.clone()).filter(|s| !s.is_empty()),
            sort: Some(self.sort),
            direction: Some(self.direction),
        }
    }

    pub fn apply_listing(&mut self, listing: &UserListing) {
        self.total_pages = listing.total_pages.max(1);
        self.page = listing.page.clamp(1, self.total_pages);
    }

    /// Returns false for columns that cannot be sorted.
    pub fn toggle_sort(&mut self, column: Column) -> bool {
        let Some(key) = column.sort_key() else {
            return false;
        };
        if self.sort == key {
            self.direction = match self.direction {
                SortDirection::Asc => SortDirection::Desc,
                SortDirection::Desc => SortDirection::Asc,
            };
        } else {
            self.sort = key;
            self.direction = SortDirection::Asc;
        }
        self.page = 1;
        true
    }

    pub fn set_search(&mut self, term: &str) {
        self.search = term.trim().to_string();
        self.page = 1;
    }

    pub fn go_to(&mut self, page: u32) {
        self.page = page.clamp(1, self.total_pages.max(1));
    }

    pub fn next_page(&mut self) {
        self.go_to(self.page.saturating_add(1));
    }

    pub fn prev_page(&mut self) {
        self.go_to(self.page.saturating_sub(1));
    }

    pub fn is_visible(&self, column: Column) -> bool {
        column.always_visible() || self.visible.contains(&column)
    }

    /// Flips a column and returns its new visibility.
    pub fn toggle_column(&mut self, column: Column) -> bool {
        if column.always_visible() {
            return true;
        }
        if !self.visible.remove(&column) {
            self.visible.insert(column);
        }
        self.is_visible(column)
    }

    pub fn select(&mut self, user: UserRow) {
        self.selected = Some(user);
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<&UserRow> {
        self.selected.as_ref()
    }

    pub fn pending(&self) -> Option<&ApiRequest> {
        self.pending.as_ref()
    }

    /// Destructive actions are staged until confirmed; a new request replaces any
    /// staged one.
    pub fn request(&mut self, action: Action) -> Result<Dispatch, AppError> {
        let target = if action.targets_selected_user() {
            let user = self
                .selected
                .as_ref()
                .ok_or_else(|| AppError::invalid("No user selected"))?;
            Some(user.email.clone())
        } else {
            None
        };
        let confirm = action.requires_confirmation();
        let req = action.into_request(target.as_deref());
        if confirm {
            debug!(path = %req.path, "action staged for confirmation");
            self.pending = Some(req);
            Ok(Dispatch::Staged)
        } else {
            Ok(Dispatch::Send(req))
        }
    }

    pub fn confirm(&mut self) -> Option<ApiRequest> {
        self.pending.take()
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

pub fn countdown_label(now: OffsetDateTime, trial_end: OffsetDateTime) -> String {
    match remaining(now, trial_end) {
        Some(left) => format!(
            "{}d {}h {}m {}s",
            left.days, left.hours, left.minutes, left.seconds
        ),
        None => "Expired".to_string(),
    }
}

/// Re-renders trial countdowns once per second until `stop` flips or its sender is dropped.
pub async fn run_countdown<F>(trial_ends: Vec<OffsetDateTime>, stop: watch::Receiver<bool>, render: F)
where
    F: FnMut(Vec<String>),
{
    run_countdown_every(Duration::from_secs(1), trial_ends, stop, render).await
}

pub(crate) async fn run_countdown_every<F>(
    period: Duration,
    trial_ends: Vec<OffsetDateTime>,
    mut stop: watch::Receiver<bool>,
    mut render: F,
) where
    F: FnMut(Vec<String>),
{
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = OffsetDateTime::now_utc();
                render(trial_ends.iter().map(|end| countdown_label(now, *end)).collect());
            }
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    break;
                }
            }
        }
    }
}
