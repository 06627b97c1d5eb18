//! Trial windows are derived on every read from the account creation time and the
//! per-user override in provider metadata. Nothing here is persisted except the override.

use serde::Serialize;
use serde_json::Value;
use time::{Duration, OffsetDateTime, UtcOffset};
use tracing::{info, warn};

use crate::{
    access::{Caller, Capability},
    error::AppError,
    identity::{find_by_email, DirectoryUser, TRIAL_DAYS_KEY},
    state::AppState,
    validate::normalize_email,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrialState {
    Active,
    Expired,
}

/// Adds `days` calendar days to the creation date as seen in `offset`, keeping the
/// wall-clock time. `None` only when the result overflows the representable range.
pub fn compute_expiry(
    created_at: OffsetDateTime,
    days: u32,
    offset: UtcOffset,
) -> Option<OffsetDateTime> {
    let local = created_at.to_offset(offset);
    let date = local.date().checked_add(Duration::days(i64::from(days)))?;
    Some(date.with_time(local.time()).assume_offset(offset))
}

/// The boundary itself still counts as active.
pub fn classify(now: OffsetDateTime, expiry: OffsetDateTime) -> TrialState {
    if now > expiry {
        TrialState::Expired
    } else {
        TrialState::Active
    }
}

pub fn trial_days_for(user: &DirectoryUser, default_days: u32) -> u32 {
    user.trial_override().unwrap_or(default_days)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

/// Time left until `expiry`, or `None` once it has passed.
pub fn remaining(now: OffsetDateTime, expiry: OffsetDateTime) -> Option<Countdown> {
    if classify(now, expiry) == TrialState::Expired {
        return None;
    }
    let left = expiry - now;
    Some(Countdown {
        days: left.whole_days(),
        hours: left.whole_hours() % 24,
        minutes: left.whole_minutes() % 60,
        seconds: left.whole_seconds() % 60,
    })
}

/// Accepts integral JSON numbers, including ones written as `30.0`.
fn parse_days(days: &Value) -> Result<u32, AppError> {
    let whole = days.as_u64().or_else(|| {
        days.as_f64()
            .filter(|d| d.fract() == 0.0 && *d >= 0.0 && *d <= f64::from(u32::MAX))
            .map(|d| d as u64)
    });
    whole
        .and_then(|d| u32::try_from(d).ok())
        .ok_or_else(|| AppError::invalid("\"days\" must be a non-negative integer"))
}

/// Stores a per-user trial length. Other metadata keys are kept as they are.
pub async fn set_trial_days(
    state: &AppState,
    caller: &Caller,
    target_email: &str,
    days: &Value,
) -> Result<u32, AppError> {
    caller.require(Capability::SetTrial, &state.config.policy)?;

    let target_email = normalize_email(target_email);
    if target_email.is_empty() {
        return Err(AppError::invalid("Invalid input: \"targetEmail\" and \"days\" are required"));
    }
    let days = parse_days(days)?;

    let user = find_by_email(state.identity.as_ref(), &target_email)
        .await?
        .ok_or_else(|| {
            warn!(target = %target_email, "trial target not found");
            AppError::user_not_found(&target_email)
        })?;

    let mut metadata = user.user_metadata.clone();
    metadata.insert(TRIAL_DAYS_KEY.into(), Value::from(days));
    state.identity.update_user_metadata(user.id, metadata).await?;

    info!(target = %target_email, days, by = %caller.email, "trial length set");
    Ok(days)
}
