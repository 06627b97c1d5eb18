use tracing::{info, warn};

use crate::{
    access::{Caller, Capability},
    error::AppError,
    identity::{find_by_email, DirectoryUser},
    state::AppState,
    validate::normalize_email,
};

/// Provider ban duration used when the console does not send one. Effectively permanent.
pub const DEFAULT_BAN_DURATION: &str = "876000h";

async fn moderated_target(
    state: &AppState,
    caller: &Caller,
    target_email: &str,
) -> Result<DirectoryUser, AppError> {
    caller.require(Capability::ModerateUsers, &state.config.policy)?;
    let email = normalize_email(target_email);
    if email.is_empty() {
        return Err(AppError::invalid("Missing targetEmail"));
    }
    find_by_email(state.identity.as_ref(), &email)
        .await?
        .ok_or_else(|| AppError::user_not_found(&email))
}

pub async fn ban_user(
    state: &AppState,
    caller: &Caller,
    target_email: &str,
    duration: Option<&str>,
) -> Result<String, AppError> {
    let user = moderated_target(state, caller, target_email).await?;
    if user.id == caller.id {
        warn!(caller = %caller.email, "refused self-ban");
        return Err(AppError::invalid("Cannot ban yourself"));
    }
    let duration = duration
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(DEFAULT_BAN_DURATION);
    state.identity.ban_user(user.id, duration).await?;

    let email = user.email.unwrap_or_default();
    info!(target = %email, %duration, by = %caller.email, "user banned");
    Ok(email)
}

/// Returns a one-time sign-in link for the target account.
pub async fn impersonate(
    state: &AppState,
    caller: &Caller,
    target_email: &str,
) -> Result<String, AppError> {
    let user = moderated_target(state, caller, target_email).await?;
    let email = user.email.unwrap_or_default();
    let link = state.identity.generate_magic_link(&email).await?;
    info!(target = %email, by = %caller.email, "magic link issued");
    Ok(link)
}

pub async fn send_recovery(
    state: &AppState,
    caller: &Caller,
    target_email: &str,
) -> Result<String, AppError> {
    let user = moderated_target(state, caller, target_email).await?;
    let email = user.email.unwrap_or_default();
    state.identity.send_recovery(&email).await?;
    info!(target = %email, by = %caller.email, "recovery email sent");
    Ok(email)
}
