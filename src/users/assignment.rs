use tracing::{info, warn};

use super::repo::RoleBadge;
use crate::{
    access::{Caller, Capability},
    error::AppError,
    identity::{find_by_email, DirectoryUser},
    roles::{default_role_color, FALLBACK_ROLE_COLOR},
    state::AppState,
    validate::{is_valid_color, normalize_email},
};

#[derive(Debug, Clone, PartialEq)]
pub struct RoleAssignment {
    pub email: String,
    pub badge: RoleBadge,
}

/// Built-in roles always get their canonical color; anything else keeps the requested
/// one, or the fallback when none was sent.
pub(crate) fn resolve_color(role: &str, requested: Option<&str>) -> Result<String, AppError> {
    if let Some(color) = default_role_color(role) {
        return Ok(color.to_string());
    }
    match requested.map(str::trim).filter(|c| !c.is_empty()) {
        Some(color) if is_valid_color(color) => Ok(color.to_string()),
        Some(color) => Err(AppError::invalid(format!("Invalid role color \"{color}\""))),
        None => Ok(FALLBACK_ROLE_COLOR.to_string()),
    }
}

async fn target_user(state: &AppState, email: &str) -> Result<DirectoryUser, AppError> {
    find_by_email(state.identity.as_ref(), email)
        .await?
        .ok_or_else(|| {
            warn!(target = %email, "role target not found");
            AppError::user_not_found(email)
        })
}

pub async fn set_role(
    state: &AppState,
    caller: &Caller,
    target_email: &str,
    role: &str,
    requested_color: Option<&str>,
) -> Result<RoleAssignment, AppError> {
    caller.require(Capability::AssignRoles, &state.config.policy)?;

    let email = normalize_email(target_email);
    let role = role.trim();
    if email.is_empty() || role.is_empty() {
        return Err(AppError::invalid("Missing targetEmail or role"));
    }
    let color = resolve_color(role, requested_color)?;
    let user = target_user(state, &email).await?;

    let badge = RoleBadge {
        role: role.to_string(),
        color,
    };
    state.profiles.set_badge(user.id, Some(&badge)).await?;
    info!(target = %email, role = %badge.role, color = %badge.color, by = %caller.email, "role set");
    Ok(RoleAssignment { email, badge })
}

pub async fn clear_role(
    state: &AppState,
    caller: &Caller,
    target_email: &str,
) -> Result<String, AppError> {
    caller.require(Capability::AssignRoles, &state.config.policy)?;

    let email = normalize_email(target_email);
    if email.is_empty() {
        return Err(AppError::invalid("Missing targetEmail"));
    }
    let user = target_user(state, &email).await?;
    state.profiles.set_badge(user.id, None).await?;
    info!(target = %email, by = %caller.email, "role cleared");
    Ok(email)
}
