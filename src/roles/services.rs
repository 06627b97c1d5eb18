use std::collections::HashSet;

use tracing::{info, warn};

use super::{dto::RoleInput, repo::RoleDefinition};
use crate::{
    access::{Caller, Capability},
    error::AppError,
    state::AppState,
    validate::is_valid_color,
};

pub async fn list_roles(state: &AppState) -> Result<Vec<RoleDefinition>, AppError> {
    state.roles.list().await
}

/// Checks the whole batch before anything is written, so a bad entry never leaves
/// half of an update applied.
pub(crate) fn validate_batch(roles: Vec<RoleInput>) -> Result<Vec<RoleDefinition>, AppError> {
    let mut seen = HashSet::new();
    roles
        .into_iter()
        .map(|r| {
            let name = r.role_name.trim().to_string();
            if name.is_empty() {
                return Err(AppError::invalid("Role name is required"));
            }
            if !seen.insert(name.clone()) {
                return Err(AppError::invalid(format!("Duplicate role \"{name}\" in update")));
            }
            let color = r.color.trim().to_string();
            if !is_valid_color(&color) {
                return Err(AppError::invalid(format!(
                    "Invalid color \"{color}\" for role \"{name}\""
                )));
            }
            Ok(RoleDefinition {
                role_name: name,
                hierarchy_order: r.hierarchy_order,
                color,
                description: r
                    .description
                    .map(|d| d.trim().to_string())
                    .filter(|d| !d.is_empty()),
            })
        })
        .collect()
}

pub async fn update_hierarchy(
    state: &AppState,
    caller: &Caller,
    roles: Vec<RoleInput>,
) -> Result<Vec<RoleDefinition>, AppError> {
    caller.require(Capability::ManageRoleHierarchy, &state.config.policy)?;
    let batch = validate_batch(roles)?;
    if !batch.is_empty() {
        state.roles.upsert_batch(&batch).await?;
        info!(count = batch.len(), by = %caller.email, "role hierarchy updated");
    }
    state.roles.list().await
}

pub async fn delete_definition(
    state: &AppState,
    caller: &Caller,
    role_name: &str,
) -> Result<(), AppError> {
    let policy = &state.config.policy;
    caller.require(Capability::DeleteRoleDefinition, policy)?;

    let role_name = role_name.trim();
    if role_name.is_empty() {
        return Err(AppError::invalid("Missing roleName"));
    }
    if !state.roles.delete(role_name, policy.role_delete_cascade).await? {
        warn!(role = %role_name, "delete of unknown role");
        return Err(AppError::NotFound(format!("Role \"{role_name}\" not found")));
    }
    info!(
        role = %role_name,
        by = %caller.email,
        cascade = policy.role_delete_cascade,
        "role definition deleted"
    );
    Ok(())
}
