//! Who is calling and what they may do.
//!
//! Every privileged operation asks for a [`Capability`]; the admin registry and
//! the caller's hierarchy role are the only two sources of privilege.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::warn;
use uuid::Uuid;

use crate::{
    auth::AuthUser, config::PolicyConfig, error::AppError, state::AppState,
    validate::normalize_email,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ManageAdmins,
    AssignRoles,
    SetTrial,
    ModerateUsers,
    ViewDirectory,
    ManageRoleHierarchy,
    DeleteRoleDefinition,
}

#[derive(Debug, Clone)]
pub struct Caller {
    pub id: Uuid,
    /// Lowercased.
    pub email: String,
    pub is_admin: bool,
    pub role: Option<String>,
}

impl Caller {
    pub async fn resolve(state: &AppState, user: AuthUser) -> Result<Self, AppError> {
        let email = match user.email {
            Some(email) => email,
            None => state
                .identity
                .get_user(user.id)
                .await?
                .and_then(|u| u.email)
                .ok_or_else(|| AppError::Unauthorized("Unknown caller".into()))?,
        };
        let email = normalize_email(&email);
        let is_admin = state.admins.contains(&email).await?;
        let role = state.profiles.badge_of(user.id).await?.map(|b| b.role);
        Ok(Self {
            id: user.id,
            email,
            is_admin,
            role,
        })
    }

    pub fn can(&self, cap: Capability, policy: &PolicyConfig) -> bool {
        match cap {
            Capability::ManageAdmins
            | Capability::AssignRoles
            | Capability::SetTrial
            | Capability::ModerateUsers
            | Capability::ViewDirectory => self.is_admin,
            Capability::ManageRoleHierarchy => self
                .role
                .as_ref()
                .is_some_and(|r| policy.hierarchy_editor_roles.contains(r)),
            Capability::DeleteRoleDefinition => {
                self.role.as_deref() == Some(policy.supreme_role.as_str())
            }
        }
    }

    pub fn require(&self, cap: Capability, policy: &PolicyConfig) -> Result<(), AppError> {
        if self.can(cap, policy) {
            return Ok(());
        }
        warn!(caller = %self.email, ?cap, "capability denied");
        let msg = match cap {
            Capability::ManageAdmins => "Only admins can manage admins".to_string(),
            Capability::AssignRoles => "Only admins can assign roles".to_string(),
            Capability::SetTrial => "Only admins can change trial length".to_string(),
            Capability::ModerateUsers => "Only admins can moderate users".to_string(),
            Capability::ViewDirectory => "Only admins can list users".to_string(),
            Capability::ManageRoleHierarchy => {
                "Insufficient permissions to update role hierarchy".to_string()
            }
            Capability::DeleteRoleDefinition => {
                format!("Only {}s can delete roles", policy.supreme_role)
            }
        };
        Err(AppError::forbidden(msg))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        Caller::resolve(state, user).await
    }
}
