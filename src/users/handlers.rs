use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::instrument;

use super::{
    assignment,
    directory::{self, ListQuery, UserListing},
    dto::{
        BanRequest, MagicLinkResponse, MessageResponse, SetRoleRequest, SetRoleResponse,
        SetTrialRequest, TargetRequest, UserActionResponse,
    },
    moderation, trial,
};
use crate::{access::Caller, error::AppError, payload::Payload, state::AppState};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/role", post(set_role).delete(clear_role))
        .route("/users/trial", post(set_trial))
        .route("/users/ban", post(ban_user))
        .route("/users/impersonate", post(impersonate))
        .route("/users/recovery", post(send_recovery))
}

fn target(email: Option<String>) -> Result<String, AppError> {
    email
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| AppError::invalid("Missing targetEmail"))
}

#[instrument(skip(state, caller, query), fields(caller = %caller.email))]
pub async fn list_users(
    State(state): State<AppState>,
    caller: Caller,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<UserListing>, AppError> {
    let Query(query) = query.map_err(|rejection| AppError::invalid(rejection.body_text()))?;
    let listing = directory::list_users(&state, &caller, query, OffsetDateTime::now_utc()).await?;
    Ok(Json(listing))
}

#[instrument(skip(state, caller, body), fields(caller = %caller.email))]
pub async fn set_role(
    State(state): State<AppState>,
    caller: Caller,
    Payload(body): Payload<SetRoleRequest>,
) -> Result<Json<SetRoleResponse>, AppError> {
    let (Some(email), Some(role)) = (body.target_email, body.role) else {
        return Err(AppError::invalid("Missing targetEmail or role"));
    };
    let assigned =
        assignment::set_role(&state, &caller, &email, &role, body.role_color.as_deref()).await?;
    Ok(Json(SetRoleResponse {
        message: format!("Role updated to {} successfully", assigned.badge.role),
        user: assigned.email,
        role: assigned.badge.role,
        role_color: assigned.badge.color,
    }))
}

#[instrument(skip(state, caller, body), fields(caller = %caller.email))]
pub async fn clear_role(
    State(state): State<AppState>,
    caller: Caller,
    Payload(body): Payload<TargetRequest>,
) -> Result<Json<UserActionResponse>, AppError> {
    let email = assignment::clear_role(&state, &caller, &target(body.target_email)?).await?;
    Ok(Json(UserActionResponse {
        message: format!("Role deleted successfully for {email}"),
        user: email,
    }))
}

#[instrument(skip(state, caller, body), fields(caller = %caller.email))]
pub async fn set_trial(
    State(state): State<AppState>,
    caller: Caller,
    Payload(body): Payload<SetTrialRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let email = target(body.target_email)?;
    let days = trial::set_trial_days(&state, &caller, &email, &body.days).await?;
    Ok(Json(MessageResponse {
        message: format!(
            "Trial for {} has been set to {days} days.",
            email.trim().to_lowercase()
        ),
    }))
}

#[instrument(skip(state, caller, body), fields(caller = %caller.email))]
pub async fn ban_user(
    State(state): State<AppState>,
    caller: Caller,
    Payload(body): Payload<BanRequest>,
) -> Result<Json<UserActionResponse>, AppError> {
    let email = target(body.target_email)?;
    let banned = moderation::ban_user(&state, &caller, &email, body.duration.as_deref()).await?;
    Ok(Json(UserActionResponse {
        message: "User banned successfully".into(),
        user: banned,
    }))
}

#[instrument(skip(state, caller, body), fields(caller = %caller.email))]
pub async fn impersonate(
    State(state): State<AppState>,
    caller: Caller,
    Payload(body): Payload<TargetRequest>,
) -> Result<Json<MagicLinkResponse>, AppError> {
    let link = moderation::impersonate(&state, &caller, &target(body.target_email)?).await?;
    Ok(Json(MagicLinkResponse {
        message: "Magic link generated".into(),
        magic_link: link,
    }))
}

#[instrument(skip(state, caller, body), fields(caller = %caller.email))]
pub async fn send_recovery(
    State(state): State<AppState>,
    caller: Caller,
    Payload(body): Payload<TargetRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let email = moderation::send_recovery(&state, &caller, &target(body.target_email)?).await?;
    Ok(Json(MessageResponse {
        message: format!("Recovery email sent to {email}"),
    }))
}
