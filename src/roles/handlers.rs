use axum::{extract::State, routing::get, Json, Router};
use tracing::instrument;

use super::{
    dto::{DeleteRoleRequest, HierarchyResponse, UpdateHierarchyRequest},
    repo::RoleDefinition,
    services,
};
use crate::{
    access::Caller, auth::AuthUser, error::AppError, payload::Payload, state::AppState,
};

pub fn role_routes() -> Router<AppState> {
    Router::new().route(
        "/roles",
        get(list_roles).put(update_hierarchy).delete(delete_definition),
    )
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn list_roles(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<HierarchyResponse<Vec<RoleDefinition>>>, AppError> {
    let roles = services::list_roles(&state).await?;
    Ok(Json(HierarchyResponse::ok(roles)))
}

#[instrument(skip(state, caller, body), fields(caller = %caller.email))]
pub async fn update_hierarchy(
    State(state): State<AppState>,
    caller: Caller,
    Payload(body): Payload<UpdateHierarchyRequest>,
) -> Result<Json<HierarchyResponse<Vec<RoleDefinition>>>, AppError> {
    let roles = body
        .roles
        .ok_or_else(|| AppError::invalid("Invalid roles format"))?;
    let roles = services::update_hierarchy(&state, &caller, roles).await?;
    Ok(Json(HierarchyResponse::ok(roles)))
}

#[instrument(skip(state, caller, body), fields(caller = %caller.email))]
pub async fn delete_definition(
    State(state): State<AppState>,
    caller: Caller,
    Payload(body): Payload<DeleteRoleRequest>,
) -> Result<Json<HierarchyResponse<()>>, AppError> {
    let role_name = body
        .role_name
        .ok_or_else(|| AppError::invalid("Missing roleName"))?;
    services::delete_definition(&state, &caller, &role_name).await?;
    Ok(Json(HierarchyResponse::done()))
}
