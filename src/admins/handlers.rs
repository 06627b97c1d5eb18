use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{AdminAddedResponse, AdminEmailRequest, AdminListResponse, MessageResponse},
    services,
};
use crate::{access::Caller, error::AppError, payload::Payload, state::AppState};

pub fn admin_routes() -> Router<AppState> {
    Router::new().route(
        "/admins",
        get(list_admins).post(add_admin).delete(remove_admin),
    )
}

fn required_email(body: AdminEmailRequest) -> Result<String, AppError> {
    body.email
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| AppError::invalid("Email is required"))
}

#[instrument(skip(state, caller), fields(caller = %caller.email))]
pub async fn list_admins(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<AdminListResponse>, AppError> {
    let admins = services::list_admins(&state, &caller).await?;
    Ok(Json(AdminListResponse { admins }))
}

#[instrument(skip(state, caller, body), fields(caller = %caller.email))]
pub async fn add_admin(
    State(state): State<AppState>,
    caller: Caller,
    Payload(body): Payload<AdminEmailRequest>,
) -> Result<Json<AdminAddedResponse>, AppError> {
    let email = required_email(body)?;
    let admin = services::add_admin(&state, &caller, &email).await?;
    Ok(Json(AdminAddedResponse {
        message: "Admin added successfully".into(),
        admin,
    }))
}

#[instrument(skip(state, caller, body), fields(caller = %caller.email))]
pub async fn remove_admin(
    State(state): State<AppState>,
    caller: Caller,
    Payload(body): Payload<AdminEmailRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let email = required_email(body)?;
    services::remove_admin(&state, &caller, &email).await?;
    Ok(Json(MessageResponse {
        message: "Admin removed successfully".into(),
    }))
}
