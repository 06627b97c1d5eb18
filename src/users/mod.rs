pub mod assignment;
pub mod directory;
mod dto;
pub mod handlers;
pub mod moderation;
pub mod repo;
pub mod trial;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::user_routes()
}
