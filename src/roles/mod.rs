mod defaults;
mod dto;
pub mod handlers;
pub mod repo;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub use defaults::{default_role_color, FALLBACK_ROLE_COLOR};

pub fn router() -> Router<AppState> {
    handlers::role_routes()
}
