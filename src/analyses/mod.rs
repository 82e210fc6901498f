pub mod dto;
pub mod extract;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .merge(handlers::read_routes())
        .merge(handlers::write_routes(max_upload_bytes))
}
