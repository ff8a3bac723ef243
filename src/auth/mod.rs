use crate::state::AppState;
use axum::Router;

pub(crate) mod dto;
pub(crate) mod extract;
pub mod handlers;
pub(crate) mod jwt;
pub(crate) mod password;
pub(crate) mod repo;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
