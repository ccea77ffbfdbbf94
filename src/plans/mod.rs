//! Diet plans: the authoring core (validation, meal editing, change
//! tracking, reconciliation, sessions) and the REST surface over Postgres.

pub mod changes;
pub mod dto;
pub mod editor;
pub mod handlers;
pub mod reconcile;
pub mod repo;
mod repo_types;
pub mod session;
pub mod validation;
pub mod vocab;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::read_routes())
        .merge(handlers::write_routes())
}
