//! Basic Healthcare Functions: health/status endpoints and data lake
//! upload, list and download handlers over Azure Blob Storage or a local
//! directory.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::Router;
use state::AppState;

/// The complete application router with state attached.
pub fn app(state: AppState, max_body_bytes: usize) -> Router {
    routes::routes::routes(max_body_bytes).with_state(state)
}
