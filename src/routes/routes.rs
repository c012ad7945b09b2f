//! Defines routes for the health and data lake endpoints.
//!
//! ## Structure
//! - **Service endpoints**
//!   - `GET  /`       : service name and endpoint list
//!   - `GET  /health` : liveness
//!   - `GET  /status` : service and platform details
//!   - `GET  /ready`  : readiness, checks the blob store
//!
//! - **Data lake endpoints**
//!   - `POST /datalake/upload`  : upload a blob from a JSON body
//!   - `GET  /datalake/list`    : list blobs (`?container=&prefix=`)
//!   - `GET  /datalake/download`: read a blob (`?container=&blob_name=`)
//!
//! Every route is also reachable under `/api`, the prefix function hosts
//! put in front of HTTP triggers. Unknown paths and wrong methods answer
//! with the same JSON error body as the handlers.

use crate::{
    handlers::{
        datalake_handlers::{download_blob, list_blobs, upload_blob},
        fallback_handlers::{method_not_allowed, not_found},
        health_handlers::{health, ready, root, status},
    },
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

/// Paths advertised by `/` and `/status`.
pub const ENDPOINTS: &[&str] = &[
    "/",
    "/health",
    "/status",
    "/ready",
    "/datalake/upload",
    "/datalake/list",
    "/datalake/download",
];

pub const API_PREFIX: &str = "/api";

/// Build and return the router for all routes.
///
/// The router carries shared state (`AppState`) to all handlers; request
/// bodies larger than `max_body_bytes` are rejected with 413.
pub fn routes(max_body_bytes: usize) -> Router<AppState> {
    let service = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/ready", get(ready))
        .route("/datalake/upload", post(upload_blob))
        .route("/datalake/list", get(list_blobs))
        .route("/datalake/download", get(download_blob))
        .method_not_allowed_fallback(method_not_allowed);

    service
        .clone()
        .nest(API_PREFIX, service)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(max_body_bytes))
}
