//! Root, health, status & readiness handlers.
//!
//! - GET /        -> service name and endpoint list
//! - GET /health  -> liveness, never performs I/O
//! - GET /status  -> service and platform details
//! - GET /ready   -> readiness that checks the blob store

use crate::{routes::routes::ENDPOINTS, state::AppState};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, warn};

pub const SERVICE_NAME: &str = "basic-healthcare-functions";
pub const SERVICE_DISPLAY_NAME: &str = "Basic Healthcare Functions";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
const RUNTIME: &str = "Rust";

/// `GET /`
pub async fn root() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(RootResponse {
            service: SERVICE_DISPLAY_NAME,
            endpoints: ENDPOINTS,
        }),
    )
}

/// `GET /health`
///
/// Very small liveness check, always returns 200 OK.
/// This endpoint should be cheap and never perform I/O.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    info!("health check requested");
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy",
            message: format!("{SERVICE_DISPLAY_NAME} - {RUNTIME} is running"),
            timestamp: Utc::now(),
            service: SERVICE_NAME,
            version: VERSION,
            environment: state.environment.clone(),
        }),
    )
}

/// `GET /status`
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    info!("status check requested");
    (
        StatusCode::OK,
        Json(StatusResponse {
            status: "operational",
            service: SERVICE_NAME,
            version: VERSION,
            timestamp: Utc::now(),
            runtime: "rust",
            platform: format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH),
            environment: state.environment.clone(),
            storage_backend: state.storage_backend(),
            endpoints: ENDPOINTS,
        }),
    )
}

/// `GET /ready`
///
/// Readiness check that asks the configured blob store to prove it is
/// reachable. HTTP 200 when the check passes, HTTP 503 when it fails or no
/// storage is configured.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let storage_check = match &state.store {
        None => CheckStatus {
            ok: false,
            backend: "none",
            error: Some("storage not configured".into()),
        },
        Some(store) => match store.check_ready().await {
            Ok(()) => CheckStatus {
                ok: true,
                backend: store.kind(),
                error: None,
            },
            Err(err) => {
                warn!("storage readiness check failed: {}", err);
                CheckStatus {
                    ok: false,
                    backend: store.kind(),
                    error: Some(err.to_string()),
                }
            }
        },
    };

    let overall_ok = storage_check.ok;
    let mut checks = HashMap::new();
    checks.insert("storage", storage_check);

    let body = ReadyResponse {
        status: if overall_ok { "ok" } else { "error" },
        timestamp: Utc::now(),
        checks,
    };

    let status = if overall_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

#[derive(Serialize)]
struct RootResponse {
    service: &'static str,
    endpoints: &'static [&'static str],
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    message: String,
    timestamp: DateTime<Utc>,
    service: &'static str,
    version: &'static str,
    environment: String,
}

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    timestamp: DateTime<Utc>,
    runtime: &'static str,
    platform: String,
    environment: String,
    storage_backend: &'static str,
    endpoints: &'static [&'static str],
}

#[derive(Serialize)]
struct ReadyResponse {
    status: &'static str,
    timestamp: DateTime<Utc>,
    checks: HashMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    backend: &'static str,
    error: Option<String>,
}
