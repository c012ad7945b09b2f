//! JSON answers for requests no route accepts.

use crate::errors::AppError;
use axum::{
    extract::OriginalUri,
    http::{Method, StatusCode},
};
use tracing::debug;

/// Unknown path.
pub async fn not_found(OriginalUri(uri): OriginalUri) -> AppError {
    debug!("no route for {}", uri.path());
    AppError::not_found(format!("No route for {}", uri.path()))
}

/// Known path, wrong method. Paths under `/api` are reported in full.
pub async fn method_not_allowed(method: Method, OriginalUri(uri): OriginalUri) -> AppError {
    AppError::new(
        StatusCode::METHOD_NOT_ALLOWED,
        format!("Method {method} is not allowed for {}", uri.path()),
    )
}
