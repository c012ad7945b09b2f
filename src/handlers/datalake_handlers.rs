//! HTTP handlers for data lake uploads, listings and downloads.
//! Storage concerns are delegated to the configured `BlobStore`; every
//! storage failure is logged here and surfaced as a JSON error.

use crate::{
    errors::AppError,
    models::datalake::{
        DEFAULT_UPLOAD_CONTENT_TYPE, DownloadQuery, DownloadResponse, ListQuery, ListResponse,
        UploadRequest, UploadResponse,
    },
    services::blob_store::StoreError,
    state::AppState,
};
use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{BytesRejection, QueryRejection},
    },
};
use bytes::Bytes;
use chrono::Utc;
use serde_json::Value;
use tracing::{error, info};

/// `POST /datalake/upload`: store `content` as `container/blob_name`.
pub async fn upload_blob(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    info!("data lake upload requested");

    let body = body?;
    let store = state.require_store()?;
    let request = parse_upload_body(&body)?;

    let (blob_name, content) = match (request.blob_name, request.content) {
        (Some(name), Some(content)) if !name.is_empty() && !content.is_empty() => {
            (name, content)
        }
        _ => return Err(AppError::bad_request("blob_name and content are required")),
    };
    let container = state.container(request.container)?;
    state.blob_name(&blob_name)?;
    let content_type = request
        .content_type
        .filter(|ct| !ct.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_UPLOAD_CONTENT_TYPE.to_string());

    let blob_url = store
        .upload(&container, &blob_name, Bytes::from(content), &content_type)
        .await
        .map_err(|err| {
            error!("Upload failed: {}", err);
            AppError::internal(format!("Upload failed: {err}"))
        })?;

    info!("uploaded {} to {}", blob_name, container);
    Ok(Json(UploadResponse {
        status: "success",
        message: format!("File {blob_name} uploaded successfully to {container}"),
        blob_url,
    }))
}

/// `GET /datalake/list?container=&prefix=`: list blobs in a container.
pub async fn list_blobs(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<ListResponse>, AppError> {
    info!("data lake listing requested");

    let Query(q) = query?;
    let store = state.require_store()?;
    let container = state.container(q.container)?;
    let prefix = q.prefix.filter(|p| !p.is_empty());

    let blobs = store
        .list(&container, prefix.as_deref())
        .await
        .map_err(|err| {
            error!("List operation failed: {}", err);
            AppError::internal(format!("List operation failed: {err}"))
        })?;

    info!("listed {} blobs in {}", blobs.len(), container);
    Ok(Json(ListResponse::success(container, blobs)))
}

/// `GET /datalake/download?container=&blob_name=`: read a blob as text.
pub async fn download_blob(
    State(state): State<AppState>,
    query: Result<Query<DownloadQuery>, QueryRejection>,
) -> Result<Json<DownloadResponse>, AppError> {
    info!("data lake download requested");

    let Query(q) = query?;
    let store = state.require_store()?;
    let blob_name = q
        .blob_name
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::bad_request("blob_name is required"))?;
    let container = state.container(q.container)?;
    state.blob_name(&blob_name)?;

    let bytes = match store.download(&container, &blob_name).await {
        Ok(bytes) => bytes,
        Err(StoreError::BlobNotFound { .. } | StoreError::ContainerNotFound(_)) => {
            return Err(AppError::not_found(format!(
                "File {blob_name} not found in container {container}"
            )));
        }
        Err(err) => {
            error!("Download failed: {}", err);
            return Err(AppError::internal(format!("Download failed: {err}")));
        }
    };

    Ok(Json(DownloadResponse {
        size: bytes.len(),
        content: String::from_utf8_lossy(&bytes).into_owned(),
        container,
        blob_name,
        timestamp: Utc::now(),
    }))
}

/// An absent, unparsable, non-object or empty body is "missing"; an object
/// with mistyped fields is invalid.
fn parse_upload_body(body: &[u8]) -> Result<UploadRequest, AppError> {
    let missing = || AppError::bad_request("Request body is required");

    let value: Value = serde_json::from_slice(body).map_err(|_| missing())?;
    match &value {
        Value::Object(map) if !map.is_empty() => {}
        _ => return Err(missing()),
    }

    serde_json::from_value(value)
        .map_err(|err| AppError::bad_request(format!("Invalid request body: {err}")))
}
