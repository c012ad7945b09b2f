//! Request and response bodies for the `/datalake/*` endpoints.

use super::blob::BlobItem;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Content type recorded for uploads that do not specify one.
pub const DEFAULT_UPLOAD_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// JSON body of `POST /datalake/upload`.
#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    /// Target container; falls back to the configured default when absent.
    pub container: Option<String>,
    pub blob_name: Option<String>,
    pub content: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub status: &'static str,
    pub message: String,
    pub blob_url: String,
}

/// Query params accepted by `GET /datalake/list`.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub container: Option<String>,
    pub prefix: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub status: &'static str,
    pub container: String,
    pub blob_count: usize,
    pub blobs: Vec<BlobItem>,
}

impl ListResponse {
    /// Build a successful listing; `blob_count` always mirrors `blobs`.
    pub fn success(container: String, blobs: Vec<BlobItem>) -> Self {
        Self {
            status: "success",
            container,
            blob_count: blobs.len(),
            blobs,
        }
    }
}

/// Query params accepted by `GET /datalake/download`.
#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub container: Option<String>,
    pub blob_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DownloadResponse {
    pub container: String,
    pub blob_name: String,
    pub content: String,
    pub size: usize,
    pub timestamp: DateTime<Utc>,
}
