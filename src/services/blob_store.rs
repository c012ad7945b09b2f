//! The storage seam shared by every backend.

use crate::models::blob::BlobItem;
use async_trait::async_trait;
use bytes::Bytes;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("container `{0}` not found")]
    ContainerNotFound(String),
    #[error("blob `{blob}` not found in container `{container}`")]
    BlobNotFound { container: String, blob: String },
    #[error(transparent)]
    ObjectStore(#[from] object_store::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Blob operations the HTTP handlers rely on.
///
/// Implementations are shared across requests behind an `Arc`, so they must
/// be `Send + Sync` and keep any mutable state internally synchronized.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Short backend name reported by `/status` and `/ready`.
    fn kind(&self) -> &'static str;

    /// Write `content` to `container/blob_name`, replacing any existing blob.
    /// Returns the URL of the stored blob.
    async fn upload(
        &self,
        container: &str,
        blob_name: &str,
        content: Bytes,
        content_type: &str,
    ) -> StoreResult<String>;

    /// List the blobs of a container, ordered by name.
    async fn list(&self, container: &str, prefix: Option<&str>) -> StoreResult<Vec<BlobItem>>;

    /// Read a blob's content.
    async fn download(&self, container: &str, blob_name: &str) -> StoreResult<Bytes>;

    /// Cheap connectivity check used by the readiness endpoint.
    async fn check_ready(&self) -> StoreResult<()>;
}
