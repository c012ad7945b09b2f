//! LocalBlobStore: filesystem-backed blob storage for development and tests.
//!
//! Blobs are stored flat inside `root/{container}/`, keyed by the SHA-256 of
//! their name: `{key}.blob` holds the payload and `{key}.json` records the
//! real name and content type. Any valid blob name therefore maps to one
//! file, and `a` and `a/b` can coexist. Temp files are written under
//! `root/.tmp/`, which is never a valid container name.

use super::blob_store::{BlobStore, StoreError, StoreResult};
use crate::models::blob::BlobItem;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

const TMP_DIR: &str = ".tmp";
const BLOB_EXT: &str = "blob";
const SIDECAR_EXT: &str = "json";

#[derive(Serialize, Deserialize)]
struct Sidecar {
    name: String,
    content_type: String,
}

#[derive(Clone, Debug)]
pub struct LocalBlobStore {
    /// Base directory on disk where containers are stored.
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn container_root(&self, container: &str) -> PathBuf {
        self.root.join(container)
    }

    fn blob_key(blob_name: &str) -> String {
        Sha256::digest(blob_name.as_bytes())
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }

    fn blob_path(&self, container: &str, blob_name: &str) -> PathBuf {
        self.container_root(container)
            .join(format!("{}.{BLOB_EXT}", Self::blob_key(blob_name)))
    }

    fn sidecar_path(&self, container: &str, blob_name: &str) -> PathBuf {
        self.container_root(container)
            .join(format!("{}.{SIDECAR_EXT}", Self::blob_key(blob_name)))
    }

    /// Write `bytes` to a temp file under `root/.tmp`, fsync it, then rename
    /// it over `path`.
    async fn write_atomic(&self, path: &Path, bytes: &[u8]) -> StoreResult<()> {
        let tmp_dir = self.root.join(TMP_DIR);
        fs::create_dir_all(&tmp_dir).await?;
        let tmp_path = tmp_dir.join(Uuid::new_v4().to_string());

        let result = async {
            let mut file = File::create(&tmp_path).await?;
            file.write_all(bytes).await?;
            file.flush().await?;
            file.sync_all().await?;
            fs::rename(&tmp_path, path).await
        }
        .await;

        if let Err(err) = result {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(err));
        }
        Ok(())
    }

    /// Read one sidecar and the size and mtime of its payload. `None` when
    /// either half is missing, which happens while an upload is in flight.
    async fn read_item(sidecar_path: &Path) -> StoreResult<Option<BlobItem>> {
        let raw = match fs::read(sidecar_path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let sidecar: Sidecar = serde_json::from_slice(&raw)?;

        let meta = match fs::metadata(sidecar_path.with_extension(BLOB_EXT)).await {
            Ok(meta) => meta,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        Ok(Some(BlobItem {
            name: sidecar.name,
            size: meta.len(),
            last_modified: meta.modified().ok().map(DateTime::<Utc>::from),
            content_type: Some(sidecar.content_type),
        }))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    fn kind(&self) -> &'static str {
        "local"
    }

    /// The payload is renamed into place before its sidecar, so a listing
    /// never reports a blob whose content is not there yet.
    async fn upload(
        &self,
        container: &str,
        blob_name: &str,
        content: Bytes,
        content_type: &str,
    ) -> StoreResult<String> {
        fs::create_dir_all(self.container_root(container)).await?;

        let path = self.blob_path(container, blob_name);
        self.write_atomic(&path, &content).await?;

        let sidecar = serde_json::to_vec(&Sidecar {
            name: blob_name.to_string(),
            content_type: content_type.to_string(),
        })?;
        self.write_atomic(&self.sidecar_path(container, blob_name), &sidecar)
            .await?;

        debug!(
            "wrote {} bytes for {}/{} to {}",
            content.len(),
            container,
            blob_name,
            path.display()
        );
        Ok(format!("file://{}", path.display()))
    }

    async fn list(&self, container: &str, prefix: Option<&str>) -> StoreResult<Vec<BlobItem>> {
        let mut entries = match fs::read_dir(self.container_root(container)).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(StoreError::ContainerNotFound(container.to_string()));
            }
            Err(err) => return Err(StoreError::Io(err)),
        };

        let mut blobs = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(SIDECAR_EXT) {
                continue;
            }
            let Some(item) = Self::read_item(&path).await? else {
                continue;
            };
            if prefix.is_some_and(|p| !item.name.starts_with(p)) {
                continue;
            }
            blobs.push(item);
        }

        blobs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(blobs)
    }

    async fn download(&self, container: &str, blob_name: &str) -> StoreResult<Bytes> {
        let path = self.blob_path(container, blob_name);
        match fs::read(&path).await {
            Ok(bytes) => Ok(Bytes::from(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(StoreError::BlobNotFound {
                container: container.to_string(),
                blob: blob_name.to_string(),
            }),
            Err(err) => Err(StoreError::Io(err)),
        }
    }

    /// Best-effort write/read/delete against the root directory.
    async fn check_ready(&self) -> StoreResult<()> {
        let tmp_path = self.root.join(format!(".ready-{}", Uuid::new_v4()));
        fs::write(&tmp_path, b"ready").await?;
        let read_back = fs::read(&tmp_path).await;
        let _ = fs::remove_file(&tmp_path).await;
        if read_back? != b"ready" {
            return Err(StoreError::Io(io::Error::new(
                ErrorKind::Other,
                "file content mismatch",
            )));
        }
        Ok(())
    }
}
