//! Storage backends and the pieces used to reach them.

pub mod azure_blob_store;
pub mod blob_store;
pub mod connection_string;
pub mod local_blob_store;
pub mod validation;

use crate::config::{AppConfig, StorageSettings};
use anyhow::{Context, Result};
use azure_blob_store::AzureBlobStore;
use blob_store::BlobStore;
use local_blob_store::LocalBlobStore;
use std::sync::Arc;

/// Build the blob store described by `config.storage`; `None` when storage is
/// not configured.
pub fn build_store(config: &AppConfig) -> Result<Option<Arc<dyn BlobStore>>> {
    let store: Arc<dyn BlobStore> = match &config.storage {
        StorageSettings::None => return Ok(None),
        StorageSettings::Local { root } => {
            std::fs::create_dir_all(root)
                .with_context(|| format!("creating local storage root {}", root.display()))?;
            Arc::new(LocalBlobStore::new(root.clone()))
        }
        StorageSettings::Azure {
            endpoint,
            account,
            auth,
        } => Arc::new(AzureBlobStore::new(
            endpoint,
            account.clone(),
            auth.clone(),
            config.default_container.clone(),
        )),
    };
    Ok(Some(store))
}
