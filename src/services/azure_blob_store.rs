//! AzureBlobStore: Azure Blob Storage through the `object_store` Azure client.
//!
//! An `object_store` client is scoped to one container, so clients are built
//! on first use and kept per container. Each client owns its credential,
//! including the managed identity token cache.

use super::blob_store::{BlobStore, StoreError, StoreResult};
use crate::{config::AzureAuth, models::blob::BlobItem};
use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::{
    Attribute, Attributes, ClientOptions, ObjectMeta, ObjectStore, PutOptions, PutPayload,
    RetryConfig,
    azure::{AzureConfigKey, MicrosoftAzure, MicrosoftAzureBuilder},
    path::Path,
};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::sync::Mutex;
use tracing::debug;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Characters left as-is inside a blob path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Debug)]
pub struct AzureBlobStore {
    /// Blob service endpoint without trailing slash or query string.
    endpoint: String,
    account: String,
    auth: AzureAuth,
    /// Container listed by the readiness check.
    ready_container: String,
    clients: Mutex<HashMap<String, Arc<MicrosoftAzure>>>,
}

impl AzureBlobStore {
    pub fn new(
        endpoint: &str,
        account: impl Into<String>,
        auth: AzureAuth,
        ready_container: impl Into<String>,
    ) -> Self {
        let endpoint = endpoint
            .split('?')
            .next()
            .unwrap_or(endpoint)
            .trim_end_matches('/')
            .to_string();
        Self {
            endpoint,
            account: account.into(),
            auth,
            ready_container: ready_container.into(),
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Public URL of a blob, without any SAS query string.
    pub fn blob_url(&self, container: &str, blob_name: &str) -> String {
        let encoded = blob_path(blob_name)
            .parts()
            .map(|part| utf8_percent_encode(part.as_ref(), PATH_SEGMENT).to_string())
            .collect::<Vec<_>>()
            .join("/");
        format!("{}/{}/{}", self.endpoint, container, encoded)
    }

    async fn client(&self, container: &str) -> StoreResult<Arc<MicrosoftAzure>> {
        let mut clients = self.clients.lock().await;
        if let Some(client) = clients.get(container) {
            return Ok(Arc::clone(client));
        }
        let client = Arc::new(self.build_client(container)?);
        debug!("built blob client for container {}", container);
        clients.insert(container.to_string(), Arc::clone(&client));
        Ok(client)
    }

    fn build_client(&self, container: &str) -> StoreResult<MicrosoftAzure> {
        let options = ClientOptions::new()
            .with_timeout(HTTP_TIMEOUT)
            .with_allow_http(self.endpoint.starts_with("http://"));
        let builder = MicrosoftAzureBuilder::new()
            .with_account(self.account.clone())
            .with_container_name(container)
            .with_endpoint(self.endpoint.clone())
            .with_client_options(options)
            .with_retry(RetryConfig {
                max_retries: 0,
                ..RetryConfig::default()
            });

        let builder = match &self.auth {
            AzureAuth::SharedKey(key) => builder.with_access_key(key.clone()),
            AzureAuth::Sas(sas) => builder.with_config(AzureConfigKey::SasKey, sas.clone()),
            AzureAuth::ManagedIdentity {
                identity_endpoint,
                client_id,
            } => {
                let builder = match identity_endpoint {
                    Some(endpoint) => builder.with_msi_endpoint(endpoint.clone()),
                    None => builder,
                };
                match client_id {
                    Some(id) => builder.with_client_id(id.clone()),
                    None => builder,
                }
            }
        };
        Ok(builder.build()?)
    }
}

/// Object path for a validated blob name. Characters `object_store` does not
/// allow in a path segment are percent-encoded by `Path::from`.
fn blob_path(blob_name: &str) -> Path {
    Path::from(blob_name)
}

/// Inverse of [`blob_path`].
fn blob_name(location: &Path) -> String {
    location
        .parts()
        .map(|part| percent_decode_str(part.as_ref()).decode_utf8_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn blob_item(meta: ObjectMeta) -> BlobItem {
    BlobItem {
        name: blob_name(&meta.location),
        size: meta.size as u64,
        last_modified: Some(meta.last_modified),
        content_type: None,
    }
}

fn not_found_as(err: object_store::Error, not_found: impl FnOnce() -> StoreError) -> StoreError {
    match err {
        object_store::Error::NotFound { .. } => not_found(),
        other => StoreError::ObjectStore(other),
    }
}

#[async_trait]
impl BlobStore for AzureBlobStore {
    fn kind(&self) -> &'static str {
        "azure"
    }

    async fn upload(
        &self,
        container: &str,
        blob_name: &str,
        content: Bytes,
        content_type: &str,
    ) -> StoreResult<String> {
        let client = self.client(container).await?;
        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());
        let options = PutOptions {
            attributes,
            ..PutOptions::default()
        };

        let size = content.len();
        client
            .put_opts(&blob_path(blob_name), PutPayload::from(content), options)
            .await
            .map_err(|err| not_found_as(err, || StoreError::ContainerNotFound(container.to_string())))?;

        debug!("put {} bytes to {}/{}", size, container, blob_name);
        Ok(self.blob_url(container, blob_name))
    }

    /// `object_store` lists by whole path segments, so this lists below the
    /// last `/` of the prefix and filters the rest by name.
    async fn list(&self, container: &str, prefix: Option<&str>) -> StoreResult<Vec<BlobItem>> {
        let client = self.client(container).await?;
        let dir = prefix
            .and_then(|p| p.rsplit_once('/'))
            .map(|(dir, _)| blob_path(dir));

        let metas: Vec<ObjectMeta> = client
            .list(dir.as_ref())
            .try_collect()
            .await
            .map_err(|err| not_found_as(err, || StoreError::ContainerNotFound(container.to_string())))?;

        let mut blobs: Vec<BlobItem> = metas
            .into_iter()
            .map(blob_item)
            .filter(|item| prefix.is_none_or(|p| item.name.starts_with(p)))
            .collect();
        blobs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(blobs)
    }

    async fn download(&self, container: &str, blob_name: &str) -> StoreResult<Bytes> {
        let client = self.client(container).await?;
        let result = client
            .get(&blob_path(blob_name))
            .await
            .map_err(|err| {
                not_found_as(err, || StoreError::BlobNotFound {
                    container: container.to_string(),
                    blob: blob_name.to_string(),
                })
            })?;
        Ok(result.bytes().await?)
    }

    /// Fetch the first listing page of the default container, which needs
    /// both a reachable endpoint and an accepted credential.
    async fn check_ready(&self) -> StoreResult<()> {
        let client = self.client(&self.ready_container).await?;
        let mut listing = client.list(None);
        listing.try_next().await?;
        Ok(())
    }
}
