//! Shared state handed to every handler.

use crate::{
    config::AppConfig,
    errors::AppError,
    services::{
        blob_store::BlobStore,
        validation::{ensure_blob_name, ensure_container_name},
    },
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    /// Configured blob backend, if any.
    pub store: Option<Arc<dyn BlobStore>>,
    pub environment: String,
    pub default_container: String,
    pub allowed_containers: Vec<String>,
}

impl AppState {
    pub fn new(config: &AppConfig, store: Option<Arc<dyn BlobStore>>) -> Self {
        Self {
            store,
            environment: config.environment.clone(),
            default_container: config.default_container.clone(),
            allowed_containers: config.allowed_containers.clone(),
        }
    }

    /// The blob store, or the 500 returned when none is configured.
    pub fn require_store(&self) -> Result<Arc<dyn BlobStore>, AppError> {
        self.store
            .clone()
            .ok_or_else(|| AppError::internal("Storage account URL not configured"))
    }

    pub fn storage_backend(&self) -> &'static str {
        self.store.as_ref().map(|s| s.kind()).unwrap_or("none")
    }

    /// Pick the requested container (or the default) and validate it.
    pub fn container(&self, requested: Option<String>) -> Result<String, AppError> {
        let container = requested
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| self.default_container.clone());
        ensure_container_name(&container, &self.allowed_containers)
            .map_err(|err| AppError::bad_request(err.to_string()))?;
        Ok(container)
    }

    pub fn blob_name(&self, name: &str) -> Result<(), AppError> {
        ensure_blob_name(name).map_err(|err| AppError::bad_request(err.to_string()))
    }
}
