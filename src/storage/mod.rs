//! Object storage abstraction for crawl output
//! Uses Apache Arrow object_store crate

use bytes::Bytes;
use chrono::{DateTime, Utc};
use object_store::{ObjectStore, path::Path as StoragePath};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{EffectiveSettings, keys};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Cannot use store location '{location}': {reason}")]
    InvalidLocation { location: String, reason: String },

    #[error("Unknown blob provider '{0}', expected 'local' or 'memory'")]
    UnknownProvider(String),

    #[error("Object store error: {0}")]
    ObjectStoreError(#[from] object_store::Error),
}

/// Storage result type
pub type Result<T> = std::result::Result<T, StorageError>;

/// Metadata returned after upload
#[derive(Debug, Clone)]
pub struct UploadMetadata {
    pub key: String,
    pub etag: Option<String>,
    pub size: usize,
}

/// Storage client wrapping object_store
#[derive(Debug, Clone)]
pub struct StorageClient {
    store: Arc<dyn ObjectStore>,
    pub location: String,
}

impl StorageClient {
    /// Create new storage client with any object_store backend
    pub fn new(store: Arc<dyn ObjectStore>, location: String) -> Self {
        Self { store, location }
    }

    /// Create in-memory storage for testing/development
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(object_store::memory::InMemory::new()),
            "memory".to_string(),
        )
    }

    /// Storage rooted at a directory on the local filesystem.
    /// The directory is created if it does not exist.
    pub fn local(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();

        std::fs::create_dir_all(dir).map_err(|e| StorageError::InvalidLocation {
            location: dir.display().to_string(),
            reason: e.to_string(),
        })?;

        let store = object_store::local::LocalFileSystem::new_with_prefix(dir)?;
        Ok(Self::new(Arc::new(store), dir.display().to_string()))
    }

    /// Build the client the settings describe.
    ///
    /// `blob_provider` selects the backend: "memory" keeps objects in
    /// process, "local" (the default) writes under the `blob_store`
    /// directory.
    pub fn from_settings(settings: &EffectiveSettings) -> Result<Self> {
        let location = settings.get_str(keys::BLOB_STORE).unwrap_or("crawlbox-blobs");

        match settings.get_str(keys::BLOB_PROVIDER) {
            Some("memory") => Ok(Self::new(
                Arc::new(object_store::memory::InMemory::new()),
                location.to_string(),
            )),
            Some("local") | None => Self::local(location),
            Some(other) => Err(StorageError::UnknownProvider(other.to_string())),
        }
    }

    /// Upload bytes to storage
    pub async fn upload(&self, key: &str, data: Bytes) -> Result<UploadMetadata> {
        let path = StoragePath::from(key);
        let size = data.len();

        let put_result = self.store.put(&path, data.into()).await?;

        tracing::info!(key, size, "Uploaded to storage");

        Ok(UploadMetadata {
            key: key.to_string(),
            etag: put_result.e_tag.clone(),
            size,
        })
    }

    /// Download from storage
    pub async fn download(&self, key: &str) -> Result<Bytes> {
        let path = StoragePath::from(key);

        let result = self.store.get(&path).await?;
        let bytes = result.bytes().await?;

        tracing::debug!(key, size = bytes.len(), "Downloaded from storage");

        Ok(bytes)
    }

    /// Check if key exists
    pub async fn exists(&self, key: &str) -> Result<bool> {
        match self.store.head(&StoragePath::from(key)).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Last-modified timestamp of a stored object, `None` when missing
    pub async fn modified(&self, key: &str) -> Result<Option<DateTime<Utc>>> {
        match self.store.head(&StoragePath::from(key)).await {
            Ok(meta) => Ok(Some(meta.last_modified)),
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
