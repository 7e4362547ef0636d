//! Upload pipeline: ships item payloads to the configured blob store.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::{EffectiveSettings, keys};
use crate::engine::{EngineError, Item};
use crate::storage::StorageClient;

use super::{ItemPipeline, object_name};

/// Uploads every item payload to the blob store.
///
/// Items without a payload or source URL pass through untouched, later
/// stages may still want them.
pub struct BlobUploadPipeline {
    storage: StorageClient,
    prefix: Option<String>,
}

impl BlobUploadPipeline {
    pub fn new(storage: StorageClient, prefix: Option<String>) -> Self {
        Self { storage, prefix }
    }

    pub fn from_settings(settings: &EffectiveSettings) -> Result<Self, EngineError> {
        let storage = StorageClient::from_settings(settings)
            .map_err(|e| EngineError::Storage(e.to_string()))?;
        let prefix = settings.get_str(keys::BLOB_PREFIX).map(str::to_string);
        Ok(Self::new(storage, prefix))
    }

    fn key_for(&self, url: &str) -> String {
        let name = object_name(url);
        match &self.prefix {
            Some(prefix) => format!("{}/{}", prefix.trim_end_matches('/'), name),
            None => name,
        }
    }
}

#[async_trait]
impl ItemPipeline for BlobUploadPipeline {
    fn name(&self) -> &'static str {
        "BlobUploadPipeline"
    }

    async fn process_item(&self, item: Item) -> Result<Option<Item>, EngineError> {
        let Some(payload) = item.payload.clone() else {
            debug!("Item has no payload, passing through");
            return Ok(Some(item));
        };
        let Some(url) = item.source_url.as_deref() else {
            debug!("Item has no source URL, passing through");
            return Ok(Some(item));
        };

        let key = self.key_for(url);
        let meta = self
            .storage
            .upload(&key, payload)
            .await
            .map_err(|e| EngineError::Pipeline(self.name().to_string(), e.to_string()))?;

        info!(key = %meta.key, size = meta.size, "Item payload uploaded");
        Ok(Some(item))
    }
}
