//! Download pipeline: persists each item's source file under a local
//! file store, re-downloading only once the stored copy expires.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use tracing::{debug, info};

use crate::config::{DEFAULT_FILES_STORE, EffectiveSettings, keys};
use crate::engine::{EngineError, Fetcher, Item};
use crate::storage::StorageClient;

use super::{ItemPipeline, object_name};

const SECONDS_PER_DAY: i64 = 86_400;

/// Stores each item's source file in the `files_store` directory.
///
/// A file already present is only fetched again once it is older than
/// `files_expires` days; zero means stored files never expire.
pub struct FileDownloadPipeline {
    store: StorageClient,
    fetcher: Fetcher,
    expires_days: u64,
}

impl FileDownloadPipeline {
    pub fn from_settings(settings: &EffectiveSettings) -> Result<Self, EngineError> {
        let dir = settings
            .get_str(keys::FILES_STORE)
            .unwrap_or(DEFAULT_FILES_STORE);
        let store = StorageClient::local(dir).map_err(|e| EngineError::Storage(e.to_string()))?;
        let fetcher = Fetcher::from_settings(settings)?;
        let expires_days = settings.get_u64(keys::FILES_EXPIRES).unwrap_or(0);

        Ok(Self {
            store,
            fetcher,
            expires_days,
        })
    }

    /// Whether a stored file is recent enough to skip the download.
    async fn is_fresh(&self, key: &str) -> Result<bool, EngineError> {
        let modified = self
            .store
            .modified(key)
            .await
            .map_err(|e| EngineError::Storage(e.to_string()))?;
        let Some(modified) = modified else {
            return Ok(false);
        };

        if self.expires_days == 0 {
            return Ok(true);
        }

        // An expiry window too wide to express in seconds never lapses
        let Some(window_secs) = i64::try_from(self.expires_days)
            .ok()
            .and_then(|days| days.checked_mul(SECONDS_PER_DAY))
        else {
            return Ok(true);
        };

        // A future timestamp (clock skew) counts as fresh
        let age_secs = Utc::now().signed_duration_since(modified).num_seconds();
        Ok(age_secs < window_secs)
    }
}

#[async_trait]
impl ItemPipeline for FileDownloadPipeline {
    fn name(&self) -> &'static str {
        "FileDownloadPipeline"
    }

    async fn process_item(&self, item: Item) -> Result<Option<Item>, EngineError> {
        let Some(url) = item.source_url.clone() else {
            debug!("Item has no source URL, passing through");
            return Ok(Some(item));
        };

        let key = object_name(&url);

        if self.is_fresh(&key).await? {
            debug!(key, "Stored file still fresh, skipping download");
            return Ok(Some(item));
        }

        let payload: Bytes = match &item.payload {
            Some(payload) => payload.clone(),
            None => self.fetcher.fetch(&url).await?,
        };

        let meta = self
            .store
            .upload(&key, payload)
            .await
            .map_err(|e| EngineError::Pipeline(self.name().to_string(), e.to_string()))?;

        info!(key = %meta.key, size = meta.size, url = %url, "File stored");
        Ok(Some(item))
    }
}
