use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Settings keys the crawl engine understands.
///
/// The map is open: callers can carry any key they like for their own
/// pipelines, these are just the ones the built-in components read.
pub mod keys {
    /// Pipeline activation map: qualified pipeline name -> priority.
    pub const ITEM_PIPELINES: &str = "item_pipelines";
    /// Directory downloaded files are written into.
    pub const FILES_STORE: &str = "files_store";
    /// Re-download window for stored files, in days. Zero disables expiry.
    pub const FILES_EXPIRES: &str = "files_expires";
    /// Log level filter applied inside the worker.
    pub const LOG_LEVEL: &str = "log_level";
    /// Object store backend: "local" or "memory".
    pub const BLOB_PROVIDER: &str = "blob_provider";
    /// Bucket name (or directory, for the local backend) blobs land in.
    pub const BLOB_STORE: &str = "blob_store";
    /// Key prefix prepended to every uploaded object.
    pub const BLOB_PREFIX: &str = "blob_prefix";
    /// User-Agent header sent by the fetcher.
    pub const USER_AGENT: &str = "user_agent";
    /// Per-request timeout for the fetcher, in seconds.
    pub const DOWNLOAD_TIMEOUT: &str = "download_timeout";
    /// Retry budget for transient fetch failures.
    pub const DOWNLOAD_MAX_RETRIES: &str = "download_max_retries";
}

/// Ordered map of crawl settings.
///
/// Values are arbitrary JSON so callers can pass anything their own
/// pipelines understand. Merging overwrites key by key; a nested value
/// replaces the previous one wholesale and is never deep-merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettingsMap(BTreeMap<String, Value>);

impl SettingsMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Insert or replace a single setting.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Overlay `other` on top of this map, key by key.
    pub fn merge(&mut self, other: &SettingsMap) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(Value::as_u64)
    }
}

impl FromIterator<(String, Value)> for SettingsMap {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Frozen settings snapshot handed to a crawl worker.
///
/// Built by the resolver; nothing mutates it afterwards.
#[derive(Debug, Clone)]
pub struct EffectiveSettings {
    project: String,
    settings: SettingsMap,
}

impl EffectiveSettings {
    pub(crate) fn new(project: impl Into<String>, settings: SettingsMap) -> Self {
        Self {
            project: project.into(),
            settings,
        }
    }

    /// Project name the settings were resolved for.
    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.settings.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.settings.get_str(key)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.settings.get_u64(key)
    }

    /// Full settings map, mostly for logging and tests.
    pub fn settings(&self) -> &SettingsMap {
        &self.settings
    }
}
