//! HTTP fetcher used by pipelines that need payloads

use bytes::Bytes;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::{EffectiveSettings, keys};

use super::EngineError;

/// Fetcher configuration, read from the effective settings
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_retries: 3,
            user_agent: concat!("crawlbox/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl FetchConfig {
    pub fn from_settings(settings: &EffectiveSettings) -> Self {
        let defaults = Self::default();
        Self {
            connect_timeout: defaults.connect_timeout,
            request_timeout: settings
                .get_u64(keys::DOWNLOAD_TIMEOUT)
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            max_retries: settings
                .get_u64(keys::DOWNLOAD_MAX_RETRIES)
                .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
                .unwrap_or(defaults.max_retries),
            user_agent: settings
                .get_str(keys::USER_AGENT)
                .map(str::to_string)
                .unwrap_or(defaults.user_agent),
        }
    }
}

/// HTTP downloader with bounded retries
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self, EngineError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| EngineError::Fetch(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn from_settings(settings: &EffectiveSettings) -> Result<Self, EngineError> {
        Self::new(FetchConfig::from_settings(settings))
    }

    /// Fetch a URL with retry
    pub async fn fetch(&self, url: &str) -> Result<Bytes, EngineError> {
        let mut attempts = 0;

        loop {
            attempts += 1;

            match self.fetch_once(url).await {
                Ok(bytes) => {
                    if attempts > 1 {
                        debug!(url, attempts, "Fetch succeeded after retry");
                    }
                    return Ok(bytes);
                }
                Err(e) => {
                    if attempts >= self.config.max_retries {
                        warn!(url, attempts, error = %e, "Fetch failed after retries");
                        return Err(EngineError::Fetch(format!(
                            "Failed after {} attempts: {}",
                            attempts, e
                        )));
                    }

                    warn!(url, attempts, error = %e, "Fetch failed, retrying");

                    // Exponential backoff: 1s, 2s, 4s
                    let backoff = Duration::from_secs(2u64.saturating_pow(attempts - 1));
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    /// Fetch once (no retry)
    async fn fetch_once(&self, url: &str) -> Result<Bytes, EngineError> {
        debug!(url, "Starting fetch");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| EngineError::Fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::Fetch(format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| EngineError::Fetch(format!("Failed to read body: {}", e)))?;

        debug!(url, size = bytes.len(), "Fetch completed");

        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SettingsMap;

    #[test]
    fn test_fetch_config_defaults() {
        let config = FetchConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.max_retries, 3);
        assert!(config.user_agent.starts_with("crawlbox/"));
    }

    #[test]
    fn test_fetch_config_from_settings() {
        let mut map = SettingsMap::new();
        map.set(keys::DOWNLOAD_TIMEOUT, 5u64);
        map.set(keys::DOWNLOAD_MAX_RETRIES, 1u64);
        map.set(keys::USER_AGENT, "custom-agent/2.0");

        let settings = EffectiveSettings::new("scraping", map);
        let config = FetchConfig::from_settings(&settings);

        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.user_agent, "custom-agent/2.0");
    }

    #[test]
    fn test_fetch_config_clamps_oversized_retries() {
        let mut map = SettingsMap::new();
        map.set(keys::DOWNLOAD_MAX_RETRIES, u64::MAX);

        let settings = EffectiveSettings::new("scraping", map);
        let config = FetchConfig::from_settings(&settings);

        assert_eq!(config.max_retries, u32::MAX);
    }
}
