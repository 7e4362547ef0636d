//! Settings resolution for crawl jobs.
//!
//! Base project settings are loaded from layered sources:
//! 1. Built-in defaults
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! The [`ConfigResolver`] then layers pipeline injection and caller
//! overrides on top to produce the [`EffectiveSettings`] a single crawl
//! job runs with.
//!
//! # Usage
//!
//! ```no_run
//! use crawlbox::config::ConfigResolver;
//!
//! let resolver = ConfigResolver::new("scraping");
//! let effective = resolver
//!     .resolve(Some("blob"), None, false)
//!     .expect("Failed to resolve settings");
//! println!("Resolved {} settings", effective.settings().len());
//! ```
//!
//! # Environment Variables
//!
//! Any base setting can be overridden using environment variables with the
//! pattern `CRAWLBOX__<key>`:
//!
//! - `CRAWLBOX__LOG_LEVEL=debug`
//! - `CRAWLBOX__FILES_STORE=/var/lib/crawl-files`
//!
//! # Configuration File
//!
//! By default, base settings are read from `config/<project>.toml`. The
//! path can be overridden using the `CRAWLBOX_CONFIG` environment variable.

mod resolver;
mod settings;
mod sources;

// Re-export public types
pub use resolver::{ConfigResolver, PipelineMode, SettingsError};
pub use settings::{EffectiveSettings, SettingsMap, keys};
pub use sources::{DEFAULT_FILES_STORE, DEFAULT_PROJECT, load_from_sources};

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_file_settings_feed_the_resolver() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("scraping.toml");

        let toml_content = r#"
log_level = "warn"
start_urls = ["https://example.com/catalog"]
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let base = load_from_sources(config_path).unwrap();
        let resolver = ConfigResolver::with_base("scraping", base);
        let effective = resolver.resolve(Some("download"), None, false).unwrap();

        // File values survive underneath the injection
        assert_eq!(effective.get_str(keys::LOG_LEVEL), Some("warn"));
        assert!(effective.get("start_urls").is_some());

        // Injection on top
        assert_eq!(effective.get_str(keys::FILES_STORE), Some(DEFAULT_FILES_STORE));
        assert_eq!(effective.get_u64(keys::FILES_EXPIRES), Some(0));
    }

    #[test]
    fn test_download_injection_overrides_file_files_store() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("scraping.toml");

        fs::write(&config_path, r#"files_store = "data/archive""#).unwrap();

        let base = load_from_sources(config_path).unwrap();
        let resolver = ConfigResolver::with_base("scraping", base.clone());

        // Without a pipeline the file value is authoritative
        let plain = resolver.resolve(None, None, false).unwrap();
        assert_eq!(plain.get_str(keys::FILES_STORE), Some("data/archive"));

        // Download mode pins the store location; overrides can restore it
        let injected = resolver.resolve(Some("download"), None, false).unwrap();
        assert_eq!(injected.get_str(keys::FILES_STORE), Some(DEFAULT_FILES_STORE));

        let mut restore = SettingsMap::new();
        restore.set(keys::FILES_STORE, "data/archive");
        let restored = resolver
            .resolve(Some("download"), Some(&restore), false)
            .unwrap();
        assert_eq!(restored.get_str(keys::FILES_STORE), Some("data/archive"));
    }
}
