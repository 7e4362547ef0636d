use super::settings::{SettingsMap, keys};
use config::{ConfigError, Environment, File};
use std::env;
use std::path::PathBuf;
use std::sync::Once;

const CONFIG_ENV_VAR: &str = "CRAWLBOX_CONFIG";
const DEFAULT_CONFIG_DIR: &str = "config";
const ENV_PREFIX: &str = "CRAWLBOX";
const ENV_SEPARATOR: &str = "__";

/// Project name used when a caller does not pass one.
pub const DEFAULT_PROJECT: &str = "scraping";

/// Directory downloaded files land in unless the settings say otherwise.
pub const DEFAULT_FILES_STORE: &str = "crawl-files";

static DOTENV: Once = Once::new();

/// Load base project settings from multiple sources with priority:
/// 1. Built-in defaults
/// 2. TOML file (`config/<project>.toml`, or the path in `CRAWLBOX_CONFIG`)
/// 3. Environment variables from .env file (via dotenvy)
/// 4. System environment variables (highest priority)
pub fn load(project: &str) -> Result<SettingsMap, ConfigError> {
    // Reading .env writes into the process environment, so it runs at
    // most once per process even when jobs load settings concurrently.
    // A missing .env file is fine.
    DOTENV.call_once(|| {
        let _ = dotenvy::dotenv();
    });

    let config_path = env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_DIR).join(format!("{project}.toml")));

    load_from_sources(config_path)
}

/// Load base settings from a specific path and the environment.
/// Useful for testing with custom config files.
pub fn load_from_sources(config_path: PathBuf) -> Result<SettingsMap, ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!("Loading base settings from: {}", config_path.display());
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::debug!(
            "Base settings file not found at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    // Environment variable overrides
    // CRAWLBOX__LOG_LEVEL -> log_level
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    let loaded: SettingsMap = builder.build()?.try_deserialize()?;

    let mut settings = defaults();
    settings.merge(&loaded);
    Ok(settings)
}

/// Built-in defaults, the lowest layer of every base load.
fn defaults() -> SettingsMap {
    let mut settings = SettingsMap::new();
    settings.set(keys::LOG_LEVEL, "info");
    settings.set(keys::FILES_STORE, DEFAULT_FILES_STORE);
    settings.set(keys::FILES_EXPIRES, 0u64);
    settings.set(keys::BLOB_PROVIDER, "local");
    settings.set(keys::BLOB_STORE, "crawlbox-blobs");
    settings.set(
        keys::USER_AGENT,
        concat!("crawlbox/", env!("CARGO_PKG_VERSION")),
    );
    settings.set(keys::DOWNLOAD_TIMEOUT, 30u64);
    settings.set(keys::DOWNLOAD_MAX_RETRIES, 3u64);
    settings
}
