//! Process-wide tracing setup for crawl workers.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{EffectiveSettings, keys};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the settings' `log_level`. Safe to call from every
/// worker; once a subscriber is installed, later calls leave it in place.
pub fn init_from_settings(settings: &EffectiveSettings) {
    let level = settings.get_str(keys::LOG_LEVEL).unwrap_or("info");

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SettingsMap;

    #[test]
    fn test_repeated_init_is_harmless() {
        let mut map = SettingsMap::new();
        map.set(keys::LOG_LEVEL, "debug");
        let settings = EffectiveSettings::new("scraping", map);

        init_from_settings(&settings);
        init_from_settings(&settings);
    }
}
