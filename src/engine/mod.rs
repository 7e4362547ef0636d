//! Crawl engine: the spider contract, the supervisor that drives it, and
//! supporting plumbing (fetcher, per-crawl counters).

mod fetch;
mod spider;
mod stats;
mod supervisor;

pub use fetch::{FetchConfig, Fetcher};
pub use spider::{CrawlContext, Item, Spider};
pub use stats::{CrawlStats, StatsSnapshot};
pub use supervisor::CrawlSupervisor;

use thiserror::Error;

/// Boxed error spiders bubble up from their own logic.
pub type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Spider failed: {0}")]
    Spider(String),

    #[error("Pipeline '{0}' failed: {1}")]
    Pipeline(String, String),

    #[error("No built-in pipeline matches '{0}'")]
    UnknownPipeline(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Item channel closed before the crawl finished")]
    ChannelClosed,

    #[error("Invalid setting '{key}': {reason}")]
    InvalidSetting { key: String, reason: String },
}

impl EngineError {
    /// Stable machine-readable tag, carried across the worker boundary.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Spider(_) => "SPIDER_FAILED",
            EngineError::Pipeline(..) => "PIPELINE_FAILED",
            EngineError::UnknownPipeline(_) => "UNKNOWN_PIPELINE",
            EngineError::Storage(_) => "STORAGE",
            EngineError::Fetch(_) => "FETCH",
            EngineError::ChannelClosed => "CHANNEL_CLOSED",
            EngineError::InvalidSetting { .. } => "INVALID_SETTING",
        }
    }
}
