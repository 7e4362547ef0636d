//! Per-crawl counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Counter handle shared between the supervisor and the item loop
#[derive(Debug, Default)]
pub struct CrawlStats {
    items_scraped: AtomicU64,
    items_processed: AtomicU64,
    items_dropped: AtomicU64,
    pipeline_errors: AtomicU64,
}

impl CrawlStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn item_scraped(&self) {
        self.items_scraped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn item_processed(&self) {
        self.items_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn item_dropped(&self) {
        self.items_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn pipeline_error(&self) {
        self.pipeline_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            items_scraped: self.items_scraped.load(Ordering::Relaxed),
            items_processed: self.items_processed.load(Ordering::Relaxed),
            items_dropped: self.items_dropped.load(Ordering::Relaxed),
            pipeline_errors: self.pipeline_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the counters, logged in the crawl summary
#[derive(Debug, Clone)]
pub struct StatsSnapshot {
    pub items_scraped: u64,
    pub items_processed: u64,
    pub items_dropped: u64,
    pub pipeline_errors: u64,
}
