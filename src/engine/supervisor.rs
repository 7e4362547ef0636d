//! Drives one spider and its pipeline chain to completion.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::EffectiveSettings;
use crate::pipelines::{self, ItemPipeline};

use super::EngineError;
use super::spider::{CrawlContext, Item, Spider};
use super::stats::CrawlStats;

/// Bound on items queued between the spider and the pipeline loop.
const ITEM_CHANNEL_CAPACITY: usize = 64;

/// Owns the pipeline chain and runs one spider to completion.
pub struct CrawlSupervisor {
    pipelines: Vec<Box<dyn ItemPipeline>>,
    stats: Arc<CrawlStats>,
}

impl CrawlSupervisor {
    /// Build the supervisor for one job from its effective settings.
    pub fn from_settings(settings: &EffectiveSettings) -> Result<Self, EngineError> {
        Ok(Self::with_pipelines(pipelines::build_pipelines(settings)?))
    }

    /// Supervisor over an explicit pipeline chain, in activation order.
    pub fn with_pipelines(pipelines: Vec<Box<dyn ItemPipeline>>) -> Self {
        Self {
            pipelines,
            stats: Arc::new(CrawlStats::new()),
        }
    }

    pub fn stats(&self) -> Arc<CrawlStats> {
        Arc::clone(&self.stats)
    }

    /// Run the spider to completion, feeding every emitted item through
    /// the pipeline chain.
    ///
    /// Per-item pipeline failures drop the item and are counted, they do
    /// not abort the crawl. A spider failure does.
    pub async fn crawl<S: Spider>(&self, mut spider: S) -> Result<(), EngineError> {
        let (tx, mut rx) = mpsc::channel::<Item>(ITEM_CHANNEL_CAPACITY);
        let spider_name = spider.name().to_string();

        info!(
            spider = %spider_name,
            pipelines = self.pipelines.len(),
            "Crawl starting"
        );

        let stats = Arc::clone(&self.stats);
        let crawl_task = async {
            let ctx = CrawlContext::new(tx);
            let result = spider.crawl(&ctx).await;
            // Closing the channel lets the item loop drain out
            drop(ctx);
            result
        };

        let item_task = async {
            while let Some(item) = rx.recv().await {
                stats.item_scraped();
                self.process_item(item).await;
            }
        };

        let (spider_result, ()) = tokio::join!(crawl_task, item_task);

        for pipeline in &self.pipelines {
            if let Err(e) = pipeline.close().await {
                warn!(pipeline = pipeline.name(), error = %e, "Pipeline close failed");
            }
        }

        let snapshot = self.stats.snapshot();
        info!(
            spider = %spider_name,
            items_scraped = snapshot.items_scraped,
            items_processed = snapshot.items_processed,
            items_dropped = snapshot.items_dropped,
            pipeline_errors = snapshot.pipeline_errors,
            "Crawl finished"
        );

        spider_result.map_err(|e| EngineError::Spider(e.to_string()))
    }

    async fn process_item(&self, item: Item) {
        let mut current = Some(item);

        for pipeline in &self.pipelines {
            let Some(item) = current.take() else { break };

            match pipeline.process_item(item).await {
                Ok(Some(next)) => current = Some(next),
                Ok(None) => {
                    debug!(pipeline = pipeline.name(), "Pipeline dropped item");
                    self.stats.item_dropped();
                }
                Err(e) => {
                    error!(pipeline = pipeline.name(), error = %e, "Pipeline failed, item dropped");
                    self.stats.pipeline_error();
                }
            }
        }

        if current.is_some() {
            self.stats.item_processed();
        }
    }
}
