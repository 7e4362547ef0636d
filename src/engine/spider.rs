use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use std::collections::BTreeMap;
use tokio::sync::mpsc;

use super::{AnyError, EngineError};

/// A unit of scraped output.
#[derive(Debug, Clone, Default)]
pub struct Item {
    /// URL the item came from. Pipelines that fetch or name files need it.
    pub source_url: Option<String>,
    /// Payload the spider already holds, if any. Pipelines that store
    /// content prefer this over fetching the source again.
    pub payload: Option<Bytes>,
    /// Structured fields extracted by the spider.
    pub fields: BTreeMap<String, Value>,
}

impl Item {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    pub fn with_payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// Handle spiders use to emit scraped items into the pipeline chain.
///
/// The item channel closes once every clone of the context is gone; the
/// supervisor drops its copy right after the spider returns.
#[derive(Debug, Clone)]
pub struct CrawlContext {
    items: mpsc::Sender<Item>,
}

impl CrawlContext {
    pub(crate) fn new(items: mpsc::Sender<Item>) -> Self {
        Self { items }
    }

    /// Queue one item for pipeline processing.
    ///
    /// Applies backpressure when the pipelines fall behind.
    pub async fn emit(&self, item: Item) -> Result<(), EngineError> {
        self.items
            .send(item)
            .await
            .map_err(|_| EngineError::ChannelClosed)
    }
}

/// Contract for a crawl job's scraping logic.
///
/// The whole spider moves into the worker that runs it, so implementations
/// are free to hold their own mutable state.
#[async_trait]
pub trait Spider: Send + 'static {
    /// Name used in logs and the crawl summary.
    fn name(&self) -> &str;

    /// Run the crawl, emitting scraped items through `ctx`.
    async fn crawl(&mut self, ctx: &CrawlContext) -> Result<(), AnyError>;
}
