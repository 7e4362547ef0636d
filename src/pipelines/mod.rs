//! Item pipelines: post-processing stages items pass through after the
//! spider emits them.
//!
//! Pipelines are activated through the `item_pipelines` setting, a map of
//! qualified pipeline name to priority. Lower priority runs first. The
//! qualified names resolve against the built-ins only; an unrecognized
//! name fails the job inside the worker.

mod blob;
mod download;

pub use blob::BlobUploadPipeline;
pub use download::FileDownloadPipeline;

use async_trait::async_trait;
use tracing::debug;

use crate::config::{EffectiveSettings, PipelineMode, keys};
use crate::engine::{EngineError, Item};

/// One stage of item post-processing.
#[async_trait]
pub trait ItemPipeline: Send + Sync {
    /// Name used in logs and stats.
    fn name(&self) -> &'static str;

    /// Process one item. `Ok(None)` drops it; later stages never see it.
    async fn process_item(&self, item: Item) -> Result<Option<Item>, EngineError>;

    /// Called once after the spider finished and the item queue drained.
    async fn close(&self) -> Result<(), EngineError> {
        Ok(())
    }
}

/// Instantiate the pipelines activated under `item_pipelines`, lowest
/// priority first. Ties run in name order.
pub fn build_pipelines(
    settings: &EffectiveSettings,
) -> Result<Vec<Box<dyn ItemPipeline>>, EngineError> {
    let Some(value) = settings.get(keys::ITEM_PIPELINES) else {
        return Ok(Vec::new());
    };

    let Some(entries) = value.as_object() else {
        return Err(EngineError::InvalidSetting {
            key: keys::ITEM_PIPELINES.to_string(),
            reason: "expected a map of pipeline name to priority".to_string(),
        });
    };

    let mut activated: Vec<(i64, &str)> = Vec::with_capacity(entries.len());
    for (qualified, priority) in entries {
        let priority = priority
            .as_i64()
            .ok_or_else(|| EngineError::InvalidSetting {
                key: keys::ITEM_PIPELINES.to_string(),
                reason: format!("priority for '{qualified}' must be an integer"),
            })?;
        activated.push((priority, qualified));
    }
    activated.sort_by_key(|(priority, _)| *priority);

    let mut pipelines: Vec<Box<dyn ItemPipeline>> = Vec::with_capacity(activated.len());
    for (priority, qualified) in activated {
        let mode = PipelineMode::recognize(qualified)
            .ok_or_else(|| EngineError::UnknownPipeline(qualified.to_string()))?;

        debug!(pipeline = qualified, priority, "Activating pipeline");

        let pipeline: Box<dyn ItemPipeline> = match mode {
            PipelineMode::Blob => Box::new(BlobUploadPipeline::from_settings(settings)?),
            PipelineMode::Download => Box::new(FileDownloadPipeline::from_settings(settings)?),
        };
        pipelines.push(pipeline);
    }

    Ok(pipelines)
}

/// Object name for a URL: the last path segment, query and fragment
/// stripped. Falls back to "index" when the URL has no usable segment.
pub(crate) fn object_name(url: &str) -> String {
    let trimmed = url.split(['?', '#']).next().unwrap_or(url);
    let segment = trimmed
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or("");

    if segment.is_empty() || segment.ends_with(':') {
        "index".to_string()
    } else {
        segment.to_string()
    }
}
