use super::settings::{EffectiveSettings, SettingsMap, keys};
use super::sources::{self, DEFAULT_FILES_STORE};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Pipeline must be either 'blob' or 'download', got '{0}'")]
    InvalidPipelineMode(String),

    #[error("Failed to load base settings: {0}")]
    Load(#[from] config::ConfigError),
}

/// Built-in pipeline selection, parsed from the caller-facing mode string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineMode {
    Blob,
    Download,
}

impl PipelineMode {
    /// Parse a mode string. Matching is exact, `"Blob"` is not a mode.
    pub fn parse(mode: &str) -> Result<Self, SettingsError> {
        match mode {
            "blob" => Ok(PipelineMode::Blob),
            "download" => Ok(PipelineMode::Download),
            other => Err(SettingsError::InvalidPipelineMode(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineMode::Blob => "blob",
            PipelineMode::Download => "download",
        }
    }

    /// Bare type name the qualified pipeline path ends with.
    pub fn type_name(&self) -> &'static str {
        match self {
            PipelineMode::Blob => "BlobUploadPipeline",
            PipelineMode::Download => "FileDownloadPipeline",
        }
    }

    /// Fully qualified pipeline name as it appears under `item_pipelines`.
    ///
    /// The `{project}.{project}.pipelines.{Type}` shape mirrors the module
    /// layout of generated scraping projects and is part of the settings
    /// contract: callers match on it when post-processing settings.
    pub fn qualified_name(&self, project: &str) -> String {
        format!("{project}.{project}.pipelines.{}", self.type_name())
    }

    /// Map a qualified pipeline name back to the built-in it refers to.
    pub fn recognize(qualified: &str) -> Option<Self> {
        let type_name = qualified.rsplit('.').next().unwrap_or(qualified);
        match type_name {
            "BlobUploadPipeline" => Some(PipelineMode::Blob),
            "FileDownloadPipeline" => Some(PipelineMode::Download),
            _ => None,
        }
    }
}

impl std::str::FromStr for PipelineMode {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Resolves the settings a crawl job runs with.
///
/// Layering, lowest to highest: base project settings, pipeline injection,
/// caller overrides. `override_all` drops the injection layer and applies
/// the overrides to a fresh copy of the base instead.
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    project: String,
    base: Option<SettingsMap>,
}

impl ConfigResolver {
    /// Resolver that loads base settings from the project's config sources.
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            base: None,
        }
    }

    /// Resolver with a fixed base, skipping file and environment lookup.
    pub fn with_base(project: impl Into<String>, base: SettingsMap) -> Self {
        Self {
            project: project.into(),
            base: Some(base),
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    fn load_base(&self) -> Result<SettingsMap, SettingsError> {
        match &self.base {
            Some(base) => Ok(base.clone()),
            None => Ok(sources::load(&self.project)?),
        }
    }

    /// Compute the effective settings for one crawl job.
    ///
    /// The pipeline string is validated before anything else, so a bad mode
    /// fails without touching config sources.
    pub fn resolve(
        &self,
        pipeline: Option<&str>,
        overrides: Option<&SettingsMap>,
        override_all: bool,
    ) -> Result<EffectiveSettings, SettingsError> {
        let mode = pipeline.map(PipelineMode::parse).transpose()?;

        let base = self.load_base()?;
        let mut settings = base.clone();

        if let Some(mode) = mode {
            self.inject_pipeline(&mut settings, mode);
        }

        if let Some(overrides) = overrides {
            if override_all {
                settings = base;
            }
            settings.merge(overrides);
        }

        Ok(EffectiveSettings::new(self.project.clone(), settings))
    }

    /// Activate one built-in pipeline at priority 1, plus the storage
    /// options the download pipeline relies on.
    fn inject_pipeline(&self, settings: &mut SettingsMap, mode: PipelineMode) {
        let mut pipelines = serde_json::Map::new();
        pipelines.insert(mode.qualified_name(&self.project), Value::from(1u64));
        settings.set(keys::ITEM_PIPELINES, Value::Object(pipelines));

        if mode == PipelineMode::Download {
            settings.set(keys::FILES_STORE, DEFAULT_FILES_STORE);
            settings.set(keys::FILES_EXPIRES, 0u64);
        }
    }
}
