//! Isolated crawl job runner.
//!
//! Each job gets a dedicated worker thread with its own single-threaded
//! runtime. The caller blocks until the worker has pushed exactly one
//! result through a single-slot channel and the thread has been joined;
//! only then is a failure surfaced.

use serde::{Deserialize, Serialize};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::thread;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{error, info, info_span};
use uuid::Uuid;

use crate::config::{
    ConfigResolver, DEFAULT_PROJECT, EffectiveSettings, SettingsError, SettingsMap,
};
use crate::engine::{CrawlSupervisor, EngineError, Spider};
use crate::logging;

const KIND_PANIC: &str = "PANIC";
const KIND_RUNTIME: &str = "RUNTIME";

/// What went wrong inside a worker, in a form that crosses the thread
/// boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine-readable tag, see [`EngineError::kind`].
    pub kind: String,
    /// Human-readable description.
    pub message: String,
}

impl ErrorInfo {
    fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "worker panicked".to_string()
        };
        Self::new(KIND_PANIC, message)
    }
}

impl From<&EngineError> for ErrorInfo {
    fn from(e: &EngineError) -> Self {
        Self::new(e.kind(), e.to_string())
    }
}

impl std::fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

/// Exactly one of these crosses the result channel per job.
pub type JobResult = Result<(), ErrorInfo>;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("Failed to resolve settings: {0}")]
    Settings(#[from] SettingsError),

    #[error("Failed to spawn crawl worker: {0}")]
    Spawn(String),

    #[error("Crawl job failed: {0}")]
    Job(ErrorInfo),

    #[error("Crawl worker vanished without reporting a result")]
    WorkerVanished,
}

/// Options for [`run_spider`].
#[derive(Debug, Clone)]
pub struct RunOptions {
    pipeline: Option<String>,
    settings: Option<SettingsMap>,
    override_all: bool,
    project: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            pipeline: None,
            settings: None,
            override_all: false,
            project: DEFAULT_PROJECT.to_string(),
        }
    }
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Activate a built-in pipeline: "blob" or "download".
    pub fn pipeline(mut self, mode: impl Into<String>) -> Self {
        self.pipeline = Some(mode.into());
        self
    }

    /// Settings merged on top of whatever the resolver computed.
    pub fn settings(mut self, settings: SettingsMap) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Apply the caller settings to a fresh copy of the base instead,
    /// dropping any pipeline injection.
    pub fn override_all(mut self, override_all: bool) -> Self {
        self.override_all = override_all;
        self
    }

    /// Project the base settings belong to.
    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.project = project.into();
        self
    }
}

/// Run one spider to completion on an isolated worker.
///
/// Settings are resolved before anything is spawned, so an invalid
/// pipeline mode fails without a worker ever existing. The calling thread
/// then blocks until the worker has reported its result and exited; a
/// failure inside the worker surfaces as [`RunError::Job`] only after the
/// join.
///
/// Blocks the calling thread, so do not call it from async code.
pub fn run_spider<S: Spider>(spider: S, options: RunOptions) -> Result<(), RunError> {
    let resolver = ConfigResolver::new(options.project.clone());
    let effective = resolver.resolve(
        options.pipeline.as_deref(),
        options.settings.as_ref(),
        options.override_all,
    )?;

    let job_id = Uuid::new_v4().to_string();
    let (result_tx, result_rx) = oneshot::channel::<JobResult>();

    let worker_job_id = job_id.clone();
    let handle = thread::Builder::new()
        .name(format!("crawl-worker-{job_id}"))
        .spawn(move || worker_main(spider, effective, worker_job_id, result_tx))
        .map_err(|e| RunError::Spawn(e.to_string()))?;

    // Result first, join second; failures surface only once the worker
    // is fully gone.
    let result = result_rx.blocking_recv();

    if let Err(e) = handle.join() {
        // The result slot already captured the panic, nothing to add
        error!(job_id = %job_id, "Crawl worker terminated abnormally: {:?}", e);
    }

    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(info)) => Err(RunError::Job(info)),
        Err(_) => Err(RunError::WorkerVanished),
    }
}

/// Worker entry: run the job, then report exactly one result.
fn worker_main<S: Spider>(
    spider: S,
    settings: EffectiveSettings,
    job_id: String,
    result_tx: oneshot::Sender<JobResult>,
) {
    let outcome = catch_unwind(AssertUnwindSafe(|| execute_job(spider, settings, &job_id)));

    let result: JobResult = match outcome {
        Ok(result) => result,
        Err(payload) => Err(ErrorInfo::from_panic(payload)),
    };

    // The caller may have given up; nothing useful to do about it here
    let _ = result_tx.send(result);
}

/// Build the runtime and supervisor, run the crawl, translate failures.
fn execute_job<S: Spider>(spider: S, settings: EffectiveSettings, job_id: &str) -> JobResult {
    logging::init_from_settings(&settings);

    let span = info_span!("crawl_job", job_id, project = settings.project());
    let _guard = span.enter();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| ErrorInfo::new(KIND_RUNTIME, e.to_string()))?;

    info!("Worker starting crawl");

    let result = runtime.block_on(async {
        let supervisor =
            CrawlSupervisor::from_settings(&settings).map_err(|e| ErrorInfo::from(&e))?;
        supervisor
            .crawl(spider)
            .await
            .map_err(|e| ErrorInfo::from(&e))
    });

    // Everything the crawl spawned stops with its runtime
    drop(runtime);

    match &result {
        Ok(()) => info!("Worker finished"),
        Err(info) => error!(kind = %info.kind, message = %info.message, "Worker failed"),
    }

    result
}
