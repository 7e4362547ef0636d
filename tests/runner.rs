//! End-to-end tests for the isolated job runner: settings resolution,
//! worker lifecycle, pipelines and failure reporting.

use async_trait::async_trait;
use crawlbox::config::{SettingsError, SettingsMap, keys};
use crawlbox::engine::AnyError;
use crawlbox::runner::RunError;
use crawlbox::{CrawlContext, Item, RunOptions, Spider, run_spider};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tempfile::TempDir;

/// Spider emitting a fixed set of items with inline payloads, so the
/// pipelines never need the network.
struct PayloadSpider {
    items: Vec<(String, &'static [u8])>,
    started: Arc<AtomicBool>,
}

fn spider_with(items: &[(&str, &'static [u8])]) -> (PayloadSpider, Arc<AtomicBool>) {
    let started = Arc::new(AtomicBool::new(false));
    let spider = PayloadSpider {
        items: items
            .iter()
            .map(|(url, payload)| (url.to_string(), *payload))
            .collect(),
        started: Arc::clone(&started),
    };
    (spider, started)
}

#[async_trait]
impl Spider for PayloadSpider {
    fn name(&self) -> &str {
        "payload-spider"
    }

    async fn crawl(&mut self, ctx: &CrawlContext) -> Result<(), AnyError> {
        self.started.store(true, Ordering::SeqCst);
        for (url, payload) in &self.items {
            ctx.emit(
                Item::new()
                    .with_source_url(url.clone())
                    .with_payload(*payload),
            )
            .await?;
        }
        Ok(())
    }
}

struct FailingSpider;

#[async_trait]
impl Spider for FailingSpider {
    fn name(&self) -> &str {
        "failing-spider"
    }

    async fn crawl(&mut self, _ctx: &CrawlContext) -> Result<(), AnyError> {
        Err("scrape went sideways".into())
    }
}

struct PanickingSpider;

#[async_trait]
impl Spider for PanickingSpider {
    fn name(&self) -> &str {
        "panicking-spider"
    }

    async fn crawl(&mut self, _ctx: &CrawlContext) -> Result<(), AnyError> {
        panic!("spider exploded");
    }
}

fn files_store_override(dir: &TempDir) -> SettingsMap {
    let mut map = SettingsMap::new();
    map.set(keys::FILES_STORE, dir.path().join("files").display().to_string());
    map
}

#[test]
fn test_spider_runs_without_pipeline() {
    let (spider, started) = spider_with(&[("https://a.test/1", b"one")]);

    run_spider(spider, RunOptions::new()).unwrap();
    assert!(started.load(Ordering::SeqCst));
}

#[test]
fn test_invalid_pipeline_mode_fails_before_spawn() {
    let (spider, started) = spider_with(&[("https://a.test/1", b"one")]);

    let err = run_spider(spider, RunOptions::new().pipeline("ftp")).unwrap_err();

    match err {
        RunError::Settings(SettingsError::InvalidPipelineMode(mode)) => {
            assert_eq!(mode, "ftp");
        }
        other => panic!("unexpected error: {other}"),
    }
    // No worker existed, so the spider never started
    assert!(!started.load(Ordering::SeqCst));
}

#[test]
fn test_spider_error_surfaces_after_join() {
    let err = run_spider(FailingSpider, RunOptions::new()).unwrap_err();

    match err {
        RunError::Job(info) => {
            assert_eq!(info.kind, "SPIDER_FAILED");
            assert!(info.message.contains("scrape went sideways"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_spider_panic_is_reported_not_propagated() {
    let err = run_spider(PanickingSpider, RunOptions::new()).unwrap_err();

    match err {
        RunError::Job(info) => {
            assert_eq!(info.kind, "PANIC");
            assert!(info.message.contains("spider exploded"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_download_pipeline_stores_files() {
    let temp_dir = TempDir::new().unwrap();
    let (spider, _) = spider_with(&[
        ("https://a.test/docs/report.pdf", b"pdf-bytes"),
        ("https://a.test/docs/data.csv", b"a,b,c"),
    ]);

    run_spider(
        spider,
        RunOptions::new()
            .pipeline("download")
            .settings(files_store_override(&temp_dir)),
    )
    .unwrap();

    let store = temp_dir.path().join("files");
    assert_eq!(std::fs::read(store.join("report.pdf")).unwrap(), b"pdf-bytes");
    assert_eq!(std::fs::read(store.join("data.csv")).unwrap(), b"a,b,c");
}

#[test]
fn test_download_keeps_existing_file_with_zero_expiry() {
    let temp_dir = TempDir::new().unwrap();

    let (first, _) = spider_with(&[("https://a.test/data.csv", b"version-1")]);
    run_spider(
        first,
        RunOptions::new()
            .pipeline("download")
            .settings(files_store_override(&temp_dir)),
    )
    .unwrap();

    let (second, _) = spider_with(&[("https://a.test/data.csv", b"version-2")]);
    run_spider(
        second,
        RunOptions::new()
            .pipeline("download")
            .settings(files_store_override(&temp_dir)),
    )
    .unwrap();

    // Download mode injects files_expires = 0: stored files never expire
    let stored = std::fs::read(temp_dir.path().join("files").join("data.csv")).unwrap();
    assert_eq!(stored, b"version-1");
}

#[test]
fn test_override_all_discards_pipeline_injection() {
    let temp_dir = TempDir::new().unwrap();
    let (spider, started) = spider_with(&[("https://a.test/docs/report.pdf", b"pdf-bytes")]);

    run_spider(
        spider,
        RunOptions::new()
            .pipeline("download")
            .settings(files_store_override(&temp_dir))
            .override_all(true),
    )
    .unwrap();

    // The injection was dropped, so no download pipeline ran
    assert!(started.load(Ordering::SeqCst));
    assert!(!temp_dir.path().join("files").join("report.pdf").exists());
}

#[test]
fn test_unrecognized_pipeline_name_fails_inside_worker() {
    let (spider, started) = spider_with(&[("https://a.test/1", b"one")]);

    let mut overrides = SettingsMap::new();
    overrides.set(
        keys::ITEM_PIPELINES,
        json!({"scraping.scraping.pipelines.CustomPipeline": 1}),
    );

    let err = run_spider(spider, RunOptions::new().settings(overrides)).unwrap_err();

    match err {
        RunError::Job(info) => {
            assert_eq!(info.kind, "UNKNOWN_PIPELINE");
            assert!(info.message.contains("CustomPipeline"));
        }
        other => panic!("unexpected error: {other}"),
    }
    // The worker failed while building pipelines, before the spider ran
    assert!(!started.load(Ordering::SeqCst));
}

#[test]
fn test_blob_pipeline_with_local_provider() {
    let temp_dir = TempDir::new().unwrap();
    let (spider, _) = spider_with(&[("https://a.test/img.png", b"png-bytes")]);

    let mut overrides = SettingsMap::new();
    overrides.set(keys::BLOB_PROVIDER, "local");
    overrides.set(
        keys::BLOB_STORE,
        temp_dir.path().join("blobs").display().to_string(),
    );
    overrides.set(keys::BLOB_PREFIX, "crawl-output");

    run_spider(
        spider,
        RunOptions::new().pipeline("blob").settings(overrides),
    )
    .unwrap();

    let blob = temp_dir.path().join("blobs").join("crawl-output").join("img.png");
    assert_eq!(std::fs::read(blob).unwrap(), b"png-bytes");
}

#[test]
fn test_custom_project_name_qualifies_the_pipeline() {
    let temp_dir = TempDir::new().unwrap();
    let (spider, _) = spider_with(&[("https://a.test/report.pdf", b"pdf")]);

    // A different project name changes the injected qualified name, but
    // the built-in still resolves
    run_spider(
        spider,
        RunOptions::new()
            .pipeline("download")
            .project("archive")
            .settings(files_store_override(&temp_dir)),
    )
    .unwrap();

    assert!(temp_dir.path().join("files").join("report.pdf").exists());
}

#[test]
fn test_concurrent_jobs_stay_isolated() {
    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();

    let (spider_a, _) = spider_with(&[("https://a.test/a.bin", b"from-a")]);
    let (spider_b, _) = spider_with(&[("https://b.test/b.bin", b"from-b")]);

    let options_a = RunOptions::new()
        .pipeline("download")
        .settings(files_store_override(&dir_a));
    let options_b = RunOptions::new()
        .pipeline("download")
        .settings(files_store_override(&dir_b));

    let job_a = std::thread::spawn(move || run_spider(spider_a, options_a));
    let job_b = std::thread::spawn(move || run_spider(spider_b, options_b));

    job_a.join().unwrap().unwrap();
    job_b.join().unwrap().unwrap();

    let store_a = dir_a.path().join("files");
    let store_b = dir_b.path().join("files");
    assert!(store_a.join("a.bin").exists());
    assert!(!store_a.join("b.bin").exists());
    assert!(store_b.join("b.bin").exists());
    assert!(!store_b.join("a.bin").exists());
}
