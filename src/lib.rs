//! Run web-crawl jobs in isolation.
//!
//! A crawl job pairs a [`Spider`] with resolved settings and executes it
//! on a dedicated worker with its own runtime. The caller blocks until
//! the worker reports a single result and has fully exited, so a failed
//! crawl can never leak into the next one.
//!
//! ```no_run
//! use async_trait::async_trait;
//! use crawlbox::engine::AnyError;
//! use crawlbox::{CrawlContext, Item, RunOptions, Spider, run_spider};
//!
//! struct QuotesSpider;
//!
//! #[async_trait]
//! impl Spider for QuotesSpider {
//!     fn name(&self) -> &str {
//!         "quotes"
//!     }
//!
//!     async fn crawl(&mut self, ctx: &CrawlContext) -> Result<(), AnyError> {
//!         ctx.emit(Item::new().with_source_url("https://quotes.example/page/1"))
//!             .await?;
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     run_spider(QuotesSpider, RunOptions::new().pipeline("download"))?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod engine;
pub mod logging;
pub mod pipelines;
pub mod runner;
pub mod storage;

// The handful of types nearly every caller needs
pub use engine::{CrawlContext, Item, Spider};
pub use runner::{RunOptions, run_spider};
