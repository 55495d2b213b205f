//! # Buildscope Crawler
//!
//! Discovers, fetches and classifies every asset of one web client build.
//!
//! ## Pipeline
//!
//! ```text
//! ManifestResolver (root document)
//!     │  root asset names, build id, date, runtime config
//!     ▼
//! TaskQueue (bounded network concurrency)
//!     │  AssetFetcher: fixed-delay retry, metadata recorded once
//!     ▼
//! ClassifierPool (fixed worker threads, per-call deadline)
//!     │  ContentClassifier + ExperimentExtractor
//!     ▼
//! references not seen yet ─> next frontier ─┐
//!     ▲                                     │
//!     └─────────────────────────────────────┘
//!     │  frontier empty
//!     ▼
//! CrawlReport { Build, failures, stats }
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use buildscope_crawler::{BuildCrawler, CrawlerConfig, ReqwestTransport};
//! use buildscope_protocol::ReleaseChannel;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = CrawlerConfig::for_channel(ReleaseChannel::Canary).from_env();
//!     let crawler = BuildCrawler::new(config, Arc::new(ReqwestTransport::new()?))?;
//!     let report = crawler.crawl(None).await?;
//!
//!     println!("{} assets, {} failures", report.build.assets.len(), report.failures.len());
//!     Ok(())
//! }
//! ```

mod blob;
mod config;
mod error;
mod fetcher;
mod manifest;
#[cfg(any(test, feature = "test-support"))]
mod memory_transport;
mod orchestrator;
mod pool;
mod scheduler;
mod transport;

pub use blob::BlobStore;
pub use config::{
    CrawlerConfig, DEFAULT_CLASSIFY_DEADLINE, DEFAULT_FETCH_CONCURRENCY, DEFAULT_RETRY_ATTEMPTS,
    DEFAULT_RETRY_DELAY, MAX_FETCH_CONCURRENCY,
};
pub use error::{
    AssetFailure, CrawlError, FailureStage, FetchError, FetchFailure, PoolError, Result,
    SchedulerError,
};
pub use fetcher::{parse_http_date, AssetFetcher, RetryPolicy};
pub use manifest::{root_asset_names, runtime_config, ManifestResolver, RootInfo};
#[cfg(any(test, feature = "test-support"))]
pub use memory_transport::MemoryTransport;
pub use orchestrator::{BuildCrawler, CrawlReport, CrawlState, CrawlStats};
pub use pool::{analyzer_factory, ClassifierPool, Handler, HandlerFactory};
pub use scheduler::{TaskHandle, TaskQueue};
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport};
