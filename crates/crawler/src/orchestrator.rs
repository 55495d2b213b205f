use crate::blob::BlobStore;
use crate::config::CrawlerConfig;
use crate::error::{AssetFailure, CrawlError, FailureStage, FetchFailure, Result};
use crate::fetcher::{AssetFetcher, RetryPolicy};
use crate::manifest::{ManifestResolver, RootInfo};
use crate::pool::{analyzer_factory, ClassifierPool, HandlerFactory};
use crate::scheduler::{TaskHandle, TaskQueue};
use crate::transport::HttpTransport;
use buildscope_classifier::Signatures;
use buildscope_protocol::{Asset, AssetMetadata, AssetTag, Build, ClassifyRequest};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// Phase of one crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlState {
    ResolvingManifest,
    FetchingRoots,
    ClassifyingAndExpanding,
    Assembled,
    Failed,
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::ResolvingManifest => "resolving manifest",
            Self::FetchingRoots => "fetching roots",
            Self::ClassifyingAndExpanding => "classifying and expanding",
            Self::Assembled => "assembled",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlStats {
    /// Discovery iterations, the root frontier included.
    pub iterations: usize,
    pub fetched: usize,
    pub classified: usize,
    pub failed: usize,
}

/// Result of one crawl: the assembled build and every asset that did not
/// make it in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlReport {
    pub build: Build,
    pub failures: Vec<AssetFailure>,
    pub stats: CrawlStats,
}

impl CrawlReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

type FetchHandle = TaskHandle<std::result::Result<AssetMetadata, FetchFailure>>;

/// Outcome of one frontier entry, keyed by its position in the frontier.
struct Settled {
    index: usize,
    fetched: bool,
    outcome: std::result::Result<Asset, AssetFailure>,
}

/// Drives manifest resolution, fetching and classification of one build.
pub struct BuildCrawler {
    config: CrawlerConfig,
    transport: Arc<dyn HttpTransport>,
    factory: HandlerFactory,
}

impl BuildCrawler {
    pub fn new(config: CrawlerConfig, transport: Arc<dyn HttpTransport>) -> Result<Self> {
        config.validate().map_err(CrawlError::Configuration)?;
        Ok(Self {
            config,
            transport,
            factory: analyzer_factory(Signatures::default()),
        })
    }

    /// Replace the per-worker classification routine.
    #[must_use]
    pub fn with_handler_factory(mut self, factory: HandlerFactory) -> Self {
        self.factory = factory;
        self
    }

    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    /// Resolve the manifest for `selector` (live build when `None`) and crawl it.
    pub async fn crawl(&self, selector: Option<&str>) -> Result<CrawlReport> {
        self.enter(CrawlState::ResolvingManifest);
        let resolver = ManifestResolver::new(&self.config, Arc::clone(&self.transport));
        let root = match resolver.resolve(selector).await {
            Ok(root) => root,
            Err(err) => {
                self.enter(CrawlState::Failed);
                return Err(err);
            }
        };
        self.crawl_from(root).await
    }

    /// Crawl from an already resolved manifest.
    pub async fn crawl_from(&self, root: RootInfo) -> Result<CrawlReport> {
        let result = self.discover(root).await;
        match &result {
            Ok(report) => {
                self.enter(CrawlState::Assembled);
                log::info!(
                    "Build {}: {} asset(s), {} failure(s), {} experiment(s)",
                    report.build.id,
                    report.build.assets.len(),
                    report.failures.len(),
                    report.build.experiment_count()
                );
            }
            Err(err) => {
                self.enter(CrawlState::Failed);
                log::error!("Crawl failed: {err}");
            }
        }
        result
    }

    async fn discover(&self, root: RootInfo) -> Result<CrawlReport> {
        let fetcher = Arc::new(self.fetcher().await);
        let queue = TaskQueue::new(self.config.fetch_concurrency)?;
        let pool = Arc::new(ClassifierPool::new(
            self.config.worker_count(),
            Arc::clone(&self.factory),
        )?);

        let mut seen = HashSet::new();
        let mut frontier: Vec<String> = root
            .root_assets
            .iter()
            .filter(|name| seen.insert(name.to_string()))
            .cloned()
            .collect();

        self.enter(CrawlState::FetchingRoots);
        let mut pending = submit_fetches(&queue, &fetcher, &frontier);
        self.enter(CrawlState::ClassifyingAndExpanding);

        let mut assets = Vec::new();
        let mut failures = Vec::new();
        let mut stats = CrawlStats::default();

        while !frontier.is_empty() {
            stats.iterations += 1;
            log::info!(
                "Iteration {}: {} asset(s) in frontier",
                stats.iterations,
                frontier.len()
            );

            let settled = self.settle(&frontier, pending, &pool).await;
            queue.drain().await;

            let mut next = Vec::new();
            for (name, settled) in frontier.iter().zip(settled) {
                let Some(settled) = settled else {
                    failures.push(AssetFailure {
                        name: name.clone(),
                        stage: FailureStage::Classify,
                        attempts: 0,
                        message: "classification task aborted".to_string(),
                    });
                    continue;
                };
                if settled.fetched {
                    stats.fetched += 1;
                }
                match settled.outcome {
                    Ok(asset) => {
                        next.extend(
                            asset
                                .references
                                .iter()
                                .filter(|reference| seen.insert(reference.to_string()))
                                .cloned(),
                        );
                        stats.classified += 1;
                        assets.push(asset);
                    }
                    Err(failure) => {
                        log::warn!("{}: dropped from build: {}", failure.name, failure.message);
                        failures.push(failure);
                    }
                }
            }

            frontier = next;
            pending = submit_fetches(&queue, &fetcher, &frontier);
        }
        stats.failed = failures.len();

        let pool_for_shutdown = Arc::clone(&pool);
        if tokio::task::spawn_blocking(move || pool_for_shutdown.shutdown())
            .await
            .is_err()
        {
            log::warn!("Classification pool shutdown did not complete cleanly");
        }

        let build_info = assets
            .iter()
            .filter(|asset| asset.has_tag(AssetTag::AppMain))
            .find_map(|asset| asset.build_info.clone());
        let build = Build {
            id: root.id,
            release_channel: self.config.release_channel,
            build_env: self.config.release_channel.build_env(),
            date: root.date,
            runtime_config: root.runtime_config,
            assets,
            root_assets: root.root_assets,
            build_info,
        };
        Ok(CrawlReport {
            build,
            failures,
            stats,
        })
    }

    /// Wait for every frontier fetch and classify what arrived.
    async fn settle(
        &self,
        frontier: &[String],
        pending: Vec<FetchHandle>,
        pool: &Arc<ClassifierPool>,
    ) -> Vec<Option<Settled>> {
        let deadline = self.config.classify_deadline;
        let mut tasks = JoinSet::new();
        for (index, (name, handle)) in frontier.iter().zip(pending).enumerate() {
            let pool = Arc::clone(pool);
            let name = name.clone();
            tasks.spawn(settle_one(index, name, handle, pool, deadline));
        }

        let mut settled: Vec<Option<Settled>> = frontier.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(done) => {
                    let index = done.index;
                    settled[index] = Some(done);
                }
                Err(err) => log::error!("Classification task failed: {err}"),
            }
        }
        settled
    }

    async fn fetcher(&self) -> AssetFetcher {
        let retry = RetryPolicy {
            attempts: self.config.retry_attempts,
            delay: self.config.retry_delay,
        };
        let fetcher = AssetFetcher::new(
            Arc::clone(&self.transport),
            self.config.asset_base_url(),
            retry,
        );
        let Some(dir) = &self.config.blob_dir else {
            return fetcher;
        };
        match BlobStore::open(dir.clone()).await {
            Ok(blobs) => fetcher.with_blob_store(blobs),
            Err(err) => {
                log::warn!("Blob store {} unavailable, continuing without: {err}", dir.display());
                fetcher
            }
        }
    }

    fn enter(&self, state: CrawlState) {
        log::info!("[{}] {state}", self.config.release_channel.as_str());
    }
}

fn submit_fetches(
    queue: &TaskQueue,
    fetcher: &Arc<AssetFetcher>,
    names: &[String],
) -> Vec<FetchHandle> {
    queue.submit_all(names.iter().map(|name| {
        let fetcher = Arc::clone(fetcher);
        let name = name.clone();
        async move { fetcher.fetch(&name).await }
    }))
}

async fn settle_one(
    index: usize,
    name: String,
    handle: FetchHandle,
    pool: Arc<ClassifierPool>,
    deadline: Duration,
) -> Settled {
    let metadata = match handle.join().await {
        Ok(Ok(metadata)) => metadata,
        Ok(Err(failure)) => {
            return Settled {
                index,
                fetched: false,
                outcome: Err(failure.into()),
            }
        }
        Err(err) => {
            return Settled {
                index,
                fetched: false,
                outcome: Err(AssetFailure {
                    name,
                    stage: FailureStage::Fetch,
                    attempts: 0,
                    message: err.to_string(),
                }),
            }
        }
    };

    let outcome = pool
        .classify(ClassifyRequest::new(name.clone(), metadata), deadline)
        .await
        .map_err(|err| AssetFailure {
            name,
            stage: FailureStage::Classify,
            attempts: 0,
            message: err.to_string(),
        });
    Settled {
        index,
        fetched: true,
        outcome,
    }
}
