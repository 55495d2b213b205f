use buildscope_protocol::ReleaseChannel;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_FETCH_CONCURRENCY: usize = 32;
pub const MAX_FETCH_CONCURRENCY: usize = 256;
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 5;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);
pub const DEFAULT_CLASSIFY_DEADLINE: Duration = Duration::from_secs(10);

/// Crawler settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    pub release_channel: ReleaseChannel,

    /// Origin override; defaults to the channel's domain
    pub domain: Option<String>,

    /// Path of the root document on the origin
    pub app_path: String,

    /// Path under which assets are served
    pub assets_path: String,

    /// Concurrent network fetches
    pub fetch_concurrency: usize,

    /// Classification workers; `None` uses available parallelism
    pub classify_workers: Option<usize>,

    /// Total attempts per asset, including the first
    pub retry_attempts: u32,

    #[serde(with = "duration_ms")]
    pub retry_delay: Duration,

    #[serde(with = "duration_ms")]
    pub classify_deadline: Duration,

    /// Keep raw asset bodies on disk, keyed by asset name
    pub blob_dir: Option<PathBuf>,

    /// Authenticated endpoint resolving a build by identifier
    pub lookup_url: Option<String>,

    pub lookup_auth: Option<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            release_channel: ReleaseChannel::default(),
            domain: None,
            app_path: "/app".to_string(),
            assets_path: "/assets".to_string(),
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
            classify_workers: None,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            classify_deadline: DEFAULT_CLASSIFY_DEADLINE,
            blob_dir: None,
            lookup_url: None,
            lookup_auth: None,
        }
    }
}

impl CrawlerConfig {
    pub fn for_channel(release_channel: ReleaseChannel) -> Self {
        Self {
            release_channel,
            ..Default::default()
        }
    }

    /// Overlay `BUILDSCOPE_*` environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        if let Some(url) = var("BUILDSCOPE_LOOKUP_URL") {
            self.lookup_url = Some(url);
        }
        if let Some(auth) = var("BUILDSCOPE_LOOKUP_AUTH") {
            self.lookup_auth = Some(auth);
        }
        if let Some(dir) = var("BUILDSCOPE_BLOB_DIR") {
            self.blob_dir = Some(PathBuf::from(dir));
        }
        self.fetch_concurrency = parse_count(
            var("BUILDSCOPE_FETCH_CONCURRENCY").as_deref(),
            self.fetch_concurrency,
            MAX_FETCH_CONCURRENCY,
        );
        if let Some(raw) = var("BUILDSCOPE_WORKERS") {
            self.classify_workers = Some(parse_count(
                Some(&raw),
                self.worker_count(),
                available_parallelism() * 4,
            ));
        }
        self
    }

    /// Origin for the configured channel
    pub fn origin(&self) -> String {
        self.domain
            .as_deref()
            .unwrap_or_else(|| self.release_channel.default_domain())
            .trim_end_matches('/')
            .to_string()
    }

    pub fn app_url(&self) -> String {
        format!("{}{}", self.origin(), self.app_path)
    }

    pub fn asset_base_url(&self) -> String {
        format!("{}{}", self.origin(), self.assets_path.trim_end_matches('/'))
    }

    pub fn worker_count(&self) -> usize {
        self.classify_workers
            .unwrap_or_else(available_parallelism)
            .max(1)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.fetch_concurrency == 0 {
            return Err("fetch_concurrency must be > 0".to_string());
        }
        if self.classify_workers == Some(0) {
            return Err("classify_workers must be > 0".to_string());
        }
        if self.retry_attempts == 0 {
            return Err("retry_attempts must be > 0".to_string());
        }
        if self.classify_deadline.is_zero() {
            return Err("classify_deadline must be > 0".to_string());
        }
        if !self.app_path.starts_with('/') || !self.assets_path.starts_with('/') {
            return Err(format!(
                "app_path ({}) and assets_path ({}) must start with '/'",
                self.app_path, self.assets_path
            ));
        }
        Ok(())
    }
}

fn available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn parse_count(raw: Option<&str>, default_value: usize, max: usize) -> usize {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default_value)
        .clamp(1, max.max(1))
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
