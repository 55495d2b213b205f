use buildscope_classifier::ClassifierError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CrawlError>;

/// Failure of one fetch attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP error: status {status}")]
    Http { status: u16 },

    #[error("Empty response body")]
    EmptyBody,

    #[error("Invalid asset name '{0}'")]
    InvalidName(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl FetchError {
    /// Transport, status and empty-body failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Http { .. } | Self::EmptyBody
        )
    }

    /// Short label used in logs and failure records.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Http { .. } => "http",
            Self::EmptyBody => "empty_body",
            Self::InvalidName(_) => "invalid_name",
            Self::Io(_) => "io",
        }
    }
}

/// Last error for an asset once its retry budget is spent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to fetch {name} after {attempts} attempt(s): {error}")]
pub struct FetchFailure {
    pub name: String,
    pub attempts: u32,
    pub error: FetchError,
}

impl From<FetchFailure> for AssetFailure {
    fn from(failure: FetchFailure) -> Self {
        Self {
            message: failure.error.to_string(),
            name: failure.name,
            stage: FailureStage::Fetch,
            attempts: failure.attempts,
        }
    }
}

impl From<std::io::Error> for FetchError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Concurrency must be at least 1, got {0}")]
    InvalidConcurrency(usize),

    #[error("Task panicked: {0}")]
    TaskPanicked(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("Classification of {name} exceeded {deadline:?}")]
    ClassificationTimeout { name: String, deadline: Duration },

    #[error("Classification pool is shut down")]
    ShutDown,

    #[error("Worker panicked while classifying {name}")]
    WorkerPanicked { name: String },

    #[error("Pool size must be at least 1, got {0}")]
    InvalidSize(usize),

    #[error("Failed to start worker: {0}")]
    WorkerStart(String),

    #[error("{0}")]
    Classifier(#[from] ClassifierError),
}

/// Run-level failures. Asset-level failures never surface here; they are
/// recorded as [`AssetFailure`]s on the crawl report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Manifest fetch failed: {0}")]
    ManifestFetch(String),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Fetch,
    Classify,
}

/// Terminal failure attributed to one asset name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetFailure {
    pub name: String,
    pub stage: FailureStage,
    /// Fetch attempts made; zero for classification failures.
    pub attempts: u32,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_network_failures_retry() {
        assert!(FetchError::Transport("reset".into()).is_retryable());
        assert!(FetchError::Http { status: 503 }.is_retryable());
        assert!(FetchError::EmptyBody.is_retryable());
        assert!(!FetchError::InvalidName("../x".into()).is_retryable());
        assert!(!FetchError::Io("disk full".into()).is_retryable());
    }
}
