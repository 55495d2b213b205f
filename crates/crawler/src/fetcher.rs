use crate::blob::BlobStore;
use crate::error::{FetchError, FetchFailure};
use crate::transport::{HttpResponse, HttpTransport};
use buildscope_protocol::AssetMetadata;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Fixed-delay retry with a ceiling on total attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: crate::config::DEFAULT_RETRY_ATTEMPTS,
            delay: crate::config::DEFAULT_RETRY_DELAY,
        }
    }
}

/// Retrieves assets from `<base>/<name>`.
///
/// Metadata of every successful response is recorded for the lifetime of the
/// fetcher; a completed asset is never requested twice.
pub struct AssetFetcher {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    retry: RetryPolicy,
    blobs: Option<BlobStore>,
    results: Mutex<HashMap<String, AssetMetadata>>,
}

impl AssetFetcher {
    pub fn new(transport: Arc<dyn HttpTransport>, base_url: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            transport,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry,
            blobs: None,
            results: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn with_blob_store(mut self, blobs: BlobStore) -> Self {
        self.blobs = Some(blobs);
        self
    }

    pub fn url_for(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name)
    }

    /// Recorded metadata for `name`, complete or not.
    pub fn metadata(&self, name: &str) -> Option<AssetMetadata> {
        self.results().get(name).cloned()
    }

    pub async fn fetch(&self, name: &str) -> Result<AssetMetadata, FetchFailure> {
        if let Some(done) = self.metadata(name).filter(|m| m.text.is_some()) {
            log::debug!("{name}: already fetched");
            return Ok(done);
        }

        let attempts = self.retry.attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.fetch_once(name).await {
                Ok(metadata) => {
                    self.keep_blob(name, &metadata).await;
                    return Ok(metadata);
                }
                Err(error) if error.is_retryable() && attempt < attempts => {
                    log::warn!(
                        "{name}: {} failure on attempt {attempt}/{attempts}: {error}; retrying in {:?}",
                        error.kind(),
                        self.retry.delay
                    );
                    tokio::time::sleep(self.retry.delay).await;
                    attempt += 1;
                }
                Err(error) => {
                    log::warn!("{name}: giving up after {attempt} attempt(s): {error}");
                    return Err(FetchFailure {
                        name: name.to_string(),
                        attempts: attempt,
                        error,
                    });
                }
            }
        }
    }

    async fn fetch_once(&self, name: &str) -> Result<AssetMetadata, FetchError> {
        let response = self.transport.get(&self.url_for(name)).await?;
        if !response.is_success() {
            return Err(FetchError::Http {
                status: response.status,
            });
        }

        // Recorded before the body is judged so later failures keep the headers.
        let mut metadata = metadata_from_headers(&response);
        self.results().insert(name.to_string(), metadata.clone());

        if response.body.is_empty() {
            return Err(FetchError::EmptyBody);
        }
        metadata.text = Some(response.body);
        self.results().insert(name.to_string(), metadata.clone());
        Ok(metadata)
    }

    async fn keep_blob(&self, name: &str, metadata: &AssetMetadata) {
        let (Some(blobs), Some(text)) = (&self.blobs, metadata.text.as_deref()) else {
            return;
        };
        // The store is a cache; losing an entry never affects the crawl.
        match blobs.store(name, text).await {
            Ok(true) => log::debug!("{name}: stored in {}", blobs.dir().display()),
            Ok(false) => {}
            Err(err) => log::warn!("{name}: not stored: {err}"),
        }
    }

    fn results(&self) -> MutexGuard<'_, HashMap<String, AssetMetadata>> {
        self.results.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn metadata_from_headers(response: &HttpResponse) -> AssetMetadata {
    AssetMetadata {
        content_type: response.header("content-type").map(str::to_string),
        last_modified: response.header("last-modified").and_then(parse_http_date),
        text: None,
    }
}

/// Parse an HTTP-date header value (`Tue, 15 Nov 1994 08:12:31 GMT`).
pub fn parse_http_date(raw: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc2822(raw.trim()) {
        Ok(date) => Some(date.with_timezone(&Utc)),
        Err(err) => {
            log::debug!("unparsable date '{raw}': {err}");
            None
        }
    }
}
