use crate::error::FetchError;
use crate::transport::{HttpResponse, HttpTransport};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

type Script = Vec<Result<HttpResponse, FetchError>>;

/// In-memory [`HttpTransport`] serving scripted responses per URL.
///
/// The n-th request for a URL gets the n-th scripted outcome; the last one
/// repeats. Unknown URLs answer 404.
#[derive(Default)]
pub struct MemoryTransport {
    routes: Mutex<HashMap<String, Script>>,
    calls: Mutex<HashMap<String, u32>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer `url` with `response`.
    pub fn route(&self, url: impl Into<String>, response: HttpResponse) {
        self.script(url, vec![Ok(response)]);
    }

    pub fn script(&self, url: impl Into<String>, outcomes: Script) {
        lock(&self.routes).insert(url.into(), outcomes);
    }

    /// Requests made for `url` so far.
    pub fn calls(&self, url: &str) -> u32 {
        lock(&self.calls).get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> u32 {
        lock(&self.calls).values().sum()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl HttpTransport for MemoryTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        let index = {
            let mut calls = lock(&self.calls);
            let count = calls.entry(url.to_string()).or_insert(0);
            *count += 1;
            (*count - 1) as usize
        };

        let routes = lock(&self.routes);
        match routes.get(url) {
            Some(script) if !script.is_empty() => script[index.min(script.len() - 1)].clone(),
            _ => Ok(HttpResponse::status(404)),
        }
    }
}
