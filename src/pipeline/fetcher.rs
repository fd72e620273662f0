// src/pipeline/fetcher.rs
//! Network side of the source cache: one GET per call, no retries.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use anyhow::Context;

use crate::error::FetchError;

#[async_trait::async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Body of `url` on a 2xx answer, `FetchError` otherwise.
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

pub type SharedFetcher = Arc<dyn SourceFetcher>;

/// reqwest-backed fetcher used in production.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// `timeout = None` leaves the transport defaults (no overall timeout).
    pub fn new(user_agent: &str, timeout: Option<Duration>) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(user_agent);
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build().context("building reqwest client")?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl SourceFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        tracing::debug!(target: "fetch", %url, "GET source feed");
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        resp.text().await.map_err(|e| FetchError::Transport {
            url: url.to_string(),
            message: format!("reading body: {e}"),
        })
    }
}

// --- Test helper ---

/// Canned bodies keyed by exact URL. Records every call; unknown URLs answer 404.
#[derive(Default)]
pub struct StaticFetcher {
    responses: RwLock<HashMap<String, Result<String, FetchError>>>,
    calls: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(self, url: &str, body: &str) -> Self {
        self.set_body(url, body);
        self
    }

    pub fn with_status(self, url: &str, status: u16) -> Self {
        self.set_response(
            url,
            Err(FetchError::Status {
                url: url.to_string(),
                status,
            }),
        );
        self
    }

    pub fn set_body(&self, url: &str, body: &str) {
        self.set_response(url, Ok(body.to_string()));
    }

    pub fn set_response(&self, url: &str, response: Result<String, FetchError>) {
        self.responses
            .write()
            .expect("static fetcher lock poisoned")
            .insert(url.to_string(), response);
    }

    /// Total number of fetches performed.
    pub fn calls(&self) -> usize {
        self.calls.lock().expect("static fetcher lock poisoned").len()
    }

    pub fn calls_for(&self, url: &str) -> usize {
        self.calls
            .lock()
            .expect("static fetcher lock poisoned")
            .iter()
            .filter(|u| u.as_str() == url)
            .count()
    }
}

#[async_trait::async_trait]
impl SourceFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.calls
            .lock()
            .expect("static fetcher lock poisoned")
            .push(url.to_string());
        let responses = self.responses.read().expect("static fetcher lock poisoned");
        responses.get(url).cloned().unwrap_or_else(|| {
            Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_fetcher_counts_and_answers_404_for_unknown() {
        let f = StaticFetcher::new().with_body("https://a.example/rss", "<rss/>");
        assert_eq!(f.fetch("https://a.example/rss").await.unwrap(), "<rss/>");
        let err = f.fetch("https://nope.example/").await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
        assert_eq!(f.calls(), 2);
        assert_eq!(f.calls_for("https://a.example/rss"), 1);
    }
}
