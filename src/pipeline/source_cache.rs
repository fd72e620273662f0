// src/pipeline/source_cache.rs
//! URL -> raw feed document, with a fixed TTL.
//!
//! Store failures degrade to a miss (read) or a logged warning (write); only the
//! network fetch can fail a lookup. Expired entries are never served.

use std::time::Duration;

use metrics::counter;

use super::fetcher::SharedFetcher;
use crate::error::FetchError;
use crate::store::SharedStore;

/// Source documents are refetched at most once an hour.
pub const SOURCE_TTL: Duration = Duration::from_secs(60 * 60);

pub struct SourceCache {
    store: SharedStore,
    fetcher: SharedFetcher,
    ttl: Duration,
}

impl SourceCache {
    pub fn new(store: SharedStore, fetcher: SharedFetcher) -> Self {
        Self::with_ttl(store, fetcher, SOURCE_TTL)
    }

    pub fn with_ttl(store: SharedStore, fetcher: SharedFetcher, ttl: Duration) -> Self {
        Self {
            store,
            fetcher,
            ttl,
        }
    }

    /// Cached body for `url` if still fresh.
    pub async fn get(&self, url: &str) -> Option<String> {
        match self.store.get(url).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(target: "source_cache", error = %e, %url, "store read failed; treating as miss");
                None
            }
        }
    }

    pub async fn put(&self, url: &str, content: String, ttl: Duration) {
        if let Err(e) = self.store.put(url, content, Some(ttl)).await {
            tracing::warn!(target: "source_cache", error = %e, %url, "store write failed");
        }
    }

    /// Fresh cache entry, or a network fetch that repopulates the cache.
    pub async fn fetch_or_load(&self, url: &str) -> Result<String, FetchError> {
        if let Some(body) = self.get(url).await {
            counter!("source_cache_hits_total").increment(1);
            tracing::debug!(target: "source_cache", %url, "hit");
            return Ok(body);
        }
        counter!("source_cache_misses_total").increment(1);

        let body = match self.fetcher.fetch(url).await {
            Ok(b) => b,
            Err(e) => {
                counter!("source_fetch_errors_total").increment(1);
                tracing::warn!(target: "source_cache", error = %e, %url, "source fetch failed");
                return Err(e);
            }
        };

        self.put(url, body.clone(), self.ttl).await;
        tracing::debug!(target: "source_cache", %url, bytes = body.len(), "fetched and cached");
        Ok(body)
    }
}
