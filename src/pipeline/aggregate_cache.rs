// src/pipeline/aggregate_cache.rs
//! feed id -> serialized merged feed.
//!
//! Within the TTL a read returns the stored XML byte-for-byte. Writes can be
//! switched off, in which case every request rebuilds.

use std::time::Duration;

use crate::store::SharedStore;

/// Same horizon as the source cache: the merged feed can't be fresher than its sources.
pub const AGGREGATE_TTL: Duration = Duration::from_secs(60 * 60);

pub struct AggregateCache {
    store: SharedStore,
    ttl: Duration,
    write_enabled: bool,
}

impl AggregateCache {
    pub fn new(store: SharedStore) -> Self {
        Self {
            store,
            ttl: AGGREGATE_TTL,
            write_enabled: true,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// `false` skips every write, so nothing is ever served from cache.
    pub fn with_writes(mut self, enabled: bool) -> Self {
        self.write_enabled = enabled;
        self
    }

    pub async fn get(&self, feed_id: &str) -> Option<String> {
        match self.store.get(feed_id).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(target: "aggregate_cache", error = %e, %feed_id, "store read failed; rebuilding");
                None
            }
        }
    }

    pub async fn put(&self, feed_id: &str, xml: String) {
        if !self.write_enabled {
            tracing::debug!(target: "aggregate_cache", %feed_id, "writes disabled; not caching");
            return;
        }
        if let Err(e) = self.store.put(feed_id, xml, Some(self.ttl)).await {
            tracing::warn!(target: "aggregate_cache", error = %e, %feed_id, "store write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn disabled_writes_never_populate() {
        let cache = AggregateCache::new(Arc::new(MemoryStore::new())).with_writes(false);
        cache.put("abcde", "<rss/>".into()).await;
        assert_eq!(cache.get("abcde").await, None);
    }

    #[tokio::test]
    async fn enabled_writes_round_trip_verbatim() {
        let cache = AggregateCache::new(Arc::new(MemoryStore::new()));
        let xml = "<?xml version=\"1.0\"?>\n<rss>  odd   spacing </rss>".to_string();
        cache.put("abcde", xml.clone()).await;
        assert_eq!(cache.get("abcde").await, Some(xml));
    }
}
