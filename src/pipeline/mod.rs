// src/pipeline/mod.rs
//! Request-level pipeline: definition lookup -> aggregate cache -> build ->
//! serialize -> write-through.
//!
//! Concurrent builds of one feed id (or fetches of one source URL) may race on
//! the same cache key. Last write wins.

pub mod aggregate_cache;
pub mod aggregator;
pub mod fetcher;
pub mod source_cache;

use std::sync::Arc;

use anyhow::Context;
use metrics::{counter, histogram};

use crate::config::{AppConfig, StoreBackend};
use crate::error::ServiceError;
use crate::feed::serialize_feed;
use crate::registry::{parse_source_list, FeedDefinition, FeedRegistry};
use crate::store::{FileStore, MemoryStore, SharedStore};

pub use aggregate_cache::AggregateCache;
pub use aggregator::Aggregator;
pub use fetcher::{HttpFetcher, SharedFetcher, SourceFetcher, StaticFetcher};
pub use source_cache::SourceCache;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_header(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderedFeed {
    pub xml: String,
    pub cache: CacheStatus,
}

/// The three stores the pipeline reads and writes.
#[derive(Clone)]
pub struct Stores {
    pub definitions: SharedStore,
    pub sources: SharedStore,
    pub aggregates: SharedStore,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            definitions: Arc::new(MemoryStore::new()),
            sources: Arc::new(MemoryStore::new()),
            aggregates: Arc::new(MemoryStore::new()),
        }
    }

    pub fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        match cfg.store_backend {
            StoreBackend::Memory => Ok(Self::in_memory()),
            StoreBackend::File => {
                let open = |name: &str| -> anyhow::Result<SharedStore> {
                    let dir = cfg.store_dir.join(name);
                    let store = FileStore::open(&dir)
                        .with_context(|| format!("opening store at {}", dir.display()))?;
                    Ok(Arc::new(store))
                };
                Ok(Self {
                    definitions: open("feeds")?,
                    sources: open("sources")?,
                    aggregates: open("aggregates")?,
                })
            }
        }
    }
}

pub struct FeedService {
    registry: FeedRegistry,
    aggregator: Aggregator,
    results: AggregateCache,
}

impl FeedService {
    pub fn new(registry: FeedRegistry, aggregator: Aggregator, results: AggregateCache) -> Self {
        Self {
            registry,
            aggregator,
            results,
        }
    }

    /// Wire stores + fetcher according to `cfg`.
    pub fn from_parts(cfg: &AppConfig, stores: Stores, fetcher: SharedFetcher) -> Self {
        let sources = SourceCache::with_ttl(stores.sources, fetcher, cfg.source_cache_ttl());
        let results = AggregateCache::new(stores.aggregates)
            .with_ttl(cfg.aggregate_cache_ttl())
            .with_writes(cfg.aggregate_cache_enabled);
        Self::new(
            FeedRegistry::new(stores.definitions),
            Aggregator::new(sources, cfg.public_base_url.clone()),
            results,
        )
    }

    pub fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        let stores = Stores::from_config(cfg)?;
        let fetcher = HttpFetcher::new(&cfg.http_user_agent, cfg.http_timeout())?;
        Ok(Self::from_parts(cfg, stores, Arc::new(fetcher)))
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub fn feed_url(&self, feed_id: &str) -> String {
        self.aggregator.feed_url(feed_id)
    }

    /// Register the newline-separated URL list under a new id.
    pub async fn create_feed(&self, raw_urls: &str) -> Result<FeedDefinition, ServiceError> {
        let sources = parse_source_list(raw_urls);
        let def = self.registry.create(sources).await?;
        counter!("feeds_created_total").increment(1);
        Ok(def)
    }

    pub async fn definition(&self, feed_id: &str) -> Result<FeedDefinition, ServiceError> {
        self.registry
            .get(feed_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(feed_id.to_string()))
    }

    /// Merged feed XML for `feed_id`, from cache or freshly built.
    pub async fn render(&self, feed_id: &str) -> Result<RenderedFeed, ServiceError> {
        let def = self.definition(feed_id).await?;

        if let Some(xml) = self.results.get(feed_id).await {
            counter!("aggregate_cache_hits_total").increment(1);
            tracing::debug!(target: "pipeline", %feed_id, "aggregate cache hit");
            return Ok(RenderedFeed {
                xml,
                cache: CacheStatus::Hit,
            });
        }
        counter!("aggregate_cache_misses_total").increment(1);

        let t0 = std::time::Instant::now();
        let feed = match self.aggregator.build(feed_id, &def.sources).await {
            Ok(f) => f,
            Err(e) => {
                counter!("aggregate_build_failures_total").increment(1);
                tracing::warn!(target: "pipeline", %feed_id, source = %e.url, error = %e.cause, "build failed");
                return Err(e.into());
            }
        };
        let xml = serialize_feed(&feed);
        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("aggregate_build_ms").record(ms);

        tracing::info!(
            target: "pipeline",
            %feed_id,
            sources = feed.source_count,
            items = feed.items.len(),
            elapsed_ms = ms,
            "feed built"
        );

        self.results.put(feed_id, xml.clone()).await;
        Ok(RenderedFeed {
            xml,
            cache: CacheStatus::Miss,
        })
    }
}
