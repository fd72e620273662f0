// tests/common/mod.rs
// Shared harness: in-memory stores on a manual clock + canned source fetcher.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use rss_aggregator::clock::ManualClock;
use rss_aggregator::config::AppConfig;
use rss_aggregator::pipeline::{FeedService, StaticFetcher, Stores};
use rss_aggregator::store::MemoryStore;
use rss_aggregator::{create_router, AppState};

pub const A_URL: &str = "https://a.example/feed.xml";
pub const B_URL: &str = "https://b.example/rss";
pub const C_URL: &str = "https://c.example/podcast.xml";

pub const SHOW_A: &str = include_str!("../fixtures/show_a.xml");
pub const SHOW_B: &str = include_str!("../fixtures/show_b.xml");
pub const SHOW_C: &str = include_str!("../fixtures/show_c.xml");
pub const ATOM: &str = include_str!("../fixtures/atom.xml");

pub const BASE_URL: &str = "https://agg.example";

pub struct Harness {
    pub state: AppState,
    pub fetcher: Arc<StaticFetcher>,
    pub clock: Arc<ManualClock>,
    pub definitions: Arc<MemoryStore>,
    pub sources: Arc<MemoryStore>,
    pub aggregates: Arc<MemoryStore>,
}

impl Harness {
    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    pub fn service(&self) -> &FeedService {
        &self.state.feeds
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        public_base_url: BASE_URL.to_string(),
        ..AppConfig::default()
    }
}

/// Both fixture shows reachable, default config.
pub fn harness() -> Harness {
    harness_with(test_config())
}

pub fn harness_with(cfg: AppConfig) -> Harness {
    let fetcher = Arc::new(
        StaticFetcher::new()
            .with_body(A_URL, SHOW_A)
            .with_body(B_URL, SHOW_B),
    );
    let clock = Arc::new(ManualClock::starting_now());
    let definitions = Arc::new(MemoryStore::with_clock(clock.clone()));
    let sources = Arc::new(MemoryStore::with_clock(clock.clone()));
    let aggregates = Arc::new(MemoryStore::with_clock(clock.clone()));

    let stores = Stores {
        definitions: definitions.clone(),
        sources: sources.clone(),
        aggregates: aggregates.clone(),
    };
    let service = FeedService::from_parts(&cfg, stores, fetcher.clone());

    Harness {
        state: AppState::new(service),
        fetcher,
        clock,
        definitions,
        sources,
        aggregates,
    }
}
