// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod feed;
pub mod metrics;
pub mod pipeline;
pub mod registry;
pub mod store;

pub use crate::api::{create_router, AppState};
pub use crate::config::AppConfig;
pub use crate::error::{BuildError, FetchError, ParseError, ServiceError, SourceFailure};
pub use crate::pipeline::FeedService;

use axum::Router;
use tracing::info;

/// Build the full app from `AppConfig::load()` (config file + env).
pub async fn app() -> anyhow::Result<Router> {
    let cfg = AppConfig::load()?;
    app_with(&cfg)
}

/// Build the full app from an explicit config, with the real HTTP fetcher.
pub fn app_with(cfg: &AppConfig) -> anyhow::Result<Router> {
    let service = FeedService::from_config(cfg)?;
    info!(
        backend = ?cfg.store_backend,
        base_url = %cfg.public_base_url,
        source_ttl_secs = cfg.source_cache_ttl_secs,
        aggregate_cache = cfg.aggregate_cache_enabled,
        "rss aggregator configured"
    );

    let mut router = create_router(AppState::new(service));
    if cfg.debug_routes {
        let m = crate::metrics::Metrics::init(
            cfg.source_cache_ttl_secs,
            cfg.aggregate_cache_ttl_secs,
        )?;
        router = router.merge(m.router());
    }
    Ok(router)
}
