use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder (once per process) and publish the
    /// configured cache TTLs as static gauges.
    pub fn init(source_ttl_secs: u64, aggregate_ttl_secs: u64) -> anyhow::Result<Self> {
        let handle = HANDLE
            .get_or_try_init(|| PrometheusBuilder::new().install_recorder())?
            .clone();

        ensure_metrics_described();
        gauge!("source_cache_ttl_secs").set(source_ttl_secs as f64);
        gauge!("aggregate_cache_ttl_secs").set(aggregate_ttl_secs as f64);

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router<S>(&self) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("source_cache_hits_total", "Source fetches served from cache.");
        describe_counter!(
            "source_cache_misses_total",
            "Source fetches that went to the network."
        );
        describe_counter!(
            "source_fetch_errors_total",
            "Source fetches that failed (transport or non-2xx)."
        );
        describe_counter!(
            "aggregate_cache_hits_total",
            "Merged feed requests served from cache."
        );
        describe_counter!(
            "aggregate_cache_misses_total",
            "Merged feed requests that triggered a build."
        );
        describe_counter!(
            "aggregate_build_failures_total",
            "Builds aborted by a failing source."
        );
        describe_histogram!("aggregate_build_ms", "Merged feed build time in milliseconds.");
        describe_counter!("feeds_created_total", "Feed definitions created.");
        describe_gauge!("source_cache_ttl_secs", "Configured source cache TTL.");
        describe_gauge!("aggregate_cache_ttl_secs", "Configured aggregate cache TTL.");
    });
}
