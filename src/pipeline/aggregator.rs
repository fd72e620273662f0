// src/pipeline/aggregator.rs
//! Fan-out fetch of every source, then parse and concatenate.
//!
//! Item order is source-list order, then document order inside each source. No
//! sorting by date and no dedup across sources. A single failing source fails
//! the whole build; in-flight siblings still run to completion but their
//! results are dropped.

use futures::future::join_all;

use super::source_cache::SourceCache;
use crate::error::{BuildError, SourceFailure};
use crate::feed::{parse_feed, AggregateFeed};

pub struct Aggregator {
    sources: SourceCache,
    base_url: String,
}

impl Aggregator {
    pub fn new(sources: SourceCache, base_url: impl Into<String>) -> Self {
        Self {
            sources,
            base_url: base_url.into(),
        }
    }

    /// Canonical retrieval URL for `feed_id`.
    pub fn feed_url(&self, feed_id: &str) -> String {
        feed_url(&self.base_url, feed_id)
    }

    pub async fn build(
        &self,
        feed_id: &str,
        source_urls: &[String],
    ) -> Result<AggregateFeed, BuildError> {
        let fetched = join_all(source_urls.iter().map(|u| self.sources.fetch_or_load(u))).await;

        // Every fetch has settled; report the first failure in source-list order.
        let mut bodies = Vec::with_capacity(fetched.len());
        for (url, res) in source_urls.iter().zip(fetched) {
            match res {
                Ok(body) => bodies.push(body),
                Err(e) => return Err(source_error(url, e)),
            }
        }

        let mut items = Vec::new();
        for (url, body) in source_urls.iter().zip(bodies) {
            let parsed = parse_feed(&body).map_err(|e| source_error(url, e))?;
            tracing::debug!(
                target: "aggregator",
                %feed_id, %url,
                channel = %parsed.channel_title,
                items = parsed.items.len(),
                "source parsed"
            );
            let channel = parsed.channel_title;
            items.extend(parsed.items.into_iter().map(|mut it| {
                it.title = compose_title(&it.title, &channel);
                it
            }));
        }

        Ok(AggregateFeed {
            title: feed_id.to_string(),
            link: self.feed_url(feed_id),
            source_count: source_urls.len(),
            items,
        })
    }
}

fn source_error(url: &str, cause: impl Into<SourceFailure>) -> BuildError {
    BuildError {
        url: url.to_string(),
        cause: cause.into(),
    }
}

/// `"{item} :: {channel}"`, so every merged item shows where it came from.
pub fn compose_title(item_title: &str, channel_title: &str) -> String {
    format!("{item_title} :: {channel_title}")
}

pub fn feed_url(base_url: &str, feed_id: &str) -> String {
    format!("{}/feed/{}.xml", base_url.trim_end_matches('/'), feed_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_suffix_and_feed_url() {
        assert_eq!(compose_title("Ep1", "Show A"), "Ep1 :: Show A");
        assert_eq!(compose_title("", "Show A"), " :: Show A");
        assert_eq!(
            feed_url("https://agg.example/", "abcde"),
            "https://agg.example/feed/abcde.xml"
        );
    }
}
