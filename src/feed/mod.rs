// src/feed/mod.rs
//! In-memory feed model shared by the parser, the aggregator and the serializer.

pub mod parser;
pub mod serializer;

use time::OffsetDateTime;

pub use parser::parse_feed;
pub use serializer::serialize_feed;

/// Media attachment of an item. Values are copied verbatim from the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enclosure {
    pub url: String,
    pub mime_type: String,
    pub length: String,
}

/// One item in the common shape used for merging.
///
/// After parsing, `title` is the source item's own title; the aggregator later
/// suffixes it with the source channel title.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedItem {
    pub title: String,
    /// Source item's `<link>`, reused as the merged item's id.
    pub id: Option<String>,
    pub published: Option<OffsetDateTime>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub enclosure: Option<Enclosure>,
}

/// Result of parsing one source document.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFeed {
    pub channel_title: String,
    pub items: Vec<NormalizedItem>,
}

/// The merged feed, ready for serialization.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateFeed {
    /// The feed id itself.
    pub title: String,
    /// Canonical retrieval URL of this feed.
    pub link: String,
    pub source_count: usize,
    pub items: Vec<NormalizedItem>,
}
