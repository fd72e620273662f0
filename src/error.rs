// src/error.rs
//! Error taxonomy for the aggregation pipeline.
//!
//! `FetchError` and `ParseError` describe a single source; `BuildError` wraps the
//! first of them hit during an aggregation and remembers which source URL failed.

use thiserror::Error;

/// Failure of the key-value backend behind one of the stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io: {0}")]
    Io(#[from] std::io::Error),
    #[error("store codec: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Network failure while fetching one source feed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },
}

/// The document is not a usable RSS 2.0 feed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("malformed xml: {0}")]
    Xml(String),
    #[error("expected <rss> root element, found <{0}>")]
    NotRss(String),
    #[error("document has no root element")]
    Empty,
    #[error("rss structure: {0}")]
    Structure(String),
}

/// What went wrong with a single source during a build.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceFailure {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// An aggregation aborted because one source failed. No partial feed exists.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("building feed failed at source {url}: {cause}")]
pub struct BuildError {
    pub url: String,
    #[source]
    pub cause: SourceFailure,
}

/// Errors surfaced by `FeedService` to the HTTP layer.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("feed {0} not found")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("could not allocate a free feed id after {0} attempts")]
    IdSpaceExhausted(usize),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
