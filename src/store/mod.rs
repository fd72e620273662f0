// src/store/mod.rs
//! Key-value capability shared by the three stores (feed definitions, source
//! cache, aggregate cache). Expiry is lazy: an entry past its deadline reads as
//! absent but stays in storage until the next write for that key.

pub mod file;
pub mod memory;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::StoreError;

pub use file::FileStore;
pub use memory::MemoryStore;

#[async_trait::async_trait]
pub trait KvStore: Send + Sync {
    /// Value for `key`, or `None` when missing or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Insert or overwrite. `ttl = None` never expires.
    async fn put(&self, key: &str, value: String, ttl: Option<Duration>)
        -> Result<(), StoreError>;
}

pub type SharedStore = Arc<dyn KvStore>;

/// Absolute deadline for a TTL. Out-of-range TTLs never expire.
pub(crate) fn expiry_after(now: DateTime<Utc>, ttl: Option<Duration>) -> Option<DateTime<Utc>> {
    let ttl = chrono::Duration::from_std(ttl?).ok()?;
    now.checked_add_signed(ttl)
}

pub(crate) fn is_fresh(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    expires_at.map_or(true, |deadline| now < deadline)
}
