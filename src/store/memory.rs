//! In-process store. Default backend and the fake used by tests.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::{expiry_after, is_fresh, KvStore};
use crate::clock::{SharedClock, SystemClock};
use crate::error::StoreError;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

pub struct MemoryStore {
    inner: RwLock<HashMap<String, Entry>>,
    clock: SharedClock,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: SharedClock) -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Raw stored value, ignoring expiry.
    pub fn peek(&self, key: &str) -> Option<String> {
        let g = self.inner.read().unwrap_or_else(|p| p.into_inner());
        g.get(key).map(|e| e.value.clone())
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = self.clock.now();
        let g = self.inner.read().unwrap_or_else(|p| p.into_inner());
        Ok(g
            .get(key)
            .filter(|e| is_fresh(e.expires_at, now))
            .map(|e| e.value.clone()))
    }

    async fn put(
        &self,
        key: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError> {
        let expires_at = expiry_after(self.clock.now(), ttl);
        let mut g = self.inner.write().unwrap_or_else(|p| p.into_inner());
        g.insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[tokio::test]
    async fn expired_entry_reads_absent_but_is_kept() {
        let clock = Arc::new(ManualClock::starting_now());
        let store = MemoryStore::with_clock(clock.clone());

        store
            .put("k", "v".into(), Some(Duration::from_secs(60)))
            .await
            .unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));

        clock.advance_secs(61);
        assert_eq!(store.get("k").await.unwrap(), None);
        assert_eq!(store.peek("k").as_deref(), Some("v"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn keys_are_exact_strings() {
        let store = MemoryStore::new();
        store
            .put("https://a.example/feed", "x".into(), None)
            .await
            .unwrap();
        assert!(store.get("https://a.example/feed/").await.unwrap().is_none());
        assert!(store.get("https://A.example/feed").await.unwrap().is_none());
    }
}
