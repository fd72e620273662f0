// src/registry.rs
//! Feed definitions: id generation and the id -> source URL list store.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{ServiceError, StoreError};
use crate::store::SharedStore;

pub const FEED_ID_LEN: usize = 5;
const FEED_ID_ALPHABET: &[u8; 26] = b"abcdefghijklmnopqrstuvwxyz";

/// 26^5 ids; a new id is redrawn while it is already taken.
const MAX_ID_ATTEMPTS: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedDefinition {
    pub id: String,
    pub sources: Vec<String>,
}

/// Five letters, each drawn uniformly and independently from `a..=z`.
pub fn generate_feed_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..FEED_ID_LEN)
        .map(|_| FEED_ID_ALPHABET[rng.random_range(0..FEED_ID_ALPHABET.len())] as char)
        .collect()
}

/// Newline-separated URL list from the create form. Lines are trimmed and
/// blank lines dropped; order and duplicates are kept.
pub fn parse_source_list(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

pub struct FeedRegistry {
    store: SharedStore,
    rng: Mutex<StdRng>,
}

impl FeedRegistry {
    pub fn new(store: SharedStore) -> Self {
        Self {
            store,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Deterministic id sequence.
    pub fn with_seed(store: SharedStore, seed: u64) -> Self {
        Self {
            store,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub async fn get(&self, id: &str) -> Result<Option<FeedDefinition>, StoreError> {
        let Some(raw) = self.store.get(id).await? else {
            return Ok(None);
        };
        let sources: Vec<String> = serde_json::from_str(&raw)?;
        Ok(Some(FeedDefinition {
            id: id.to_string(),
            sources,
        }))
    }

    /// Store `sources` under a fresh id. Definitions never expire.
    pub async fn create(&self, sources: Vec<String>) -> Result<FeedDefinition, ServiceError> {
        if sources.is_empty() {
            return Err(ServiceError::InvalidInput("no source urls"));
        }

        let id = self.free_id().await?;
        let encoded = serde_json::to_string(&sources).map_err(StoreError::from)?;
        self.store.put(&id, encoded, None).await?;

        tracing::info!(target: "registry", feed_id = %id, sources = sources.len(), "feed created");
        Ok(FeedDefinition { id, sources })
    }

    async fn free_id(&self) -> Result<String, ServiceError> {
        for attempt in 1..=MAX_ID_ATTEMPTS {
            let candidate = {
                let mut rng = self.rng.lock().unwrap_or_else(|p| p.into_inner());
                generate_feed_id(&mut *rng)
            };
            if self.store.get(&candidate).await?.is_none() {
                return Ok(candidate);
            }
            tracing::debug!(target: "registry", %candidate, attempt, "feed id taken; redrawing");
        }
        Err(ServiceError::IdSpaceExhausted(MAX_ID_ATTEMPTS))
    }
}
