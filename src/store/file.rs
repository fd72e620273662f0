//! Directory-backed store: one JSON record per key.
//!
//! File names are the SHA-256 of the key so URLs can be used as keys. Writes go
//! to a temp file first and are renamed into place.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{expiry_after, is_fresh, KvStore};
use crate::clock::{SharedClock, SystemClock};
use crate::error::StoreError;

#[derive(Debug, Serialize, Deserialize)]
struct Record {
    key: String,
    value: String,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
}

pub struct FileStore {
    dir: PathBuf,
    clock: SharedClock,
}

impl FileStore {
    /// Opens (and creates if needed) `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open_with_clock(dir, Arc::new(SystemClock))
    }

    pub fn open_with_clock(dir: impl AsRef<Path>, clock: SharedClock) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir, clock })
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key_digest(key)))
    }
}

fn key_digest(key: &str) -> String {
    use std::fmt::Write as _;
    let digest = Sha256::digest(key.as_bytes());
    let mut out = String::with_capacity(64);
    for b in digest.iter() {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

#[async_trait::async_trait]
impl KvStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.record_path(key);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let rec: Record = serde_json::from_str(&raw)?;
        if rec.key != key || !is_fresh(rec.expires_at, self.clock.now()) {
            return Ok(None);
        }
        Ok(Some(rec.value))
    }

    async fn put(
        &self,
        key: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError> {
        let rec = Record {
            key: key.to_string(),
            value,
            expires_at: expiry_after(self.clock.now(), ttl),
        };
        let json = serde_json::to_vec(&rec)?;

        let path = self.record_path(key);
        // Unique temp name: concurrent writers of one key must not share it.
        let tmp = path.with_extension(format!("{:08x}.tmp", rand::random::<u32>()));
        if let Err(e) = tokio::fs::write(&tmp, json).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[tokio::test]
    async fn round_trips_and_survives_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        {
            let store = FileStore::open(tmp.path()).unwrap();
            store
                .put("https://a.example/rss?x=1", "<rss/>".into(), None)
                .await
                .unwrap();
        }
        let store = FileStore::open(tmp.path()).unwrap();
        assert_eq!(
            store.get("https://a.example/rss?x=1").await.unwrap().as_deref(),
            Some("<rss/>")
        );
        assert!(store.get("https://a.example/rss").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expiry_is_checked_on_read() {
        let tmp = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::starting_now());
        let store = FileStore::open_with_clock(tmp.path(), clock.clone()).unwrap();

        store
            .put("feed", "body".into(), Some(Duration::from_secs(3600)))
            .await
            .unwrap();
        clock.advance_secs(3599);
        assert!(store.get("feed").await.unwrap().is_some());
        clock.advance_secs(1);
        assert!(store.get("feed").await.unwrap().is_none());

        // Still on disk until overwritten.
        assert!(store.record_path("feed").exists());
    }

    #[tokio::test]
    async fn failed_rename_leaves_no_temp_file() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::open(tmp.path()).unwrap();
        // A directory where the record should go makes the rename fail.
        std::fs::create_dir(store.record_path("k")).unwrap();

        let res = store.put("k", "v".into(), None).await;
        assert!(matches!(res, Err(StoreError::Io(_))), "{res:?}");

        let leftovers: Vec<_> = std::fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "{leftovers:?}");
    }
}
