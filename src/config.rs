// src/config.rs
//! Service configuration: TOML file first, then environment overrides.
//!
//! File lookup:
//! 1) $AGGREGATOR_CONFIG_PATH (must exist)
//! 2) config/aggregator.toml (optional)
//! 3) built-in defaults

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_CONFIG_PATH: &str = "AGGREGATOR_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/aggregator.toml";

const ENV_PUBLIC_BASE_URL: &str = "PUBLIC_BASE_URL";
const ENV_SOURCE_TTL: &str = "SOURCE_CACHE_TTL_SECS";
const ENV_AGGREGATE_TTL: &str = "AGGREGATE_CACHE_TTL_SECS";
const ENV_AGGREGATE_ENABLED: &str = "AGGREGATE_CACHE_ENABLED";
const ENV_STORE_BACKEND: &str = "STORE_BACKEND";
const ENV_STORE_DIR: &str = "STORE_DIR";
const ENV_USER_AGENT: &str = "HTTP_USER_AGENT";
const ENV_HTTP_TIMEOUT: &str = "HTTP_TIMEOUT_SECS";
const ENV_DEBUG_ROUTES: &str = "DEBUG_ROUTES";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    File,
}

impl std::str::FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            other => Err(anyhow!("unknown store backend '{other}' (expected memory|file)")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Prefix of the canonical link written into each merged feed.
    pub public_base_url: String,
    pub source_cache_ttl_secs: u64,
    pub aggregate_cache_ttl_secs: u64,
    /// `false` reproduces the uncached behavior: every request rebuilds.
    pub aggregate_cache_enabled: bool,
    pub store_backend: StoreBackend,
    /// Root for the file backend; one subdirectory per store.
    pub store_dir: PathBuf,
    pub http_user_agent: String,
    /// Unset means no timeout beyond the transport's own.
    pub http_timeout_secs: Option<u64>,
    /// Exposes `/metrics`.
    pub debug_routes: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            public_base_url: "http://localhost:8000".to_string(),
            source_cache_ttl_secs: 3600,
            aggregate_cache_ttl_secs: 3600,
            aggregate_cache_enabled: true,
            store_backend: StoreBackend::Memory,
            store_dir: PathBuf::from("data"),
            http_user_agent: concat!("rss-aggregator/", env!("CARGO_PKG_VERSION")).to_string(),
            http_timeout_secs: None,
            debug_routes: false,
        }
    }
}

impl AppConfig {
    /// File (if any) + env overrides.
    pub fn load() -> Result<Self> {
        let mut cfg = match std::env::var(ENV_CONFIG_PATH) {
            Ok(p) => {
                let path = PathBuf::from(p);
                if !path.exists() {
                    return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
                }
                Self::load_from(&path)?
            }
            Err(_) => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if default.exists() {
                    Self::load_from(default)?
                } else {
                    Self::default()
                }
            }
        };
        cfg.apply_env()?;
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(v) = env_str(ENV_PUBLIC_BASE_URL) {
            self.public_base_url = v;
        }
        if let Some(v) = env_parse(ENV_SOURCE_TTL)? {
            self.source_cache_ttl_secs = v;
        }
        if let Some(v) = env_parse(ENV_AGGREGATE_TTL)? {
            self.aggregate_cache_ttl_secs = v;
        }
        if let Some(v) = env_str(ENV_AGGREGATE_ENABLED) {
            self.aggregate_cache_enabled = parse_flag(&v);
        }
        if let Some(v) = env_str(ENV_STORE_BACKEND) {
            self.store_backend = v.parse()?;
        }
        if let Some(v) = env_str(ENV_STORE_DIR) {
            self.store_dir = PathBuf::from(v);
        }
        if let Some(v) = env_str(ENV_USER_AGENT) {
            self.http_user_agent = v;
        }
        if let Some(v) = env_parse(ENV_HTTP_TIMEOUT)? {
            self.http_timeout_secs = Some(v);
        }
        if let Some(v) = env_str(ENV_DEBUG_ROUTES) {
            self.debug_routes = parse_flag(&v);
        }
        Ok(())
    }

    pub fn source_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.source_cache_ttl_secs)
    }

    pub fn aggregate_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.aggregate_cache_ttl_secs)
    }

    pub fn http_timeout(&self) -> Option<Duration> {
        self.http_timeout_secs.map(Duration::from_secs)
    }
}

fn env_str(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse(name: &str) -> Result<Option<u64>> {
    env_str(name)
        .map(|v| {
            v.parse::<u64>()
                .with_context(|| format!("{name} must be a non-negative integer, got '{v}'"))
        })
        .transpose()
}

fn parse_flag(v: &str) -> bool {
    matches!(
        v.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
