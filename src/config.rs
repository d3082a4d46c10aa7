use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prefix of every environment variable read by `from_env`
pub const ENV_PREFIX: &str = "PHOTO_CURSOR_";

/// Bucket credentials and local cache settings.
#[derive(Deserialize, Serialize, Clone)]
pub struct CatalogConfig {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
    pub bucket: String,
    /// Custom endpoint for S3-compatible stores
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_signed_url_ttl_secs")]
    pub signed_url_ttl_secs: u64,
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// JSON file mapping folder names to display labels
    #[serde(default)]
    pub labels_path: Option<PathBuf>,
}

fn default_cache_ttl_secs() -> u64 {
    3000
}

fn default_signed_url_ttl_secs() -> u64 {
    3600
}

fn default_db_path() -> PathBuf {
    PathBuf::from("catalog.db")
}

impl CatalogConfig {
    pub fn new(
        access_key_id: String,
        secret_access_key: String,
        region: String,
        bucket: String,
    ) -> Self {
        Self {
            access_key_id,
            secret_access_key,
            region,
            bucket,
            endpoint: None,
            cache_ttl_secs: default_cache_ttl_secs(),
            signed_url_ttl_secs: default_signed_url_ttl_secs(),
            db_path: default_db_path(),
            labels_path: None,
        }
    }

    /// Read a JSON config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        serde_json::from_str(&content).context("Invalid catalog config")
    }

    /// Build the config from `PHOTO_CURSOR_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |suffix: &str| lookup(&format!("{}{}", ENV_PREFIX, suffix));
        let required = |suffix: &str| {
            var(suffix).with_context(|| format!("Missing {}{}", ENV_PREFIX, suffix))
        };

        let mut config = Self::new(
            required("ACCESS_KEY_ID")?,
            required("SECRET_ACCESS_KEY")?,
            required("REGION")?,
            required("BUCKET")?,
        );
        config.endpoint = var("ENDPOINT");
        if let Some(path) = var("DB_PATH") {
            config.db_path = PathBuf::from(path);
        }
        config.labels_path = var("LABELS").map(PathBuf::from);
        if let Some(ttl) = var("CACHE_TTL_SECS") {
            config.cache_ttl_secs = ttl
                .parse()
                .with_context(|| format!("Invalid {}CACHE_TTL_SECS: {}", ENV_PREFIX, ttl))?;
        }
        Ok(config)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn signed_url_ttl(&self) -> Duration {
        Duration::from_secs(self.signed_url_ttl_secs)
    }
}
