use std::{env, fmt::Display, fs::read_to_string, path::PathBuf, str::FromStr, sync::Arc};

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use crate::store::{BlobStore, DistributionStore, FileStore, RedisStore, StoreError, TieredStore};

const SECRETS_DIR: &str = "/run/secrets";
const DEFAULT_STORE_DIR: &str = "./data";

pub fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

pub fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = var(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    match raw.parse() {
        Ok(value) => Ok(value),
        Err(e) => bail!("Invalid {key} value: {e}"),
    }
}

/// Secrets come from docker secret files first, then the environment.
pub fn read_secret(secret_name: &str) -> Option<String> {
    let path = format!("{SECRETS_DIR}/{secret_name}");

    match read_to_string(&path) {
        Ok(secret) => Some(secret.trim().to_string()),
        Err(e) => {
            warn!("Failed to read {secret_name} from file: {e}");
            var(secret_name)
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    pub dir: Option<PathBuf>,
    pub redis_url: Option<String>,
    pub redis_prefix: String,
    pub blob_url: Option<String>,
    pub blob_token: Option<String>,
}

impl StoreConfig {
    pub fn load() -> Result<Self> {
        let blob_url = var("BLOB_URL");
        let blob_token = blob_url.as_ref().and_then(|_| read_secret("BLOB_TOKEN"));

        Ok(Self {
            dir: var("STORE_DIR").map(PathBuf::from),
            redis_url: var("REDIS_URL"),
            redis_prefix: try_load("REDIS_PREFIX", "semantix")?,
            blob_url,
            blob_token,
        })
    }

    /// Tier order: redis, blob, file. With nothing configured, falls back to a local `./data`
    /// directory.
    pub async fn build(&self) -> Result<Arc<dyn DistributionStore>> {
        let mut tiers: Vec<Arc<dyn DistributionStore>> = Vec::new();
        let configured = self.redis_url.is_some() || self.blob_url.is_some() || self.dir.is_some();

        if let Some(redis_url) = &self.redis_url {
            match RedisStore::connect(redis_url, &self.redis_prefix).await {
                Ok(store) => tiers.push(Arc::new(store)),
                Err(e) => warn!("Skipping redis tier: {e}"),
            }
        }

        if let Some(blob_url) = &self.blob_url {
            let store = BlobStore::new(blob_url, self.blob_token.clone())
                .context("Failed to build blob client")?;
            tiers.push(Arc::new(store));
        }

        match (&self.dir, configured) {
            (Some(dir), _) => tiers.push(Arc::new(FileStore::new(dir))),
            (None, false) => {
                info!("No store configured, using {DEFAULT_STORE_DIR}");
                tiers.push(Arc::new(FileStore::new(DEFAULT_STORE_DIR)));
            }
            (None, true) => {}
        }

        if tiers.is_empty() {
            bail!(StoreError::NoTiers);
        }

        let store = TieredStore::new(tiers);
        info!("Distribution store: {}", store.name());

        Ok(Arc::new(store))
    }
}
