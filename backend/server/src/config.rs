use std::time::Duration;

use anyhow::Result;
use bank::{
    config::{StoreConfig, try_load},
    payload::MAX_RANK,
};

use crate::cache::CacheSettings;

pub struct Config {
    pub port: u16,
    pub store: StoreConfig,
    pub cache: CacheSettings,
    pub rate_window: Duration,
    pub rate_max: u32,
    pub top_cap: usize,
    pub cors_max_age: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            store: StoreConfig::default(),
            cache: CacheSettings::default(),
            rate_window: Duration::from_secs(60),
            rate_max: 30,
            top_cap: 100,
            cors_max_age: Duration::from_secs(60 * 60),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Ok(Self {
            port: try_load("RUST_PORT", "8080")?,
            store: StoreConfig::load()?,
            cache: CacheSettings {
                ttl: Duration::from_secs(try_load("CACHE_TTL_SECS", "3600")?),
                retry: Duration::from_secs(try_load("CACHE_RETRY_SECS", "30")?),
                wait: Duration::from_millis(try_load("CACHE_WAIT_MS", "3000")?),
            },
            rate_window: Duration::from_secs(try_load("RATE_WINDOW_SECS", "60")?),
            rate_max: try_load("RATE_MAX", "30")?,
            top_cap: try_load::<usize>("TOP_CAP", "100")?.min(usize::from(MAX_RANK)),
            cors_max_age: Duration::from_secs(try_load("CORS_MAX_AGE_SECS", "3600")?),
        })
    }
}
