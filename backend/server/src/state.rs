use std::sync::Arc;

use anyhow::Result;
use bank::store::DistributionStore;

use super::{
    cache::{Clock, DailyCache, UtcClock},
    config::Config,
    limiter::RateLimiter,
    stats::GuessLog,
    verify::Verifier,
};

pub struct State {
    pub config: Config,
    pub verifier: Verifier,
    pub limiter: RateLimiter,
    pub guesses: GuessLog,
}

impl State {
    pub async fn new() -> Result<Arc<Self>> {
        let config = Config::load()?;
        let store = config.store.build().await?;

        Ok(Self::with_store(config, store, Arc::new(UtcClock)))
    }

    pub fn with_store(
        config: Config,
        store: Arc<dyn DistributionStore>,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        let cache = DailyCache::new(store, clock, config.cache.clone());

        Arc::new(Self {
            verifier: Verifier::new(cache, config.top_cap),
            limiter: RateLimiter::new(config.rate_window, config.rate_max),
            guesses: GuessLog::new(),
            config,
        })
    }
}
