use std::{
    collections::BTreeMap,
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use chrono::NaiveDate;
use tokio::time::sleep;

use super::{DistributionStore, StoreError, check_publish};
use crate::payload::DailyPayload;

#[derive(Default)]
struct Published {
    days: BTreeMap<NaiveDate, DailyPayload>,
    latest: Option<NaiveDate>,
}

/// In-process store. Counts reads and can simulate a slow backend.
#[derive(Default)]
pub struct MemoryStore {
    published: Mutex<Published>,
    fetches: AtomicUsize,
    latency: Duration,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl DistributionStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn publish(&self, date: NaiveDate, payload: &DailyPayload) -> Result<(), StoreError> {
        check_publish(date, payload)?;

        let mut published = self.published.lock().unwrap_or_else(PoisonError::into_inner);
        published.days.insert(date, payload.clone());
        published.latest = Some(date);

        Ok(())
    }

    async fn fetch_latest(&self) -> Result<Option<DailyPayload>, StoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        if !self.latency.is_zero() {
            sleep(self.latency).await;
        }

        let published = self.published.lock().unwrap_or_else(PoisonError::into_inner);

        Ok(published
            .latest
            .and_then(|date| published.days.get(&date))
            .cloned())
    }
}
