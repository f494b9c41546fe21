use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, warn};

use super::{DistributionStore, StoreError};
use crate::payload::DailyPayload;

/// Ordered fallback over several stores.
///
/// - Reads go down the list and return the first tier holding a payload. Each failing tier is
///   logged once here, callers only see the final outcome.
/// - Writes must land on the first tier; the rest are best effort so a flaky mirror cannot
///   block the daily publish.
pub struct TieredStore {
    tiers: Vec<Arc<dyn DistributionStore>>,
    name: String,
}

impl TieredStore {
    pub fn new(tiers: Vec<Arc<dyn DistributionStore>>) -> Self {
        let name = tiers
            .iter()
            .map(|tier| tier.name())
            .collect::<Vec<_>>()
            .join(">");

        Self { tiers, name }
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }
}

#[async_trait::async_trait]
impl DistributionStore for TieredStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn publish(&self, date: NaiveDate, payload: &DailyPayload) -> Result<(), StoreError> {
        let (primary, mirrors) = self.tiers.split_first().ok_or(StoreError::NoTiers)?;

        primary.publish(date, payload).await?;

        for mirror in mirrors {
            if let Err(e) = mirror.publish(date, payload).await {
                warn!("Mirror tier {} failed to publish {date}: {e}", mirror.name());
            }
        }

        Ok(())
    }

    async fn fetch_latest(&self) -> Result<Option<DailyPayload>, StoreError> {
        let mut last_error = None;

        for tier in &self.tiers {
            match tier.fetch_latest().await {
                Ok(Some(payload)) => return Ok(Some(payload)),
                Ok(None) => debug!("Tier {} has no payload", tier.name()),
                Err(e) => {
                    warn!("Tier {} failed, trying next: {e}", tier.name());
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => Err(e),
            None if self.tiers.is_empty() => Err(StoreError::NoTiers),
            None => Ok(None),
        }
    }
}
