//! # Redis
//!
//! RAM database shared by every serving instance.
//!
//! ## Keys
//! - `<prefix>:daily:<date>`: the payload published for that day, kept after rollover
//! - `<prefix>:daily:latest`: the current payload
//!
//! Both are written in one `MULTI` so a reader never sees `latest` pointing at a day that
//! was not written. A payload is at most ~1000 entries, well under 100 KB of JSON.
use std::time::Duration;

use chrono::NaiveDate;
use redis::{
    AsyncCommands, Client,
    aio::{ConnectionManager, ConnectionManagerConfig},
};

use super::{DistributionStore, StoreError, check_publish, decode_payload};
use crate::payload::{DailyPayload, day_key};

pub struct RedisStore {
    connection: ConnectionManager,
    prefix: String,
}

impl RedisStore {
    pub async fn connect(redis_url: &str, prefix: &str) -> Result<Self, StoreError> {
        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(1)
            .set_connection_timeout(Duration::from_millis(500));

        let client = Client::open(redis_url)?;
        let connection = client.get_connection_manager_with_config(config).await?;

        Ok(Self {
            connection,
            prefix: prefix.to_string(),
        })
    }

    fn latest_key(&self) -> String {
        format!("{}:daily:latest", self.prefix)
    }

    fn day_key(&self, date: NaiveDate) -> String {
        format!("{}:daily:{}", self.prefix, day_key(date))
    }
}

#[async_trait::async_trait]
impl DistributionStore for RedisStore {
    fn name(&self) -> &str {
        "redis"
    }

    async fn publish(&self, date: NaiveDate, payload: &DailyPayload) -> Result<(), StoreError> {
        check_publish(date, payload)?;

        let json = serde_json::to_string(payload)?;
        let mut connection = self.connection.clone();

        let _: () = redis::pipe()
            .atomic()
            .set(self.day_key(date), &json)
            .ignore()
            .set(self.latest_key(), &json)
            .ignore()
            .query_async(&mut connection)
            .await?;

        Ok(())
    }

    async fn fetch_latest(&self) -> Result<Option<DailyPayload>, StoreError> {
        let mut connection = self.connection.clone();
        let raw: Option<Vec<u8>> = connection.get(self.latest_key()).await?;

        raw.map(|bytes| decode_payload(&bytes)).transpose()
    }
}
