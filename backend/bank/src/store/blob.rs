use std::time::Duration;

use chrono::NaiveDate;
use reqwest::{Client, StatusCode};

use super::{DistributionStore, StoreError, check_publish, decode_payload};
use crate::payload::{DailyPayload, day_key};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP object storage. Reads are plain `GET`s so a public bucket URL works; writes are `PUT`s
/// with a bearer token.
pub struct BlobStore {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl BlobStore {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn current_url(&self) -> String {
        format!("{}/daily.json", self.base_url)
    }

    fn day_url(&self, date: NaiveDate) -> String {
        format!("{}/daily-{}.json", self.base_url, day_key(date))
    }

    async fn put(&self, url: String, body: Vec<u8>) -> Result<(), StoreError> {
        let mut request = self
            .client
            .put(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);

        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        request.send().await?.error_for_status()?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl DistributionStore for BlobStore {
    fn name(&self) -> &str {
        "blob"
    }

    async fn publish(&self, date: NaiveDate, payload: &DailyPayload) -> Result<(), StoreError> {
        check_publish(date, payload)?;

        let body = serde_json::to_vec(payload)?;

        // day copy first, current pointer last
        self.put(self.day_url(date), body.clone()).await?;
        self.put(self.current_url(), body).await
    }

    async fn fetch_latest(&self) -> Result<Option<DailyPayload>, StoreError> {
        let response = self.client.get(self.current_url()).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let bytes = response.error_for_status()?.bytes().await?;

        decode_payload(&bytes).map(Some)
    }
}
