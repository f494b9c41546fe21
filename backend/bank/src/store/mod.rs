//! # Distribution Store
//!
//! Single writer (the daily job), many readers (every serving instance).
//!
//! ## Contract
//! - `publish(date, payload)` overwrites whatever was published for that date, never appends
//! - `fetch_latest()` returns the whole current payload or nothing
//! - Once `publish` returns, every later `fetch_latest` from any process sees the new payload
//!
//! No lookup by word and no partial read, readers always get the whole table.
//!
//! ## Tiers
//! - [`RedisStore`]: shared in-memory database, the fast path in production
//! - [`BlobStore`]: HTTP object storage, the durable copy
//! - [`FileStore`]: local directory, single-box deployments and development
//! - [`MemoryStore`]: in-process, tests
//!
//! [`TieredStore`] chains them in order. It is the only place a fallback between stores
//! happens.
use chrono::NaiveDate;
use thiserror::Error;

use crate::payload::{DailyPayload, PayloadError};

mod blob;
mod file;
mod memory;
mod redis_store;
mod tiered;

pub use blob::BlobStore;
pub use file::FileStore;
pub use memory::MemoryStore;
pub use redis_store::RedisStore;
pub use tiered::TieredStore;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("I/O failure: {0}")]
    Io(String),

    #[error("Redis failure: {0}")]
    Redis(String),

    #[error("HTTP failure: {0}")]
    Http(String),

    #[error("Malformed payload: {0}")]
    Malformed(String),

    #[error("Payload dated {payload} cannot be published under {date}")]
    DateMismatch { date: NaiveDate, payload: NaiveDate },

    #[error("No store tiers configured")]
    NoTiers,
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e.to_string())
    }
}

impl From<::redis::RedisError> for StoreError {
    fn from(e: ::redis::RedisError) -> Self {
        StoreError::Redis(e.to_string())
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        // without_url keeps signed blob URLs out of logs
        StoreError::Http(e.without_url().to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Malformed(e.to_string())
    }
}

impl From<PayloadError> for StoreError {
    fn from(e: PayloadError) -> Self {
        StoreError::Malformed(e.to_string())
    }
}

#[async_trait::async_trait]
pub trait DistributionStore: Send + Sync {
    fn name(&self) -> &str;

    async fn publish(&self, date: NaiveDate, payload: &DailyPayload) -> Result<(), StoreError>;

    async fn fetch_latest(&self) -> Result<Option<DailyPayload>, StoreError>;
}

/// Shared guard for every `publish` implementation.
pub(crate) fn check_publish(date: NaiveDate, payload: &DailyPayload) -> Result<(), StoreError> {
    if payload.date != date {
        return Err(StoreError::DateMismatch {
            date,
            payload: payload.date,
        });
    }

    payload.validate()?;

    Ok(())
}

/// Strict read path: unknown fields, missing fields and broken invariants are all rejected.
pub fn decode_payload(bytes: &[u8]) -> Result<DailyPayload, StoreError> {
    let payload: DailyPayload = serde_json::from_slice(bytes)?;
    payload.validate()?;

    Ok(payload)
}
