use std::{
    io::{self, Write},
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use tempfile::NamedTempFile;
use tokio::{fs, task::spawn_blocking};

use super::{DistributionStore, StoreError, check_publish, decode_payload};
use crate::payload::{DailyPayload, day_key};

pub const CURRENT_FILE: &str = "daily.json";

/// Directory layout: `daily-<date>.json` per published day, plus `daily.json` holding the
/// current one. Both are replaced by rename so readers never see half a file.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn current_path(&self) -> PathBuf {
        self.dir.join(CURRENT_FILE)
    }

    pub fn day_path(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!("daily-{}.json", day_key(date)))
    }
}

fn write_atomic(dir: &Path, path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut temp_file = NamedTempFile::new_in(dir)?;
    temp_file.write_all(bytes)?;
    temp_file.as_file().sync_all()?;
    temp_file.persist(path).map_err(|e| e.error)?;

    Ok(())
}

#[async_trait::async_trait]
impl DistributionStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn publish(&self, date: NaiveDate, payload: &DailyPayload) -> Result<(), StoreError> {
        check_publish(date, payload)?;

        let bytes = serde_json::to_vec_pretty(payload)?;
        let dir = self.dir.clone();
        let day_path = self.day_path(date);
        let current_path = self.current_path();

        spawn_blocking(move || -> io::Result<()> {
            std::fs::create_dir_all(&dir)?;
            write_atomic(&dir, &day_path, &bytes)?;
            write_atomic(&dir, &current_path, &bytes)
        })
        .await
        .map_err(|e| StoreError::Io(e.to_string()))??;

        Ok(())
    }

    async fn fetch_latest(&self) -> Result<Option<DailyPayload>, StoreError> {
        match fs::read(self.current_path()).await {
            Ok(bytes) => decode_payload(&bytes).map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
