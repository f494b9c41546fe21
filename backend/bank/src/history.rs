//! # Word History
//!
//! Append-only log of `{word, date}` pairs, one per published day.
//!
//! Stored as a protobuf blob next to the word list. Only the daily job reads or writes it.
//! Entries are never rewritten, so a word that made it in here is never picked again.
use std::{
    collections::HashSet,
    fs,
    io::{self, Write},
    path::Path,
};

use chrono::NaiveDate;
use prost::Message;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::info;

use crate::payload::{day_key, normalize};

#[derive(Clone, PartialEq, Message)]
pub struct HistoryEntry {
    #[prost(string, tag = "1")]
    pub word: String,

    #[prost(string, tag = "2")]
    pub date: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct WordHistory {
    #[prost(message, repeated, tag = "1")]
    pub entries: Vec<HistoryEntry>,
}

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("History I/O failure: {0}")]
    Io(#[from] io::Error),

    #[error("History file is corrupt: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("A different word is already recorded for {0}")]
    Conflict(String),
}

impl WordHistory {
    pub fn load(path: &Path) -> Result<Self, HistoryError> {
        match fs::read(path) {
            Ok(data) => Ok(Self::decode(&*data)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("No history at {}, starting empty", path.display());

                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), HistoryError> {
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let mut temp_file = NamedTempFile::new_in(parent)?;
        temp_file.write_all(&self.encode_to_vec())?;
        temp_file.as_file().sync_all()?;
        temp_file.persist(path).map_err(|e| e.error)?;

        Ok(())
    }

    pub fn word_for(&self, date: NaiveDate) -> Option<&str> {
        let key = day_key(date);

        self.entries
            .iter()
            .find(|entry| entry.date == key)
            .map(|entry| entry.word.as_str())
    }

    pub fn used_words(&self) -> HashSet<String> {
        self.entries
            .iter()
            .map(|entry| normalize(&entry.word))
            .collect()
    }

    /// Records `word` for `date`. Recording the same pair twice is a no-op so a retried job can
    /// call this again safely.
    pub fn append(&mut self, date: NaiveDate, word: &str) -> Result<(), HistoryError> {
        let word = normalize(word);

        match self.word_for(date) {
            Some(existing) if existing == word => Ok(()),
            Some(_) => Err(HistoryError::Conflict(day_key(date))),
            None => {
                self.entries.push(HistoryEntry {
                    word,
                    date: day_key(date),
                });

                Ok(())
            }
        }
    }
}
