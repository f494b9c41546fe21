//! # Daily Payload
//!
//! Wire format, JSON:
//! ```json
//! {
//!   "date": "2025-03-14",
//!   "word": "chat",
//!   "similarities": [
//!     { "word": "chat", "similarity": 100.0, "rank": 1000 },
//!     { "word": "félin", "similarity": 80.0, "rank": 1 },
//!     { "word": "chien", "similarity": 60.0, "rank": 2 }
//!   ]
//! }
//! ```
//!
//! - Similarity is always on the 0-100 display scale
//! - `rank` is always present, `null` meaning not ranked
//! - Rank 1000 belongs to the target word and nothing else
//! - Other ranks are dense from 1, similarity never increases with rank
use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const TARGET_RANK: u16 = 1000;
pub const MAX_RANK: u16 = TARGET_RANK - 1;
pub const PERFECT_SIMILARITY: f32 = 100.0;
pub const DAY_FORMAT: &str = "%Y-%m-%d";

pub fn normalize(input: &str) -> String {
    input.trim().to_lowercase()
}

pub fn day_key(date: NaiveDate) -> String {
    date.format(DAY_FORMAT).to_string()
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SimilarityEntry {
    pub word: String,
    pub similarity: f32,
    pub rank: Option<u16>,
}

impl SimilarityEntry {
    pub fn target(word: &str) -> Self {
        Self {
            word: word.to_string(),
            similarity: PERFECT_SIMILARITY,
            rank: Some(TARGET_RANK),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DailyPayload {
    pub date: NaiveDate,
    pub word: String,
    pub similarities: Vec<SimilarityEntry>,
}

// Messages never carry the words themselves, they end up in logs and store errors.
#[derive(Error, Debug, PartialEq)]
pub enum PayloadError {
    #[error("Target word is empty or not normalized")]
    BadTarget,

    #[error("Entry {0} is empty or not normalized")]
    BadWord(usize),

    #[error("Entry {0} appears more than once")]
    Duplicate(usize),

    #[error("Entry {0} has similarity outside 0-100")]
    SimilarityRange(usize),

    #[error("Target entry is missing")]
    MissingTarget,

    #[error("Target entry must have similarity 100 and rank 1000")]
    BadTargetEntry,

    #[error("Entry {0} claims the target sentinel")]
    StolenSentinel(usize),

    #[error("Ranks are not dense starting at 1")]
    RankGap,

    #[error("Similarity increases with rank")]
    NotMonotonic,
}

impl DailyPayload {
    pub fn validate(&self) -> Result<(), PayloadError> {
        if self.word.is_empty() || normalize(&self.word) != self.word {
            return Err(PayloadError::BadTarget);
        }

        let mut seen = HashSet::with_capacity(self.similarities.len());
        let mut ranked = Vec::new();
        let mut highest_unranked: Option<f32> = None;
        let mut found_target = false;

        for (index, entry) in self.similarities.iter().enumerate() {
            if entry.word.is_empty() || normalize(&entry.word) != entry.word {
                return Err(PayloadError::BadWord(index));
            }
            if !seen.insert(entry.word.as_str()) {
                return Err(PayloadError::Duplicate(index));
            }
            if !entry.similarity.is_finite() || !(0.0..=PERFECT_SIMILARITY).contains(&entry.similarity)
            {
                return Err(PayloadError::SimilarityRange(index));
            }

            if entry.word == self.word {
                if entry.similarity != PERFECT_SIMILARITY || entry.rank != Some(TARGET_RANK) {
                    return Err(PayloadError::BadTargetEntry);
                }
                found_target = true;
                continue;
            }

            if entry.similarity >= PERFECT_SIMILARITY {
                return Err(PayloadError::StolenSentinel(index));
            }

            match entry.rank {
                Some(TARGET_RANK) => return Err(PayloadError::StolenSentinel(index)),
                Some(rank) => ranked.push((rank, entry.similarity)),
                None => {
                    highest_unranked = Some(match highest_unranked {
                        Some(high) => f32::max(high, entry.similarity),
                        None => entry.similarity,
                    })
                }
            }
        }

        if !found_target {
            return Err(PayloadError::MissingTarget);
        }

        ranked.sort_by_key(|(rank, _)| *rank);

        for (position, (rank, _)) in ranked.iter().enumerate() {
            if usize::from(*rank) != position + 1 {
                return Err(PayloadError::RankGap);
            }
        }

        if ranked.windows(2).any(|pair| pair[1].1 > pair[0].1) {
            return Err(PayloadError::NotMonotonic);
        }

        if let (Some((_, last)), Some(unranked)) = (ranked.last(), highest_unranked) {
            if unranked > *last {
                return Err(PayloadError::NotMonotonic);
            }
        }

        Ok(())
    }
}
