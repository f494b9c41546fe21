//! # Similarity Table Builder
//!
//! Turns one target word and the whole vocabulary into the day's [`DailyPayload`].
//!
//! ## Steps
//! 1. Reject the target if the oracle has no vector for it
//! 2. Score every other vocabulary word against the target
//! 3. Drop unknown words (omitted, not scored zero) and anything under `min_similarity`
//! 4. Sort descending, ties by word so reruns are byte-identical
//! 5. Ranks 1..=N for the first `rank_cap` words, optional unranked tail after that
//! 6. Target goes first with similarity 100 and rank 1000
//!
//! The threshold does double duty: it keeps the payload small, and it keeps the long tail of
//! near-zero words from being enumerable by brute-force guessing.
use std::collections::HashSet;

use bank::{
    DailyPayload, SimilarityEntry, normalize,
    payload::{MAX_RANK, PayloadError},
};
use chrono::NaiveDate;
use indicatif::ProgressBar;
use thiserror::Error;

use crate::oracle::EmbeddingOracle;

/// Highest display similarity a non-target word can get, so only the target reads 100.
const CEILING: f32 = 99.99;

#[derive(Debug, Clone, PartialEq)]
pub struct BuildPolicy {
    pub min_similarity: f32,
    pub rank_cap: usize,
    pub keep_unranked: usize,
}

impl Default for BuildPolicy {
    fn default() -> Self {
        Self {
            min_similarity: 0.30,
            rank_cap: usize::from(MAX_RANK),
            keep_unranked: 0,
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum BuildError {
    #[error("Target word has no vector in the model")]
    UnresolvableTarget,

    #[error("Invalid build policy: {0}")]
    InvalidPolicy(&'static str),

    #[error("Built table is invalid: {0}")]
    Invalid(#[from] PayloadError),
}

impl BuildPolicy {
    pub fn check(&self) -> Result<(), BuildError> {
        if !(0.0..=1.0).contains(&self.min_similarity) {
            return Err(BuildError::InvalidPolicy("min_similarity must be within 0-1"));
        }
        if self.rank_cap == 0 || self.rank_cap > usize::from(MAX_RANK) {
            return Err(BuildError::InvalidPolicy("rank_cap must be within 1-999"));
        }

        Ok(())
    }
}

/// Raw cosine to the 0-100 display scale, two decimals.
pub fn display_similarity(raw: f32) -> f32 {
    let scaled = (f64::from(raw) * 10_000.0).round() / 100.0;

    (scaled as f32).clamp(0.0, CEILING)
}

pub fn build_table<O>(
    oracle: &O,
    date: NaiveDate,
    target: &str,
    vocabulary: &[String],
    policy: &BuildPolicy,
    progress: Option<&ProgressBar>,
) -> Result<DailyPayload, BuildError>
where
    O: EmbeddingOracle + ?Sized,
{
    policy.check()?;

    let target = normalize(target);
    if target.is_empty() || !oracle.contains(&target) {
        return Err(BuildError::UnresolvableTarget);
    }

    if let Some(pb) = progress {
        pb.set_length(vocabulary.len() as u64);
        pb.set_position(0);
    }

    let mut seen = HashSet::with_capacity(vocabulary.len());
    let mut scored: Vec<(f32, String)> = Vec::new();

    for candidate in vocabulary {
        if let Some(pb) = progress {
            pb.inc(1);
        }

        let word = normalize(candidate);
        if word.is_empty() || word == target || !seen.insert(word.clone()) {
            continue;
        }

        let Some(raw) = oracle.similarity(&target, &word) else {
            continue;
        };

        if raw < policy.min_similarity {
            continue;
        }

        scored.push((display_similarity(raw), word));
    }

    scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    scored.truncate(policy.rank_cap + policy.keep_unranked);

    let mut similarities = Vec::with_capacity(scored.len() + 1);
    similarities.push(SimilarityEntry::target(&target));

    for (position, (similarity, word)) in scored.into_iter().enumerate() {
        let rank = (position < policy.rank_cap).then(|| (position + 1) as u16);

        similarities.push(SimilarityEntry {
            word,
            similarity,
            rank,
        });
    }

    if let Some(pb) = progress {
        pb.finish_with_message(format!("{} words kept", similarities.len() - 1));
    }

    let payload = DailyPayload {
        date,
        word: target,
        similarities,
    };
    payload.validate()?;

    Ok(payload)
}
