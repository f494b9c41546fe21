//! # Daily Processing
//!
//! The once-a-day batch job that produces and publishes the answer.
//!
//! ## Daily Cron Job
//! 1. Load the word list, the history and the embedding model
//! 2. Select an unused word for the date (same word again if the date is already recorded)
//! 3. Build the similarity table for it; if the model has no vector for the word, exclude it
//!    and go back to 2
//! 4. Append `{word, date}` to the history and save it
//! 5. Publish the payload to the distribution store
//!
//! History is saved before publishing. A crash between 4 and 5 leaves the word recorded, and
//! the rerun picks the same word back up at step 2 instead of burning a second one.
//!
//! ## Word List Cleaning
//! Raw lemma lists carry numbers, apostrophes, multi-word entries and very short words. The
//! `clean` command keeps only single words made of letters (inner hyphens allowed) within a
//! length range.
use std::{collections::HashSet, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use bank::{DailyPayload, history::WordHistory, store::DistributionStore};
use chrono::NaiveDate;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::task::spawn_blocking;
use tracing::{info, warn};

pub mod builder;
pub mod oracle;
pub mod selector;
pub mod utils;

use builder::{BuildError, BuildPolicy, build_table};
use oracle::{EmbeddingOracle, VectorModel};
use selector::select_word;
use utils::load_wordlist;

pub struct DailyJob {
    pub date: NaiveDate,
    pub vocabulary_path: PathBuf,
    pub vectors_path: PathBuf,
    pub history_path: PathBuf,
    pub policy: BuildPolicy,
    pub dry_run: bool,
}

/// Select and build until a word the oracle can resolve comes up.
pub fn prepare_daily<O>(
    oracle: &O,
    history: &WordHistory,
    vocabulary: &[String],
    date: NaiveDate,
    policy: &BuildPolicy,
    progress: Option<&ProgressBar>,
) -> Result<DailyPayload>
where
    O: EmbeddingOracle + ?Sized,
{
    let mut rejected = HashSet::new();

    loop {
        let word = select_word(history, vocabulary, date, &rejected)?;

        match build_table(oracle, date, &word, vocabulary, policy, progress) {
            Ok(payload) => return Ok(payload),
            Err(BuildError::UnresolvableTarget) => {
                warn!("Candidate has no vector, selecting another word");
                rejected.insert(word);
            }
            Err(e) => return Err(e.into()),
        }
    }
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);

    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
    ) {
        pb.set_style(style.progress_chars("=> "));
    }

    pb
}

pub async fn run_daily(job: &DailyJob, store: &dyn DistributionStore) -> Result<DailyPayload> {
    job.policy.check()?;

    let vocabulary = load_wordlist(&job.vocabulary_path)
        .with_context(|| format!("Failed to read {}", job.vocabulary_path.display()))?;
    info!("Loaded Words: {}", vocabulary.len());

    let mut history = WordHistory::load(&job.history_path)?;
    info!("Loaded History: {}", history.entries.len());

    let vectors_path = job.vectors_path.clone();
    let model = spawn_blocking(move || VectorModel::load(&vectors_path)).await??;

    let payload = {
        let model = Arc::new(model);
        let history = history.clone();
        let policy = job.policy.clone();
        let date = job.date;
        let pb = progress_bar();

        spawn_blocking(move || {
            prepare_daily(&*model, &history, &vocabulary, date, &policy, Some(&pb))
        })
        .await??
    };

    info!(
        "Daily word for {}: {} ({} entries)",
        job.date,
        payload.word,
        payload.similarities.len()
    );

    if job.dry_run {
        info!("Dry run, nothing recorded or published");
        return Ok(payload);
    }

    history.append(job.date, &payload.word)?;
    history.save(&job.history_path)?;

    store
        .publish(job.date, &payload)
        .await
        .with_context(|| format!("Failed to publish through {}", store.name()))?;
    info!("Published {} to {}", job.date, store.name());

    Ok(payload)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use bank::store::MemoryStore;
    use tempfile::tempdir;

    use super::*;
    use crate::{
        builder::tests::{TableOracle, words},
        selector::SelectionError,
    };

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    #[test]
    fn test_prepare_skips_unresolvable_words() {
        // only "chat" has a vector, every other pick gets rejected
        let oracle = TableOracle::new("chat", &[]);
        let vocabulary = words(&["licorne", "dragon", "chat", "phénix"]);

        let payload = prepare_daily(
            &oracle,
            &WordHistory::default(),
            &vocabulary,
            day(1),
            &BuildPolicy::default(),
            None,
        )
        .unwrap();

        assert_eq!(payload.word, "chat");
    }

    #[test]
    fn test_prepare_exhausted() {
        let oracle = TableOracle::new("chat", &[]);
        let vocabulary = words(&["licorne", "dragon"]);

        let error = prepare_daily(
            &oracle,
            &WordHistory::default(),
            &vocabulary,
            day(1),
            &BuildPolicy::default(),
            None,
        )
        .unwrap_err();

        assert_eq!(
            error.downcast_ref::<SelectionError>(),
            Some(&SelectionError::Exhausted)
        );
    }

    fn write_fixtures(dir: &std::path::Path) -> DailyJob {
        let vocabulary_path = dir.join("words.txt");
        let vectors_path = dir.join("vectors.txt");
        fs::write(&vocabulary_path, "chat\nchien\n").unwrap();
        fs::write(&vectors_path, "chat 1 0\nchien 0.6 0.8\n").unwrap();

        DailyJob {
            date: day(1),
            vocabulary_path,
            vectors_path,
            history_path: dir.join("history.bin"),
            policy: BuildPolicy::default(),
            dry_run: false,
        }
    }

    #[tokio::test]
    async fn test_run_daily_records_and_publishes() {
        let dir = tempdir().unwrap();
        let job = write_fixtures(dir.path());
        let store = MemoryStore::new();

        let payload = run_daily(&job, &store).await.unwrap();

        assert_eq!(store.fetch_latest().await.unwrap(), Some(payload.clone()));

        let history = WordHistory::load(&job.history_path).unwrap();
        assert_eq!(history.word_for(day(1)), Some(payload.word.as_str()));

        // rerunning the same day republishes the same word
        let again = run_daily(&job, &store).await.unwrap();
        assert_eq!(again, payload);
        assert_eq!(WordHistory::load(&job.history_path).unwrap().entries.len(), 1);
    }

    #[tokio::test]
    async fn test_run_daily_dry_run() {
        let dir = tempdir().unwrap();
        let mut job = write_fixtures(dir.path());
        job.dry_run = true;
        let store = MemoryStore::new();

        run_daily(&job, &store).await.unwrap();

        assert_eq!(store.fetch_latest().await.unwrap(), None);
        assert!(!job.history_path.exists());
    }

    #[tokio::test]
    async fn test_run_daily_never_repeats() {
        let dir = tempdir().unwrap();
        let mut job = write_fixtures(dir.path());
        let store = MemoryStore::new();

        let first = run_daily(&job, &store).await.unwrap();
        job.date = day(2);
        let second = run_daily(&job, &store).await.unwrap();
        assert_ne!(first.word, second.word);

        job.date = day(3);
        assert!(run_daily(&job, &store).await.is_err());
    }
}
