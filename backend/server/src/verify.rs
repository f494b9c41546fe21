use bank::{
    SimilarityEntry, normalize,
    payload::{PERFECT_SIMILARITY, TARGET_RANK},
};
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::cache::{CacheError, DailyCache, DailySnapshot};

pub const MAX_GUESS_CHARS: usize = 64;

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GuessOutcome {
    pub similarity: f32,
    pub rank: Option<u16>,
    pub is_correct: bool,
}

impl GuessOutcome {
    fn correct() -> Self {
        Self {
            similarity: PERFECT_SIMILARITY,
            rank: Some(TARGET_RANK),
            is_correct: true,
        }
    }

    fn unknown() -> Self {
        Self {
            similarity: 0.0,
            rank: None,
            is_correct: false,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VerifyError {
    #[error("Guess is empty")]
    EmptyGuess,

    #[error("Guess is longer than {MAX_GUESS_CHARS} characters")]
    Malformed,

    #[error(transparent)]
    NotReady(#[from] CacheError),
}

fn check_guess(raw: &str) -> Result<String, VerifyError> {
    let guess = normalize(raw);

    if guess.is_empty() {
        return Err(VerifyError::EmptyGuess);
    }
    if guess.chars().count() > MAX_GUESS_CHARS {
        return Err(VerifyError::Malformed);
    }

    Ok(guess)
}

fn outcome(snapshot: &DailySnapshot, guess: &str) -> GuessOutcome {
    if snapshot.is_target(guess) {
        return GuessOutcome::correct();
    }

    snapshot
        .lookup(guess)
        .map(|entry| GuessOutcome {
            similarity: entry.similarity,
            rank: entry.rank,
            is_correct: false,
        })
        .unwrap_or_else(GuessOutcome::unknown)
}

pub struct Verifier {
    cache: DailyCache,
    top_cap: usize,
}

impl Verifier {
    pub fn new(cache: DailyCache, top_cap: usize) -> Self {
        Self { cache, top_cap }
    }

    pub fn cache(&self) -> &DailyCache {
        &self.cache
    }

    pub async fn verify(&self, raw: &str) -> Result<GuessOutcome, VerifyError> {
        self.verify_on(raw).await.map(|(_, outcome)| outcome)
    }

    /// Also returns the date of the table that answered.
    pub async fn verify_on(&self, raw: &str) -> Result<(NaiveDate, GuessOutcome), VerifyError> {
        let guess = check_guess(raw)?;
        let snapshot = self.cache.get().await?;

        Ok((snapshot.date(), outcome(&snapshot, &guess)))
    }

    /// Best `limit` ranked words. The target only shows up, first, for a caller who already
    /// found it.
    pub async fn top(
        &self,
        limit: usize,
        proof: Option<&str>,
    ) -> Result<Vec<SimilarityEntry>, VerifyError> {
        let snapshot = self.cache.get().await?;
        let limit = limit.min(self.top_cap);
        let mut top = Vec::with_capacity(limit + 1);

        if let Some(proof) = proof.map(normalize) {
            if snapshot.is_target(&proof) {
                top.push(SimilarityEntry::target(&proof));
            }
        }

        top.extend(snapshot.ranked().take(limit).cloned());

        Ok(top)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bank::store::{DistributionStore, MemoryStore};

    use super::*;
    use crate::cache::{
        CacheSettings,
        tests::{ManualClock, day, payload},
    };

    fn verifier(store: Arc<MemoryStore>, clock: Arc<ManualClock>) -> Verifier {
        let cache = DailyCache::new(store, clock, CacheSettings::default());

        Verifier::new(cache, 100)
    }

    async fn chat_verifier() -> Verifier {
        let store = Arc::new(MemoryStore::new());
        store.publish(day(14), &payload(day(14), "chat")).await.unwrap();

        verifier(store, Arc::new(ManualClock::new(day(14))))
    }

    fn outcome(similarity: f32, rank: Option<u16>, is_correct: bool) -> GuessOutcome {
        GuessOutcome {
            similarity,
            rank,
            is_correct,
        }
    }

    #[tokio::test]
    async fn test_cat_scenario() {
        let verifier = chat_verifier().await;

        assert_eq!(
            verifier.verify("CHIEN").await,
            Ok(outcome(60.0, Some(2), false))
        );
        assert_eq!(
            verifier.verify("voiture").await,
            Ok(outcome(0.0, None, false))
        );
        assert_eq!(
            verifier.verify("chat").await,
            Ok(outcome(100.0, Some(1000), true))
        );
    }

    #[tokio::test]
    async fn test_idempotent() {
        let verifier = chat_verifier().await;

        let first = verifier.verify("félin").await;
        for _ in 0..5 {
            assert_eq!(verifier.verify("félin").await, first);
        }
    }

    #[tokio::test]
    async fn test_normalization() {
        let verifier = chat_verifier().await;

        let expected = verifier.verify("chat").await;
        assert_eq!(verifier.verify("Chat").await, expected);
        assert_eq!(verifier.verify(" chat ").await, expected);
        assert_eq!(verifier.verify("CHAT").await, expected);
    }

    #[tokio::test]
    async fn test_bad_guesses() {
        let verifier = chat_verifier().await;

        assert_eq!(verifier.verify("").await, Err(VerifyError::EmptyGuess));
        assert_eq!(verifier.verify("   ").await, Err(VerifyError::EmptyGuess));
        assert_eq!(
            verifier.verify(&"a".repeat(MAX_GUESS_CHARS + 1)).await,
            Err(VerifyError::Malformed)
        );
    }

    #[tokio::test]
    async fn test_not_ready() {
        let verifier = verifier(
            Arc::new(MemoryStore::new()),
            Arc::new(ManualClock::new(day(14))),
        );

        assert_eq!(
            verifier.verify("chat").await,
            Err(VerifyError::NotReady(CacheError::NotReady))
        );
    }

    #[tokio::test]
    async fn test_rollover() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(day(14)));
        store.publish(day(14), &payload(day(14), "chat")).await.unwrap();
        let verifier = verifier(store.clone(), clock.clone());

        assert!(verifier.verify("chat").await.unwrap().is_correct);

        store.publish(day(15), &payload(day(15), "chien")).await.unwrap();
        clock.set(day(15));

        let (date, yesterday) = verifier.verify_on("chat").await.unwrap();
        assert_eq!(date, day(15));
        assert_eq!(yesterday, outcome(40.0, Some(2), false));
        assert!(verifier.verify("chien").await.unwrap().is_correct);
    }

    #[tokio::test]
    async fn test_top() {
        let verifier = chat_verifier().await;

        let top = verifier.top(10, None).await.unwrap();
        let words: Vec<&str> = top.iter().map(|entry| entry.word.as_str()).collect();
        assert_eq!(words, vec!["félin", "chien"]);

        assert_eq!(verifier.top(1, Some("chien")).await.unwrap().len(), 1);

        let proven = verifier.top(1, Some(" Chat")).await.unwrap();
        assert_eq!(proven[0], SimilarityEntry::target("chat"));
        assert_eq!(proven[1].word, "félin");
    }

    #[tokio::test]
    async fn test_top_cap() {
        let store = Arc::new(MemoryStore::new());
        store.publish(day(14), &payload(day(14), "chat")).await.unwrap();
        let cache = DailyCache::new(
            store,
            Arc::new(ManualClock::new(day(14))),
            CacheSettings::default(),
        );
        let verifier = Verifier::new(cache, 1);

        assert_eq!(verifier.top(50, None).await.unwrap().len(), 1);
    }
}
