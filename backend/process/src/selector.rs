//! # Daily Word Selector
//!
//! One answer per day, ever. Picks uniformly among vocabulary words the history has never
//! seen, with the RNG seeded from the date so a rerun of the same day picks the same word.
//!
//! Running out of words is an operator problem, never solved by reusing one.
use std::collections::HashSet;

use bank::{history::WordHistory, normalize, payload::day_key};
use chrono::{Datelike, NaiveDate};
use rand::{SeedableRng, rngs::StdRng, seq::IndexedRandom};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum SelectionError {
    #[error("Every vocabulary word has already been used, the word list needs more words")]
    Exhausted,

    #[error("The word recorded for {0} cannot be built, fix the model or the history")]
    RecordedWordRejected(String),
}

pub fn select_word(
    history: &WordHistory,
    vocabulary: &[String],
    date: NaiveDate,
    excluded: &HashSet<String>,
) -> Result<String, SelectionError> {
    if let Some(recorded) = history.word_for(date) {
        if excluded.contains(recorded) {
            return Err(SelectionError::RecordedWordRejected(day_key(date)));
        }

        return Ok(recorded.to_string());
    }

    let used = history.used_words();
    let mut seen = HashSet::new();

    let survivors: Vec<String> = vocabulary
        .iter()
        .map(|word| normalize(word))
        .filter(|word| !word.is_empty())
        .filter(|word| !used.contains(word) && !excluded.contains(word))
        .filter(|word| seen.insert(word.clone()))
        .collect();

    let mut rng = StdRng::seed_from_u64(date.num_days_from_ce() as u64);

    survivors
        .choose(&mut rng)
        .cloned()
        .ok_or(SelectionError::Exhausted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::tests::words;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    #[test]
    fn test_never_returns_history_word() {
        let vocabulary = words(&["chat", "chien", "félin", "voiture"]);
        let mut history = WordHistory::default();
        history.append(day(1), "chat").unwrap();
        history.append(day(2), "chien").unwrap();
        history.append(day(3), "félin").unwrap();

        for d in 4..28 {
            let word = select_word(&history, &vocabulary, day(d), &HashSet::new()).unwrap();
            assert_eq!(word, "voiture");
        }
    }

    #[test]
    fn test_exhausted() {
        let vocabulary = words(&["chat", "Chien"]);
        let mut history = WordHistory::default();
        history.append(day(1), "chat").unwrap();
        history.append(day(2), "chien").unwrap();

        assert_eq!(
            select_word(&history, &vocabulary, day(3), &HashSet::new()),
            Err(SelectionError::Exhausted)
        );
    }

    #[test]
    fn test_empty_vocabulary() {
        assert_eq!(
            select_word(&WordHistory::default(), &[], day(1), &HashSet::new()),
            Err(SelectionError::Exhausted)
        );
    }

    #[test]
    fn test_same_day_is_reproducible() {
        let vocabulary: Vec<String> = (0..500).map(|i| format!("mot{i}")).collect();
        let history = WordHistory::default();

        let first = select_word(&history, &vocabulary, day(5), &HashSet::new()).unwrap();
        let second = select_word(&history, &vocabulary, day(5), &HashSet::new()).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_recorded_word_is_reused() {
        let vocabulary = words(&["chat", "chien"]);
        let mut history = WordHistory::default();
        history.append(day(1), "chat").unwrap();

        assert_eq!(
            select_word(&history, &vocabulary, day(1), &HashSet::new()),
            Ok("chat".to_string())
        );
    }

    #[test]
    fn test_excluded_words_are_skipped() {
        let vocabulary = words(&["chat", "chien"]);
        let excluded = HashSet::from(["chat".to_string()]);

        assert_eq!(
            select_word(&WordHistory::default(), &vocabulary, day(1), &excluded),
            Ok("chien".to_string())
        );

        let mut history = WordHistory::default();
        history.append(day(1), "chat").unwrap();

        assert!(matches!(
            select_word(&history, &vocabulary, day(1), &excluded),
            Err(SelectionError::RecordedWordRejected(_))
        ));
    }
}
