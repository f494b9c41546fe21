use std::{
    collections::{HashMap, HashSet},
    sync::{Mutex, MutexGuard, PoisonError},
};

use chrono::NaiveDate;
use serde::Serialize;

#[derive(Default)]
struct Day {
    date: Option<NaiveDate>,
    attempts: HashMap<String, u32>,
    players: HashSet<String>,
    solvers: HashSet<String>,
    guesses: u64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct GuessStats {
    pub date: Option<NaiveDate>,
    pub players: usize,
    pub solvers: usize,
    pub guesses: u64,
}

/// Per-process guess counters for the current day. Starts over whenever a newer day shows up.
#[derive(Default)]
pub struct GuessLog {
    day: Mutex<Day>,
}

impl GuessLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Day> {
        self.day.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the session's attempt count for the day, this guess included. Players and
    /// solvers are counted per client address, so rotating session ids does not inflate them.
    pub fn record(&self, date: NaiveDate, client: &str, session: &str, correct: bool) -> u32 {
        let mut day = self.lock();

        // a guess answered from an older table while the log is already on a newer day counts
        // toward the newer day
        if day.date.is_none_or(|current| date > current) {
            *day = Day {
                date: Some(date),
                ..Day::default()
            };
        }

        day.guesses += 1;
        day.players.insert(client.to_string());
        if correct {
            day.solvers.insert(client.to_string());
        }

        let attempts = day.attempts.entry(session.to_string()).or_insert(0);
        *attempts += 1;

        *attempts
    }

    pub fn stats(&self) -> GuessStats {
        let day = self.lock();

        GuessStats {
            date: day.date,
            players: day.players.len(),
            solvers: day.solvers.len(),
            guesses: day.guesses,
        }
    }
}
