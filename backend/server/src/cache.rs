//! # Process-Local Cache
//!
//! Every instance keeps the day's table in memory and only goes to the distribution store when
//! it turns stale.
//!
//! ## Freshness
//! - Fresh while the day-key is still today and the deadline has not passed
//! - Deadline is fetch time + `ttl` when the store had today's table, so a same-day republish
//!   still gets picked up
//! - Deadline is fetch time + `retry` when the store still holds an older day (daily job late),
//!   or when the fetch failed
//!
//! ## Single Flight
//! One fetch per day-key at a time. The fetch runs in its own task and reports through a
//! `watch` channel, so a waiter giving up after `wait` never cancels it. The next caller just
//! finds the result installed.
//!
//! ## Failures
//! The last good snapshot keeps being served. Without one, callers get `NotReady` and the
//! next call starts another fetch.
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use bank::{
    DailyPayload, SimilarityEntry,
    payload::{PayloadError, TARGET_RANK},
    store::{DistributionStore, StoreError},
};
use chrono::{NaiveDate, Utc};
use thiserror::Error;
use tokio::{
    sync::watch,
    time::{Instant, timeout},
};
use tracing::{info, warn};

pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

pub struct UtcClock;

impl Clock for UtcClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CacheError {
    #[error("Daily table is not loaded yet")]
    NotReady,
}

/// A validated table with its lookup index. The target word never leaves this type except
/// through [`DailySnapshot::is_target`].
pub struct DailySnapshot {
    payload: DailyPayload,
    index: HashMap<String, usize>,
    ranked: Vec<usize>,
}

impl DailySnapshot {
    pub fn new(payload: DailyPayload) -> Result<Self, PayloadError> {
        payload.validate()?;

        let index = payload
            .similarities
            .iter()
            .enumerate()
            .map(|(position, entry)| (entry.word.clone(), position))
            .collect();

        let mut ranked: Vec<usize> = payload
            .similarities
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.rank.is_some_and(|rank| rank != TARGET_RANK))
            .map(|(position, _)| position)
            .collect();
        ranked.sort_by_key(|&position| payload.similarities[position].rank);

        Ok(Self {
            payload,
            index,
            ranked,
        })
    }

    pub fn date(&self) -> NaiveDate {
        self.payload.date
    }

    /// Expects a normalized word.
    pub fn lookup(&self, word: &str) -> Option<&SimilarityEntry> {
        self.index
            .get(word)
            .map(|&position| &self.payload.similarities[position])
    }

    pub fn is_target(&self, word: &str) -> bool {
        self.payload.word == word
    }

    /// Ranked entries by rank ascending, the target excluded.
    pub fn ranked(&self) -> impl Iterator<Item = &SimilarityEntry> {
        self.ranked
            .iter()
            .map(|&position| &self.payload.similarities[position])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    pub ttl: Duration,
    pub retry: Duration,
    pub wait: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60 * 60),
            retry: Duration::from_secs(30),
            wait: Duration::from_millis(3000),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CachePhase {
    Uninitialized,
    Loading,
    Ready { date: NaiveDate },
}

impl CachePhase {
    pub fn status(&self) -> &'static str {
        match self {
            CachePhase::Uninitialized => "uninitialized",
            CachePhase::Loading => "loading",
            CachePhase::Ready { .. } => "ready",
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            CachePhase::Ready { date } => Some(*date),
            _ => None,
        }
    }
}

type Snapshot = Option<Arc<DailySnapshot>>;

struct InFlight {
    day: NaiveDate,
    // None until the fetch settles, then whatever snapshot is current
    done: watch::Receiver<Option<Snapshot>>,
}

impl InFlight {
    /// False once the fetch task is gone without settling, e.g. it panicked.
    fn alive(&self) -> bool {
        self.done.has_changed().is_ok()
    }
}

#[derive(Default)]
struct Inner {
    snapshot: Snapshot,
    checked: Option<(NaiveDate, Instant)>,
    in_flight: Option<InFlight>,
}

impl Inner {
    fn fresh(&self, today: NaiveDate, now: Instant) -> Snapshot {
        match (&self.snapshot, self.checked) {
            (Some(snapshot), Some((day, until))) if day == today && now < until => {
                Some(snapshot.clone())
            }
            _ => None,
        }
    }

    fn postpone(&mut self, day: NaiveDate, now: Instant, retry: Duration) {
        self.checked = Some((day, now + retry));
    }
}

struct Shared {
    store: Arc<dyn DistributionStore>,
    clock: Arc<dyn Clock>,
    settings: CacheSettings,
    inner: Mutex<Inner>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn settle(&self, day: NaiveDate, fetched: Result<Option<DailyPayload>, StoreError>) -> Snapshot {
        let now = Instant::now();
        let retry = self.settings.retry;
        let mut inner = self.lock();

        if inner.in_flight.as_ref().is_some_and(|flight| flight.day == day) {
            inner.in_flight = None;
        }

        let payload = match fetched {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                warn!("No daily table published yet, retrying in {}s", retry.as_secs());
                inner.postpone(day, now, retry);
                return inner.snapshot.clone();
            }
            Err(e) => {
                warn!("Failed to fetch daily table: {e}");
                inner.postpone(day, now, retry);
                return inner.snapshot.clone();
            }
        };

        let snapshot = match DailySnapshot::new(payload) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Store returned an invalid table: {e}");
                inner.postpone(day, now, retry);
                return inner.snapshot.clone();
            }
        };

        if inner
            .snapshot
            .as_ref()
            .is_some_and(|current| current.date() > snapshot.date())
        {
            warn!("Store returned {}, older than the cached table", snapshot.date());
            inner.postpone(day, now, retry);
            return inner.snapshot.clone();
        }

        let valid_for = if snapshot.date() >= day {
            self.settings.ttl
        } else {
            info!(
                "Store still holds {} on {day}, retrying in {}s",
                snapshot.date(),
                retry.as_secs()
            );
            retry
        };

        info!("Loaded daily table for {}", snapshot.date());
        inner.snapshot = Some(Arc::new(snapshot));
        inner.checked = Some((day, now + valid_for));

        inner.snapshot.clone()
    }
}

#[derive(Clone)]
pub struct DailyCache {
    shared: Arc<Shared>,
}

impl DailyCache {
    pub fn new(
        store: Arc<dyn DistributionStore>,
        clock: Arc<dyn Clock>,
        settings: CacheSettings,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                store,
                clock,
                settings,
                inner: Mutex::new(Inner::default()),
            }),
        }
    }

    pub async fn get(&self) -> Result<Arc<DailySnapshot>, CacheError> {
        let today = self.shared.clock.today();

        let (fallback, mut done) = {
            let mut inner = self.shared.lock();

            if let Some(snapshot) = inner.fresh(today, Instant::now()) {
                return Ok(snapshot);
            }

            let joined = inner
                .in_flight
                .as_ref()
                .filter(|flight| flight.day == today && flight.alive())
                .map(|flight| flight.done.clone());

            let done = match joined {
                Some(done) => done,
                None => self.spawn_refresh(&mut inner, today),
            };

            (inner.snapshot.clone(), done)
        };

        let settled = timeout(self.shared.settings.wait, async {
            done.wait_for(Option::is_some)
                .await
                .map(|settled| (*settled).clone().flatten())
        })
        .await;

        match settled {
            Ok(Ok(Some(snapshot))) => Ok(snapshot),
            _ => fallback.ok_or(CacheError::NotReady),
        }
    }

    fn spawn_refresh(&self, inner: &mut Inner, day: NaiveDate) -> watch::Receiver<Option<Snapshot>> {
        let (tx, rx) = watch::channel(None);
        inner.in_flight = Some(InFlight {
            day,
            done: rx.clone(),
        });

        let shared = self.shared.clone();
        tokio::spawn(async move {
            let fetched = shared.store.fetch_latest().await;
            let current = shared.settle(day, fetched);
            tx.send_replace(Some(current));
        });

        rx
    }

    pub fn phase(&self) -> CachePhase {
        let inner = self.shared.lock();

        match (&inner.snapshot, &inner.in_flight) {
            (Some(snapshot), _) => CachePhase::Ready {
                date: snapshot.date(),
            },
            (None, Some(flight)) if flight.alive() => CachePhase::Loading,
            (None, _) => CachePhase::Uninitialized,
        }
    }
}
