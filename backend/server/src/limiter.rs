//! Fixed-window guess limiter, keyed on the client address and kept per process. Advisory
//! only: several instances each keep their own counts.
//!
//! Expired windows are swept at most once per window length, and only once the map is past
//! `SWEEP_THRESHOLD`. Past `MAX_CLIENTS` live windows, new clients are turned away until a
//! sweep frees room.
use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tokio::time::Instant;
use tracing::{debug, warn};

const SWEEP_THRESHOLD: usize = 10_000;
const MAX_CLIENTS: usize = 100_000;

struct Window {
    started: Instant,
    count: u32,
}

#[derive(Default)]
struct Clients {
    windows: HashMap<String, Window>,
    last_sweep: Option<Instant>,
}

pub struct RateLimiter {
    window: Duration,
    max_attempts: u32,
    sweep_threshold: usize,
    max_clients: usize,
    clients: Mutex<Clients>,
}

impl RateLimiter {
    pub fn new(window: Duration, max_attempts: u32) -> Self {
        Self {
            window,
            max_attempts,
            sweep_threshold: SWEEP_THRESHOLD,
            max_clients: MAX_CLIENTS,
            clients: Mutex::new(Clients::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Clients> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn allow(&self, client: &str) -> bool {
        self.allow_at(client, Instant::now())
    }

    pub fn allow_at(&self, client: &str, now: Instant) -> bool {
        let mut clients = self.lock();

        if !clients.windows.contains_key(client) {
            let sweep_due = clients
                .last_sweep
                .is_none_or(|last| now.duration_since(last) >= self.window);

            if clients.windows.len() >= self.sweep_threshold && sweep_due {
                let before = clients.windows.len();
                clients
                    .windows
                    .retain(|_, window| now.duration_since(window.started) < self.window);
                clients.last_sweep = Some(now);
                debug!("Swept {} expired clients", before - clients.windows.len());
            }

            if clients.windows.len() >= self.max_clients {
                warn!("Rate limiter full, turning away a new client");
                return false;
            }
        }

        let window = clients.windows.entry(client.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.duration_since(window.started) >= self.window {
            window.started = now;
            window.count = 0;
        }

        if window.count >= self.max_attempts {
            return false;
        }

        window.count += 1;
        true
    }

    /// Time until the client's window resets, rounded up to whole seconds.
    pub fn retry_after(&self, client: &str) -> Duration {
        self.retry_after_at(client, Instant::now())
    }

    pub fn retry_after_at(&self, client: &str, now: Instant) -> Duration {
        let remaining = self
            .lock()
            .windows
            .get(client)
            .map(|window| self.window.saturating_sub(now.duration_since(window.started)))
            .unwrap_or_default();

        let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);

        Duration::from_secs(secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> RateLimiter {
        RateLimiter::new(Duration::from_secs(60), 30)
    }

    fn bounded(sweep_threshold: usize, max_clients: usize) -> RateLimiter {
        RateLimiter {
            sweep_threshold,
            max_clients,
            ..RateLimiter::new(Duration::from_secs(60), 1)
        }
    }

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn test_rejects_after_max() {
        let limiter = limiter();
        let start = Instant::now();

        for _ in 0..30 {
            assert!(limiter.allow_at("10.0.0.1", start));
        }
        assert!(!limiter.allow_at("10.0.0.1", start + secs(59)));

        // other clients are unaffected
        assert!(limiter.allow_at("10.0.0.2", start));
    }

    #[test]
    fn test_window_reset() {
        let limiter = limiter();
        let start = Instant::now();

        for _ in 0..31 {
            limiter.allow_at("10.0.0.1", start);
        }

        assert!(limiter.allow_at("10.0.0.1", start + secs(60)));
    }

    #[test]
    fn test_retry_after() {
        let limiter = limiter();
        let start = Instant::now();
        limiter.allow_at("10.0.0.1", start);

        assert_eq!(
            limiter.retry_after_at("10.0.0.1", start + Duration::from_millis(40_500)),
            secs(20)
        );
        assert_eq!(limiter.retry_after_at("10.0.0.9", start), secs(1));
    }

    #[test]
    fn test_sweep_expired() {
        let limiter = bounded(3, 100);
        let start = Instant::now();

        for client in ["a", "b", "c"] {
            limiter.allow_at(client, start);
        }

        assert!(limiter.allow_at("late", start + secs(61)));
        assert_eq!(limiter.lock().windows.len(), 1);
    }

    #[test]
    fn test_sweep_at_most_once_per_window() {
        let limiter = bounded(2, 100);
        let start = Instant::now();

        limiter.allow_at("a", start);
        limiter.allow_at("b", start);

        // sweeps, nothing has expired yet
        limiter.allow_at("c", start + secs(59));
        assert_eq!(limiter.lock().windows.len(), 3);

        // a and b expired, but the last sweep is too recent
        limiter.allow_at("d", start + secs(61));
        assert_eq!(limiter.lock().windows.len(), 4);

        // only d is still live
        limiter.allow_at("e", start + secs(120));
        assert_eq!(limiter.lock().windows.len(), 2);
    }

    #[test]
    fn test_full_map_turns_away_new_clients() {
        let limiter = bounded(2, 2);
        let start = Instant::now();

        assert!(limiter.allow_at("a", start));
        assert!(limiter.allow_at("b", start));
        assert!(!limiter.allow_at("c", start));
        assert_eq!(limiter.lock().windows.len(), 2);

        // known clients keep their own window
        assert!(limiter.allow_at("a", start + secs(61)));

        assert!(limiter.allow_at("c", start + secs(62)));
    }
}
