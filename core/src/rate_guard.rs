//! Per-origin attempt limiter.
//!
//! The guard runs before validation so abusive traffic is rejected without
//! touching the store. State is process-local and resets on restart; with
//! several service instances each one enforces its own budget.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::RateLimitConfig;

/// Rejection returned once an origin has used its budget for the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("too many submissions from this origin, retry in {}s", retry_after.as_secs())]
pub struct RateLimited {
    /// Time until the oldest counted attempt leaves the window.
    pub retry_after: Duration,
}

/// Prune-and-check limiter keyed by origin address.
///
/// Implementations must make `check` atomic per origin: pruning expired
/// attempts, comparing against the budget, and recording the admitted
/// attempt happen under one critical section.
pub trait RateGuard: Send + Sync {
    /// Admit or reject one attempt from `origin` at `now`.
    fn check(&self, origin: &str, now: DateTime<Utc>) -> Result<(), RateLimited>;

    /// Drop expired attempts for every origin. Returns the number of origins
    /// that were removed entirely.
    fn prune(&self, now: DateTime<Utc>) -> usize;
}

/// In-memory sliding-window log.
#[derive(Debug)]
pub struct SlidingWindowGuard {
    max_attempts: usize,
    window: chrono::Duration,
    attempts: Mutex<HashMap<String, VecDeque<DateTime<Utc>>>>,
}

impl SlidingWindowGuard {
    pub fn new(max_attempts: usize, window: Duration) -> Self {
        Self {
            max_attempts,
            window: chrono::Duration::from_std(window).unwrap_or_else(|_| chrono::Duration::days(365)),
            attempts: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(cfg: &RateLimitConfig) -> Self {
        Self::new(cfg.max_attempts, Duration::from_secs(cfg.window_secs))
    }

    /// Number of origins currently tracked.
    pub fn tracked_origins(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, VecDeque<DateTime<Utc>>>> {
        self.attempts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn expire(log: &mut VecDeque<DateTime<Utc>>, cutoff: DateTime<Utc>) {
        while log.front().is_some_and(|ts| *ts <= cutoff) {
            log.pop_front();
        }
    }
}

impl RateGuard for SlidingWindowGuard {
    fn check(&self, origin: &str, now: DateTime<Utc>) -> Result<(), RateLimited> {
        let cutoff = now - self.window;
        let mut attempts = self.lock();
        let log = attempts.entry(origin.to_string()).or_default();
        Self::expire(log, cutoff);

        if log.len() >= self.max_attempts {
            let retry_after = log
                .front()
                .map(|oldest| (*oldest + self.window - now).to_std().unwrap_or_default())
                .unwrap_or_default();
            tracing::debug!(
                origin,
                attempts = log.len(),
                retry_after_s = retry_after.as_secs(),
                "Rate guard rejected attempt"
            );
            return Err(RateLimited { retry_after });
        }

        log.push_back(now);
        Ok(())
    }

    fn prune(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.window;
        let mut attempts = self.lock();
        let before = attempts.len();
        attempts.retain(|_, log| {
            Self::expire(log, cutoff);
            !log.is_empty()
        });
        before - attempts.len()
    }
}
