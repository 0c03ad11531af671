//! Sliding-window event throttling.
//!
//! DESIGN
//! ======
//! Exact (not approximate) sliding-window counters backed by
//! `HashMap<String, VecDeque<Instant>>`. An event is admitted only if fewer
//! than `limit` events were admitted in the trailing `window`; the window is
//! the half-open interval `(now - window, now]`, so a timestamp exactly at
//! the cutoff is already expired.
//!
//! Expired timestamps are pruned lazily on the key being touched, plus a
//! full-map sweep from [`cleanup`](SlidingWindowLimiter::cleanup) — either
//! called directly or on a timer via the background maintenance task. Two
//! fixed ceilings bound worst-case memory independent of configuration:
//! [`MAX_EVENTS_PER_KEY`] timestamps per key and [`MAX_KEYS_TRACKED`]
//! distinct keys, past which brand-new identities are refused while existing
//! ones continue to be served.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::maintenance::{CleanupTask, MaintenanceError};

/// Safety ceiling on stored timestamps per key. Admission already keeps live
/// entries at or below `limit`; this caps stale growth when `limit` exceeds it.
pub(crate) const MAX_EVENTS_PER_KEY: usize = 1000;

/// Ceiling on distinct identities tracked at once. At capacity, keys not
/// already present are refused rather than evicting an active identity.
pub(crate) const MAX_KEYS_TRACKED: usize = 100_000;

const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 300;

/// Throttles discrete events to at most `limit` per identity in any trailing
/// `window`.
///
/// One instance per logical policy: the message router and the alert
/// dispatcher each hold their own, parameterized differently. Cloning yields
/// another handle to the same shared state.
#[derive(Clone)]
pub struct SlidingWindowLimiter {
    /// Identity key -> admission timestamps in insertion order.
    events: Arc<RwLock<HashMap<String, VecDeque<Instant>>>>,
    window: Duration,
    limit: usize,
    cleanup_interval: Duration,
    cleanup_task: Arc<CleanupTask>,
}

impl SlidingWindowLimiter {
    /// `limit == 0` always rejects; `window == 0` expires every prior event
    /// instantly.
    #[must_use]
    pub fn new(window: Duration, limit: usize) -> Self {
        Self {
            events: Arc::new(RwLock::new(HashMap::new())),
            window,
            limit,
            cleanup_interval: Duration::from_secs(DEFAULT_CLEANUP_INTERVAL_SECS),
            cleanup_task: Arc::new(CleanupTask::new()),
        }
    }

    /// Override the maintenance sweep interval. Takes effect on the next
    /// [`start_cleanup`](Self::start_cleanup).
    #[must_use]
    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    /// Admit or refuse one event for `key`.
    ///
    /// A refused call still prunes the key's expired entries, so a caller
    /// polling against a closed window does not leave stale growth behind; it
    /// never records a timestamp.
    pub fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }

    fn allow_at(&self, key: &str, now: Instant) -> bool {
        let mut events = self.events.write().unwrap_or_else(PoisonError::into_inner);

        // Capacity guard: refuse identities we are not already tracking once
        // the map is full. Tracked identities are unaffected.
        if !events.contains_key(key) && events.len() >= MAX_KEYS_TRACKED {
            return false;
        }

        let deque = events.entry(key.to_string()).or_default();
        prune_expired(deque, now, self.window);

        if deque.len() >= self.limit {
            if deque.is_empty() {
                // limit == 0 with nothing stored: don't retain an empty key.
                events.remove(key);
            }
            return false;
        }

        while deque.len() >= MAX_EVENTS_PER_KEY {
            deque.pop_front();
        }
        deque.push_back(now);
        true
    }

    /// Milliseconds until an event for `key` would next be admitted.
    ///
    /// Zero when the key is absent or below its limit. Otherwise the time
    /// until the oldest live timestamp leaves the window, bounded by the
    /// window length.
    #[must_use]
    pub fn retry_after_ms(&self, key: &str) -> u64 {
        self.retry_after_ms_at(key, Instant::now())
    }

    fn retry_after_ms_at(&self, key: &str, now: Instant) -> u64 {
        let events = self.events.read().unwrap_or_else(PoisonError::into_inner);
        let Some(deque) = events.get(key) else {
            return 0;
        };

        // Stored entries may include expired timestamps not yet pruned; the
        // deque is time-ordered, so the first live entry is the oldest live.
        let mut live_count = 0;
        let mut oldest_live = None;
        for &t in deque {
            if now.duration_since(t) < self.window {
                live_count += 1;
                if oldest_live.is_none() {
                    oldest_live = Some(t);
                }
            }
        }

        if live_count < self.limit {
            return 0;
        }
        let Some(oldest) = oldest_live else {
            return 0;
        };

        let expires_at = oldest + self.window;
        let retry_after = expires_at.saturating_duration_since(now);
        u64::try_from(retry_after.as_millis()).unwrap_or(u64::MAX)
    }

    /// Drop all history for `key`, live or expired. Administrative override.
    pub fn reset(&self, key: &str) {
        let mut events = self.events.write().unwrap_or_else(PoisonError::into_inner);
        events.remove(key);
    }

    /// Full sweep: prune expired timestamps for every key and drop keys left
    /// with none. Idempotent; safe to call concurrently with admission.
    pub fn cleanup(&self) {
        self.cleanup_at(Instant::now());
    }

    fn cleanup_at(&self, now: Instant) {
        let window = self.window;
        let mut events = self.events.write().unwrap_or_else(PoisonError::into_inner);
        events.retain(|_, deque| {
            prune_expired(deque, now, window);
            !deque.is_empty()
        });
    }

    /// Total stored timestamps across all keys, live or expired.
    pub(crate) fn event_count(&self) -> usize {
        let events = self.events.read().unwrap_or_else(PoisonError::into_inner);
        events.values().map(VecDeque::len).sum()
    }

    /// Start the background maintenance task: one [`cleanup`](Self::cleanup)
    /// sweep per interval until [`stop_cleanup`](Self::stop_cleanup).
    ///
    /// Must be called from within a tokio runtime. Starting while a task is
    /// already running is an error; restarting after a completed stop is fine.
    ///
    /// # Errors
    ///
    /// [`MaintenanceError::AlreadyStarted`] if the task is running,
    /// [`MaintenanceError::ZeroInterval`] if the sweep interval is zero.
    pub fn start_cleanup(&self) -> Result<(), MaintenanceError> {
        let limiter = self.clone();
        self.cleanup_task.start(self.cleanup_interval, move || {
            let before = limiter.event_count();
            limiter.cleanup();
            let after = limiter.event_count();
            if before > after {
                debug!(removed = before - after, remaining = after, "evicted expired rate-limit events");
            }
        })
    }

    /// Stop the maintenance task and wait for it to fully exit.
    ///
    /// Idempotent and safe to call concurrently: every caller returns only
    /// once the task has stopped, and stopping a limiter that never started
    /// one is a no-op. After this returns, no further sweeps run.
    pub async fn stop_cleanup(&self) {
        self.cleanup_task.stop().await;
    }
}

/// Drop leading timestamps that have left the window. The deque is in
/// insertion order, so expired entries are contiguous at the front. A
/// timestamp exactly `window` old is expired.
fn prune_expired(deque: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&front) = deque.front() {
        if now.duration_since(front) >= window {
            deque.pop_front();
        } else {
            break;
        }
    }
}

#[cfg(test)]
#[path = "sliding_window_test.rs"]
mod tests;
