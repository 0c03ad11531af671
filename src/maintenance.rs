//! Background maintenance task lifecycle.
//!
//! DESIGN
//! ======
//! A cancellable periodic task: stopped -> running -> stopped. Stop uses a
//! pair of `watch` channels — one to signal the task, one for the task to
//! announce it has exited — so any number of stoppers can wait on the same
//! exit without racing. `watch::Sender::send` is idempotent, which rules out
//! the double-close panic a one-shot channel-close stop signal invites.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::info;

/// Programmer errors from [`CleanupTask::start`]. Stopping is total and never
/// errors.
#[derive(Debug, thiserror::Error)]
pub enum MaintenanceError {
    #[error("cleanup task already running")]
    AlreadyStarted,
    #[error("cleanup interval must be non-zero")]
    ZeroInterval,
}

/// Channel ends for a spawned sweep task. Kept after stop so a later start
/// can tell "stopped" from "running" via the done flag.
struct RunningTask {
    stop_tx: watch::Sender<bool>,
    done_rx: watch::Receiver<bool>,
}

pub(crate) struct CleanupTask {
    running: Mutex<Option<RunningTask>>,
}

impl CleanupTask {
    pub(crate) fn new() -> Self {
        Self { running: Mutex::new(None) }
    }

    /// Spawn the periodic sweep. `sweep` runs once per `interval` tick until
    /// [`stop`](Self::stop) is called.
    pub(crate) fn start<F>(&self, interval: Duration, mut sweep: F) -> Result<(), MaintenanceError>
    where
        F: FnMut() + Send + 'static,
    {
        if interval.is_zero() {
            return Err(MaintenanceError::ZeroInterval);
        }

        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = running.as_ref() {
            if !*task.done_rx.borrow() {
                return Err(MaintenanceError::AlreadyStarted);
            }
        }

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let (done_tx, done_rx) = watch::channel(false);

        info!(interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX), "rate-limit cleanup task started");
        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => sweep(),
                    _ = stop_rx.changed() => break,
                }
            }
            info!("rate-limit cleanup task stopped");
            let _ = done_tx.send(true);
        });

        *running = Some(RunningTask { stop_tx, done_rx });
        Ok(())
    }

    /// Signal the task and wait until it has fully exited.
    ///
    /// Safe to call twice, concurrently from many callers, or without a prior
    /// start: every caller returns only after the task is stopped, and
    /// re-signalling an already-stopped task is harmless.
    pub(crate) async fn stop(&self) {
        // Snapshot the channels under the lock; never hold it across awaits.
        let done_rx = {
            let running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
            match running.as_ref() {
                Some(task) => {
                    // send is idempotent; Err means the task already exited.
                    let _ = task.stop_tx.send(true);
                    Some(task.done_rx.clone())
                }
                None => None,
            }
        };

        if let Some(mut done_rx) = done_rx {
            // Err only if the task aborted without signalling; either way it
            // is no longer running.
            let _ = done_rx.wait_for(|done| *done).await;
        }
    }
}

#[cfg(test)]
#[path = "maintenance_test.rs"]
mod tests;
