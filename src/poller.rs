//! Generic interval-driven re-fetch with a start/stop lifecycle.
//!
//! Every collection that tracks a server-side resource in a non-terminal
//! state (active task, processing projects, degraded health) polls through
//! one of these instead of its own ad hoc timer. The contract:
//!
//! - `start` while already running is a no-op — at most one timer is ever
//!   active per poller.
//! - The first tick fires immediately, then at fixed wall-clock cadence.
//!   A tick that comes due while the previous fetch is still in flight is
//!   skipped, not queued; fetches never overlap.
//! - The terminal predicate is consulted only on successful fetches. A
//!   failed fetch is transient: it never stops polling by itself.
//! - `stop` is idempotent and safe when not running; once it returns, no
//!   further fetch begins. Dropping the poller stops it, so an owner going
//!   away cannot leave an orphaned timer mutating its store.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Interval-driven re-fetch of one tracked resource.
pub struct Poller {
    active: Mutex<Option<JoinHandle<()>>>,
}

impl Default for Poller {
    fn default() -> Self {
        Self::new()
    }
}

impl Poller {
    pub fn new() -> Self {
        Self {
            active: Mutex::new(None),
        }
    }

    /// Arm the poller: invoke `fetch` now and then every `every`, until
    /// `until` returns true for a fetched value or [`stop`](Self::stop) is
    /// called. No-op if a timer is already active.
    ///
    /// `fetch` owns its side effects — it is expected to write the fetched
    /// value (or the error) into the caller's store; the poller only drives
    /// the cadence and the stop decision.
    pub fn start<T, E, F, Fut, P>(&self, every: Duration, mut fetch: F, until: P)
    where
        T: Send + 'static,
        E: Send + 'static,
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send,
        P: Fn(&T) -> bool + Send + 'static,
    {
        let mut guard = self.active.lock().unwrap();
        if let Some(handle) = guard.as_ref() {
            if !handle.is_finished() {
                return;
            }
        }

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // Fetches are awaited inside the loop, so a slow fetch delays the
            // next tick() call past its deadline; Skip drops the missed
            // ticks instead of firing them back-to-back.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                match fetch().await {
                    Ok(value) if until(&value) => break,
                    Ok(_) => {}
                    // Transient failure: the fetch recorded it; keep polling.
                    Err(_) => {}
                }
            }
        });
        *guard = Some(handle);
    }

    /// Cancel the pending timer. Idempotent; safe to call when not running.
    pub fn stop(&self) {
        if let Some(handle) = self.active.lock().unwrap().take() {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.active
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}
