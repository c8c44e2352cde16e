//! Polling state machine for transient-status records.
//!
//! Without a server-push channel, the only way to observe backend
//! processing progress is to re-fetch. [`StatusWatcher`] is an explicit
//! two-state machine, `Idle` or `Polling`: armed whenever any visible
//! record is in a transient state, disarmed the moment none is. Keeping the
//! timer ownership explicit (instead of an always-running timer with an
//! early-return guard) lets tests assert "timer is not armed" directly.

use std::sync::Weak;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Target of a polling tick. Implemented by `FetchCoordinator`, whose tick
/// re-fetches page 1.
#[async_trait]
pub trait Pollable: Send + Sync {
    /// Called on each timer tick while polling is armed.
    async fn poll_tick(&self);
}

enum WatchState {
    Idle,
    Polling {
        cancel: CancellationToken,
        handle: JoinHandle<()>,
    },
}

/// Starts and stops a fixed-interval polling timer based on whether any
/// visible record is still in a transient state.
pub struct StatusWatcher {
    interval: Duration,
    state: Mutex<WatchState>,
}

impl StatusWatcher {
    /// Creates a watcher in the `Idle` state.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            state: Mutex::new(WatchState::Idle),
        }
    }

    /// Whether the polling timer is currently armed.
    #[must_use]
    pub fn is_polling(&self) -> bool {
        matches!(&*self.state.lock(), WatchState::Polling { .. })
    }

    /// Re-evaluates the state machine after a store mutation.
    ///
    /// `Idle -> Polling` when `any_transient` becomes true; `Polling ->
    /// Idle` when it becomes false. Re-entering the current state is a
    /// no-op, so a timer is never double-armed.
    pub fn evaluate(&self, any_transient: bool, target: Weak<dyn Pollable>) {
        let mut state = self.state.lock();
        let polling = matches!(&*state, WatchState::Polling { .. });
        if any_transient && !polling {
            debug!(interval = ?self.interval, "arming status poll");
            *state = self.arm(target);
        } else if !any_transient && polling {
            debug!("all records settled; disarming status poll");
            Self::stop(&mut state);
        }
    }

    /// Forces `Polling -> Idle`, clearing the timer.
    pub fn dispose(&self) {
        Self::stop(&mut self.state.lock());
    }

    fn arm(&self, target: Weak<dyn Pollable>) -> WatchState {
        let cancel = CancellationToken::new();
        let child = cancel.clone();
        let interval = self.interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // Skip the immediate first tick so a poll doesn't fire at arm time.
            ticker.tick().await;

            loop {
                tokio::select! {
                    () = child.cancelled() => break,
                    _ = ticker.tick() => {
                        let Some(target) = target.upgrade() else { break };
                        target.poll_tick().await;
                    }
                }
            }
        });

        WatchState::Polling { cancel, handle }
    }

    fn stop(state: &mut WatchState) {
        if let WatchState::Polling { cancel, handle } =
            std::mem::replace(state, WatchState::Idle)
        {
            cancel.cancel();
            handle.abort();
        }
    }
}

impl Drop for StatusWatcher {
    fn drop(&mut self) {
        Self::stop(self.state.get_mut());
    }
}
