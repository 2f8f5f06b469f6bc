//! Sync status broadcasting
//!
//! [`SyncStatusPublisher`] exposes two `watch` channels: the full
//! [`SyncState`] and a plain `is_syncing` flag. Operations are bracketed by
//! an [`OperationGuard`]; overlapping operations are counted so `Idle` is
//! only published when the last one finishes.
//!
//! ```text
//!  begin()        begin()        succeed()      fail("...")
//!  Idle ─► Syncing ─────────────────────────────► Error("...")
//!          active=1    active=2   active=1       active=0
//! ```
//!
//! A failure observed while other operations are still running is held
//! back and published once the count reaches zero. The error then stays
//! visible until the next operation begins.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use longbox_core::domain::SyncState;

#[derive(Debug, Default)]
struct Tracker {
    active: usize,
    pending_error: Option<String>,
}

/// Broadcasts the engine's [`SyncState`]
#[derive(Debug)]
pub struct SyncStatusPublisher {
    state_tx: watch::Sender<SyncState>,
    syncing_tx: watch::Sender<bool>,
    tracker: Mutex<Tracker>,
}

impl Default for SyncStatusPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncStatusPublisher {
    pub fn new() -> Self {
        let (state_tx, _) = watch::channel(SyncState::Idle);
        let (syncing_tx, _) = watch::channel(false);
        Self {
            state_tx,
            syncing_tx,
            tracker: Mutex::new(Tracker::default()),
        }
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SyncState> {
        self.state_tx.subscribe()
    }

    pub fn subscribe_syncing(&self) -> watch::Receiver<bool> {
        self.syncing_tx.subscribe()
    }

    /// Current state
    pub fn state(&self) -> SyncState {
        self.state_tx.borrow().clone()
    }

    pub fn is_syncing(&self) -> bool {
        *self.syncing_tx.borrow()
    }

    /// Number of operations currently running
    pub fn active_operations(&self) -> usize {
        self.lock().active
    }

    /// Starts an operation and publishes `Syncing`
    pub fn begin(self: &Arc<Self>) -> OperationGuard {
        let mut tracker = self.lock();
        if tracker.active == 0 {
            tracker.pending_error = None;
            self.publish(SyncState::Syncing);
        }
        tracker.active += 1;
        debug!(active = tracker.active, "Sync operation started");

        OperationGuard {
            publisher: Arc::clone(self),
            finished: false,
        }
    }

    fn finish(&self, outcome: Outcome) {
        let mut tracker = self.lock();
        tracker.active = tracker.active.saturating_sub(1);

        if let Outcome::Failed(message) = outcome {
            warn!(error = %message, "Sync operation failed");
            tracker.pending_error = Some(message);
        }

        if tracker.active > 0 {
            debug!(active = tracker.active, "Sync operation finished; others still running");
            return;
        }

        match tracker.pending_error.take() {
            Some(message) => self.publish(SyncState::Error(message)),
            None => self.publish(SyncState::Idle),
        }
    }

    fn publish(&self, target: SyncState) {
        let current = self.state();
        match current.transition_to(target.clone()) {
            Ok(next) => {
                info!(from = %current, to = %next, "Sync state changed");
                self.syncing_tx.send_replace(next.is_syncing());
                self.state_tx.send_replace(next);
            }
            Err(e) => debug!(error = %e, "Ignoring sync state change"),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Tracker> {
        self.tracker.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

enum Outcome {
    Succeeded,
    Failed(String),
    Cancelled,
}

/// Brackets one sync operation
///
/// Dropping the guard without calling a finishing method counts as a
/// cancellation, so a panicking or aborted task cannot leave the publisher
/// stuck in `Syncing`.
#[must_use = "an operation guard publishes its outcome when finished"]
pub struct OperationGuard {
    publisher: Arc<SyncStatusPublisher>,
    finished: bool,
}

impl OperationGuard {
    pub fn succeed(mut self) {
        self.complete(Outcome::Succeeded);
    }

    pub fn fail(mut self, message: impl Into<String>) {
        self.complete(Outcome::Failed(message.into()));
    }

    /// Ends the operation without recording an error
    pub fn cancel(mut self) {
        self.complete(Outcome::Cancelled);
    }

    fn complete(&mut self, outcome: Outcome) {
        if !self.finished {
            self.finished = true;
            self.publisher.finish(outcome);
        }
    }
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        self.complete(Outcome::Cancelled);
    }
}
