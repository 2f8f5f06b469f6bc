//! Sync scheduler - periodic and on-demand pulls
//!
//! The [`SyncScheduler`] runs a pull every `sync.poll_interval_secs` and
//! whenever a [`SyncTrigger`] asks for one, until its cancellation token
//! fires. A token cancelled mid-pull also shuts the sync backend down, so
//! the pull's outstanding network calls are abandoned.
//!
//! ```text
//! interval tick ──┐
//!                 ├──► SyncScheduler ──► CatalogService::sync_now()
//! SyncTrigger ────┘          ▲
//!                            │ cancelled()
//!                    CancellationToken
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::PullReport;
use crate::service::CatalogService;
use crate::SyncError;

/// Requests an immediate pull from a running [`SyncScheduler`]
#[derive(Debug, Clone)]
pub struct SyncTrigger {
    notify: Arc<Notify>,
}

impl SyncTrigger {
    /// Asks for a pull; requests made while one is running collapse into one
    pub fn request_sync(&self) {
        debug!("Foreground sync requested");
        self.notify.notify_one();
    }
}

/// Drives pulls for a [`CatalogService`]
pub struct SyncScheduler {
    service: Arc<CatalogService>,
    interval: Duration,
    notify: Arc<Notify>,
    cancel: CancellationToken,
}

impl SyncScheduler {
    /// Creates a scheduler and the trigger that wakes it
    pub fn new(
        service: Arc<CatalogService>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> (Self, SyncTrigger) {
        let notify = Arc::new(Notify::new());
        info!(interval_secs = interval.as_secs(), "Creating sync scheduler");

        let scheduler = Self {
            service,
            interval,
            notify: Arc::clone(&notify),
            cancel,
        };
        (scheduler, SyncTrigger { notify })
    }

    /// Runs until cancelled; returns the number of pulls performed
    ///
    /// The first pull happens immediately.
    pub async fn run(self) -> u64 {
        info!("Sync scheduler starting");
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cycles = 0u64;

        loop {
            let reason = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = self.notify.notified() => "requested",
                _ = ticker.tick() => "periodic",
            };

            cycles += 1;
            debug!(reason, cycle = cycles, "Starting scheduled pull");
            match self.pull_until_cancelled().await {
                Ok(report) => debug!(
                    fetched = report.fetched,
                    applied = report.applied,
                    "Scheduled pull finished"
                ),
                Err(SyncError::Cancelled) => break,
                Err(e) => warn!(error = %e, "Scheduled pull failed"),
            }

            if reason == "requested" {
                ticker.reset();
            }
        }

        info!(cycles, "Sync scheduler stopped");
        cycles
    }

    /// Runs one pull; cancellation shuts the backend down so the pull's
    /// network calls stop instead of running to completion
    async fn pull_until_cancelled(&self) -> Result<PullReport, SyncError> {
        let pull = self.service.sync_now();
        tokio::pin!(pull);

        tokio::select! {
            biased;
            result = &mut pull => result,
            _ = self.cancel.cancelled() => {
                info!("Stop requested during pull; cancelling network calls");
                self.service.backend().shutdown();
                pull.await
            }
        }
    }
}
