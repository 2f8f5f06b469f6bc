//! Run command - keep the catalog in sync until interrupted
//!
//! Starts a [`SyncScheduler`] that pulls immediately and then every
//! `sync.poll_interval_secs`, and stops cleanly on SIGINT or SIGTERM.

use std::time::Duration;

use anyhow::Result;
use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use longbox_sync::SyncScheduler;

use crate::context::AppContext;

#[derive(Debug, Args)]
pub struct RunCommand {
    /// Override the pull interval in seconds
    #[arg(long)]
    pub interval: Option<u64>,
}

impl RunCommand {
    pub async fn execute(&self, ctx: &AppContext) -> Result<()> {
        let formatter = ctx.formatter();
        if !ctx.config.remote_enabled() {
            formatter.warn("Remote sync is disabled (sync.backend = none); nothing to run");
            return Ok(());
        }

        let interval = Duration::from_secs(
            self.interval
                .unwrap_or(ctx.config.sync.poll_interval_secs)
                .max(1),
        );
        let session = ctx.open_session().await?;
        let shutdown = CancellationToken::new();

        let signal_token = shutdown.clone();
        tokio::spawn(async move {
            shutdown_signal(signal_token).await;
        });

        formatter.success(&format!(
            "Syncing every {}s; press Ctrl+C to stop",
            interval.as_secs()
        ));

        let (scheduler, _trigger) =
            SyncScheduler::new(session.service.clone(), interval, shutdown.clone());
        let cycles = scheduler.run().await;

        info!(cycles, "Stopping");
        session.service.shutdown().await;
        formatter.success(&format!("Stopped after {cycles} pull(s)"));
        Ok(())
    }
}

/// Waits for SIGINT or SIGTERM and cancels `token`
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT (Ctrl+C)"),
        _ = terminate => info!("Received SIGTERM"),
    }

    token.cancel();
}
