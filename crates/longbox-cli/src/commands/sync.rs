//! Pull and push commands
//!
//! `pull` merges the remote table into the local catalog; `push` uploads the
//! whole local catalog in batches. Both report failures through the exit
//! status while leaving local data untouched.

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use crate::context::AppContext;

/// Fetch the remote table and merge it into the local catalog
#[derive(Debug, Args)]
pub struct PullCommand {}

impl PullCommand {
    pub async fn execute(&self, ctx: &AppContext) -> Result<()> {
        let formatter = ctx.formatter();
        if !ctx.config.remote_enabled() {
            formatter.warn("Remote sync is disabled (sync.backend = none); nothing to pull");
            return Ok(());
        }

        let session = ctx.open_session().await?;
        let result = session.service.sync_now().await;
        session.finish().await;
        let report = result.context("Pull failed")?;

        info!(fetched = report.fetched, applied = report.applied, "Pull finished");

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::to_value(&report)?);
        } else {
            formatter.success("Pull complete");
            formatter.field("Fetched", &report.fetched.to_string());
            formatter.field("Skipped", &report.skipped.to_string());
            formatter.field("Updated", &report.merge.adopted_remote.to_string());
            formatter.field("Added", &report.merge.added_remote.to_string());
            formatter.field("Kept local", &report.merge.kept_local.to_string());
            formatter.field("Duration", &format!("{} ms", report.duration_ms));
        }
        Ok(())
    }
}

/// Upload the entire local catalog to the remote table
#[derive(Debug, Args)]
pub struct PushCommand {}

impl PushCommand {
    pub async fn execute(&self, ctx: &AppContext) -> Result<()> {
        let formatter = ctx.formatter();
        if !ctx.config.remote_enabled() {
            formatter.warn("Remote sync is disabled (sync.backend = none); nothing to push");
            return Ok(());
        }

        let session = ctx.open_session().await?;
        let result = session.service.push_everything().await;
        session.finish().await;
        let report = result.context("Push failed")?;

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::to_value(&report)?);
        } else if report.is_complete_success() {
            formatter.success(&format!(
                "Pushed {} record(s) in {} batch(es)",
                report.records_saved, report.batches_attempted
            ));
        } else {
            formatter.warn(&format!(
                "{} of {} batch(es) failed; {} record(s) saved",
                report.batches_failed, report.batches_attempted, report.records_saved
            ));
            for error in &report.errors {
                formatter.info(error);
            }
        }

        if !report.is_complete_success() {
            anyhow::bail!("{} batch(es) failed", report.batches_failed);
        }
        Ok(())
    }
}
