//! Status command - catalog size, backend and sync bookkeeping

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;

use crate::context::AppContext;

#[derive(Debug, Args)]
pub struct StatusCommand {}

impl StatusCommand {
    pub async fn execute(&self, ctx: &AppContext) -> Result<()> {
        let formatter = ctx.formatter();
        let session = ctx.open_session().await?;

        let items = session.service.items().await;
        let metadata = session.metadata.get().await;
        let state = session.service.backend().status().state();
        let backend = session.service.backend().name();
        session.finish().await;

        let with_cover = items.iter().filter(|i| i.has_image()).count();
        let total_value: f64 = items.iter().filter_map(|i| i.current_value).sum();

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::json!({
                "items": items.len(),
                "with_cover": with_cover,
                "total_value": total_value,
                "backend": backend,
                "state": state,
                "namespace_ready": metadata.namespace_ready,
                "last_pull_at": metadata.last_pull_at,
                "last_push_at": metadata.last_push_at,
                "store_path": ctx.config.store.path.display().to_string(),
            }));
            return Ok(());
        }

        formatter.success("Longbox status");
        formatter.field("Items", &items.len().to_string());
        formatter.field("With cover", &with_cover.to_string());
        formatter.field("Total value", &format!("{total_value:.2}"));
        formatter.field("Backend", backend);
        formatter.field("Sync state", &state.to_string());
        if ctx.config.remote_enabled() {
            formatter.field("Remote", &ctx.config.remote.base_url);
            formatter.field("Zone", &ctx.config.remote.zone);
            formatter.field("Last pull", &when(metadata.last_pull_at));
            formatter.field("Last push", &when(metadata.last_push_at));
        }
        formatter.field("Store", &ctx.config.store.path.display().to_string());
        Ok(())
    }
}

fn when(at: Option<DateTime<Utc>>) -> String {
    at.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "never".into())
}
