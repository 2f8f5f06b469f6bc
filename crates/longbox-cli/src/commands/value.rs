//! Value command - record, undo and show valuations

use anyhow::Result;
use clap::Subcommand;

use longbox_core::domain::ValuePoint;

use crate::commands::catalog::display_title;
use crate::context::{parse_finite, parse_item_id, AppContext};

#[derive(Debug, Subcommand)]
pub enum ValueCommand {
    /// Record a new valuation for an item
    Set {
        /// Item id
        id: String,
        /// Value in the collection's currency
        #[arg(value_parser = parse_finite)]
        value: f64,
        /// Mark the value as an estimate rather than a manual appraisal
        #[arg(long)]
        estimated: bool,
        #[arg(long)]
        note: Option<String>,
    },
    /// Remove the most recent valuation
    Undo {
        /// Item id
        id: String,
    },
    /// Show the valuation history
    History {
        /// Item id
        id: String,
    },
}

impl ValueCommand {
    pub async fn execute(&self, ctx: &AppContext) -> Result<()> {
        match self {
            ValueCommand::Set {
                id,
                value,
                estimated,
                note,
            } => {
                let mut point = if *estimated {
                    ValuePoint::estimated(*value)
                } else {
                    ValuePoint::manual(*value)
                };
                if let Some(note) = note {
                    point = point.with_note(note.clone());
                }
                self.execute_set(ctx, id, point).await
            }
            ValueCommand::Undo { id } => self.execute_undo(ctx, id).await,
            ValueCommand::History { id } => self.execute_history(ctx, id).await,
        }
    }

    async fn execute_set(&self, ctx: &AppContext, raw_id: &str, point: ValuePoint) -> Result<()> {
        let formatter = ctx.formatter();
        let id = parse_item_id(raw_id)?;

        let session = ctx.open_session().await?;
        let result = session.service.record_value(id, point).await;
        session.finish().await;
        let item = result?;

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::json!({
                "id": id.to_string(),
                "current_value": item.current_value,
                "history_len": item.value_history().len(),
            }));
        } else {
            formatter.success(&format!(
                "{} now valued at {:.2}",
                display_title(&item),
                item.current_value.unwrap_or_default()
            ));
        }
        Ok(())
    }

    async fn execute_undo(&self, ctx: &AppContext, raw_id: &str) -> Result<()> {
        let formatter = ctx.formatter();
        let id = parse_item_id(raw_id)?;

        let session = ctx.open_session().await?;
        let result = session.service.undo_last_value(id).await;
        session.finish().await;

        match result? {
            Some(point) if ctx.format.is_json() => {
                formatter.print_json(&serde_json::json!({"id": id.to_string(), "removed": point}));
            }
            Some(point) => formatter.success(&format!(
                "Removed {} valuation of {:.2} from {}",
                point.source,
                point.value,
                point.date.format("%Y-%m-%d")
            )),
            None if ctx.format.is_json() => {
                formatter.print_json(&serde_json::json!({"id": id.to_string(), "removed": null}));
            }
            None => formatter.warn("No valuations to undo"),
        }
        Ok(())
    }

    async fn execute_history(&self, ctx: &AppContext, raw_id: &str) -> Result<()> {
        let formatter = ctx.formatter();
        let id = parse_item_id(raw_id)?;

        let session = ctx.open_session().await?;
        let item = session.service.get(&id).await;
        session.finish().await;

        let Some(item) = item else {
            formatter.error(&format!("No item with id {id}"));
            anyhow::bail!("item not found");
        };

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::json!({
                "id": id.to_string(),
                "history": item.value_history(),
            }));
            return Ok(());
        }

        formatter.success(&display_title(&item));
        if item.value_history().is_empty() {
            formatter.info("No valuations recorded");
        }
        for point in item.value_history() {
            let note = point.note.as_deref().unwrap_or("");
            formatter.info(&format!(
                "{}  {:>10.2}  {:<9} {}",
                point.date.format("%Y-%m-%d"),
                point.value,
                point.source,
                note
            ));
        }
        Ok(())
    }
}
