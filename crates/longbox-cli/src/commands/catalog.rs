//! Catalog commands - add, list and remove items
//!
//! Every change is saved locally first; with the remote backend enabled the
//! matching push or delete runs before the command exits.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use longbox_core::domain::CatalogItem;

use crate::context::{parse_finite, parse_item_id, AppContext};

/// Add a new issue to the catalog
#[derive(Debug, Args)]
pub struct AddCommand {
    /// Series title
    pub title: String,

    /// Issue number, e.g. "1" or "Annual 3"
    #[arg(long)]
    pub issue: Option<String>,

    #[arg(long)]
    pub publisher: Option<String>,

    /// Cover variant
    #[arg(long)]
    pub variant: Option<String>,

    /// Cover year
    #[arg(long)]
    pub year: Option<i32>,

    /// Price paid
    #[arg(long, value_parser = parse_finite)]
    pub price: Option<f64>,

    /// Condition grade, e.g. 9.4
    #[arg(long, value_parser = parse_finite)]
    pub grade: Option<f64>,

    /// Tag (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// Box or shelf the issue is stored in
    #[arg(long)]
    pub location: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,

    /// Cover image file
    #[arg(long)]
    pub cover: Option<PathBuf>,
}

impl AddCommand {
    pub async fn execute(&self, ctx: &AppContext) -> Result<()> {
        let formatter = ctx.formatter();

        let mut item = CatalogItem::new(&self.title).with_tags(self.tags.iter().cloned());
        item.issue_number = self.issue.clone();
        item.publisher = self.publisher.clone();
        item.variant = self.variant.clone();
        item.year = self.year;
        item.purchase_price = self.price;
        item.grade = self.grade;
        item.storage_location = self.location.clone();
        item.notes = self.notes.clone().unwrap_or_default();

        if let Some(cover) = &self.cover {
            let bytes = tokio::fs::read(cover)
                .await
                .with_context(|| format!("Failed to read cover image {}", cover.display()))?;
            item.image = Some(bytes);
        }

        let session = ctx.open_session().await?;
        let saved = session.service.save(item).await;
        info!(item_id = %saved.id(), title = %saved.title, "Item added");
        session.finish().await;

        if ctx.format.is_json() {
            formatter.print_json(&summary(&saved));
        } else {
            formatter.success(&format!("Added \"{}\"", display_title(&saved)));
            formatter.field("Id", &saved.id().to_string());
        }
        Ok(())
    }
}

/// List catalog items
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Only items carrying this tag
    #[arg(long)]
    pub tag: Option<String>,

    /// Only items from this publisher (case-insensitive)
    #[arg(long)]
    pub publisher: Option<String>,
}

impl ListCommand {
    pub async fn execute(&self, ctx: &AppContext) -> Result<()> {
        let formatter = ctx.formatter();
        let session = ctx.open_session().await?;

        let items: Vec<CatalogItem> = session
            .service
            .items()
            .await
            .into_iter()
            .filter(|item| self.matches(item))
            .collect();
        session.finish().await;

        if ctx.format.is_json() {
            let json: Vec<serde_json::Value> = items.iter().map(summary).collect();
            formatter.print_json(&serde_json::Value::Array(json));
            return Ok(());
        }

        if items.is_empty() {
            formatter.info("No items");
            return Ok(());
        }

        formatter.success(&format!("{} item(s)", items.len()));
        for item in &items {
            let value = item
                .current_value
                .map(|v| format!("{v:.2}"))
                .unwrap_or_else(|| "-".into());
            formatter.info(&format!("{}  {:<40} {:>10}", item.id(), display_title(item), value));
        }
        Ok(())
    }

    fn matches(&self, item: &CatalogItem) -> bool {
        let tag_ok = self
            .tag
            .as_ref()
            .map_or(true, |tag| item.tags.iter().any(|t| t == tag));
        let publisher_ok = self.publisher.as_ref().map_or(true, |wanted| {
            item.publisher
                .as_ref()
                .is_some_and(|p| p.eq_ignore_ascii_case(wanted))
        });
        tag_ok && publisher_ok
    }
}

/// Remove an item from the catalog
#[derive(Debug, Args)]
pub struct RemoveCommand {
    /// Item id
    pub id: String,
}

impl RemoveCommand {
    pub async fn execute(&self, ctx: &AppContext) -> Result<()> {
        let formatter = ctx.formatter();
        let id = parse_item_id(&self.id)?;

        let session = ctx.open_session().await?;
        let removed = session.service.remove(id).await;
        session.finish().await;

        match removed {
            Some(item) => {
                if ctx.format.is_json() {
                    formatter.print_json(&serde_json::json!({"removed": true, "id": id.to_string()}));
                } else {
                    formatter.success(&format!("Removed \"{}\"", display_title(&item)));
                }
            }
            None => {
                if ctx.format.is_json() {
                    formatter.print_json(&serde_json::json!({"removed": false, "id": id.to_string()}));
                } else {
                    formatter.warn(&format!("No item with id {id}"));
                }
            }
        }
        Ok(())
    }
}

/// "Title #issue"
pub fn display_title(item: &CatalogItem) -> String {
    match &item.issue_number {
        Some(issue) => format!("{} #{}", item.title, issue),
        None => item.title.clone(),
    }
}

/// JSON view of an item without the cover bytes
pub fn summary(item: &CatalogItem) -> serde_json::Value {
    serde_json::json!({
        "id": item.id().to_string(),
        "title": item.title,
        "issue_number": item.issue_number,
        "publisher": item.publisher,
        "variant": item.variant,
        "year": item.year,
        "purchase_price": item.purchase_price,
        "current_value": item.current_value,
        "grade": item.grade,
        "tags": item.tags,
        "storage_location": item.storage_location,
        "has_cover": item.has_image(),
        "values": item.value_history().len(),
        "created_at": item.created_at(),
        "modified_at": item.modified_at(),
    })
}
