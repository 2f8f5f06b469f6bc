//! Catalog merge
//!
//! `ConflictResolver::merge` reconciles the full local snapshot with a full
//! remote fetch. It performs no I/O; callers decide whether to persist the
//! result based on [`MergeStats::changed`].

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use longbox_core::domain::{CatalogItem, ItemId};

use crate::detector::{Decision, PrecedenceDetector};

/// Per-category counts of a merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    /// Items present on both sides where the remote copy replaced local content
    pub adopted_remote: usize,
    /// Items present on both sides with identical content
    pub unchanged: usize,
    /// Items present on both sides where local was strictly newer
    pub kept_local: usize,
    /// Items only present remotely
    pub added_remote: usize,
    /// Items only present locally
    pub local_only: usize,
}

impl MergeStats {
    /// True when the merged set differs from the local input
    pub fn changed(&self) -> bool {
        self.adopted_remote + self.added_remote > 0
    }

    /// Number of distinct items in the merged set
    pub fn total(&self) -> usize {
        self.adopted_remote + self.unchanged + self.kept_local + self.added_remote + self.local_only
    }
}

/// Result of a merge
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// Merged catalog ordered by `(created_at, id)`
    pub items: Vec<CatalogItem>,
    pub stats: MergeStats,
}

/// Last-writer-wins merge of two catalogs
pub struct ConflictResolver;

impl ConflictResolver {
    /// Merges a local snapshot with remote items
    ///
    /// Every id in `local ∪ remote` appears exactly once in the result.
    /// When `remote` repeats an id, its last occurrence is the remote copy.
    /// Merging the output with the same remote set again yields the same
    /// output.
    pub fn merge(local: &[CatalogItem], remote: &[CatalogItem]) -> MergeOutcome {
        let mut stats = MergeStats::default();
        let remote_by_id: HashMap<ItemId, &CatalogItem> =
            remote.iter().map(|item| (item.id(), item)).collect();

        let mut merged: HashMap<ItemId, CatalogItem> = HashMap::with_capacity(local.len() + remote.len());

        for local_item in local {
            let id = local_item.id();
            let survivor = match remote_by_id.get(&id) {
                None => {
                    stats.local_only += 1;
                    local_item.clone()
                }
                Some(remote_item) => match PrecedenceDetector::decide(local_item, remote_item) {
                    Decision::AdoptRemote => {
                        debug!(
                            item_id = %id,
                            local_modified = %local_item.modified_at(),
                            remote_modified = %remote_item.modified_at(),
                            "Adopting remote copy"
                        );
                        stats.adopted_remote += 1;
                        PrecedenceDetector::adopt(local_item, remote_item)
                    }
                    Decision::Unchanged => {
                        stats.unchanged += 1;
                        local_item.clone()
                    }
                    Decision::KeepLocal => {
                        stats.kept_local += 1;
                        local_item.clone()
                    }
                },
            };
            merged.insert(id, survivor);
        }

        for (id, remote_item) in remote_by_id {
            if !merged.contains_key(&id) {
                stats.added_remote += 1;
                merged.insert(id, remote_item.clone());
            }
        }

        let mut items: Vec<CatalogItem> = merged.into_values().collect();
        items.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id().cmp(&b.id()))
        });

        MergeOutcome { items, stats }
    }
}
