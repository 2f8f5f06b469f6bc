//! Precedence detection
//!
//! Decides, for one item present on both sides, which copy survives.

use longbox_core::domain::CatalogItem;

/// Outcome of comparing the local and remote copies of one item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Remote is at least as new and differs from local
    AdoptRemote,
    /// Both copies carry the same content
    Unchanged,
    /// Local is strictly newer
    KeepLocal,
}

/// Compares copies of an item by `modified_at`
pub struct PrecedenceDetector;

impl PrecedenceDetector {
    /// Decides which copy wins
    ///
    /// Remote wins when `remote.modified_at >= local.modified_at`. A winning
    /// remote that is content-identical to local (ignoring the image, which
    /// never travels inline) is reported as `Unchanged`.
    pub fn decide(local: &CatalogItem, remote: &CatalogItem) -> Decision {
        if remote.modified_at() < local.modified_at() {
            return Decision::KeepLocal;
        }
        if Self::same_content(local, remote) {
            Decision::Unchanged
        } else {
            Decision::AdoptRemote
        }
    }

    /// Builds the surviving copy when remote wins, keeping a local image
    pub fn adopt(local: &CatalogItem, remote: &CatalogItem) -> CatalogItem {
        let mut adopted = remote.clone();
        if local.has_image() {
            adopted.image = local.image.clone();
        }
        adopted
    }

    fn same_content(local: &CatalogItem, remote: &CatalogItem) -> bool {
        Self::adopt(local, remote) == *local
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use longbox_core::domain::ItemId;

    fn at(id: ItemId, secs: i64, title: &str) -> CatalogItem {
        let t: DateTime<Utc> = DateTime::from_timestamp(secs, 0).unwrap();
        CatalogItem::from_parts(id, title, DateTime::from_timestamp(0, 0).unwrap(), t)
    }

    #[test]
    fn newer_remote_is_adopted() {
        let id = ItemId::new();
        assert_eq!(
            PrecedenceDetector::decide(&at(id, 10, "a"), &at(id, 20, "b")),
            Decision::AdoptRemote
        );
    }

    #[test]
    fn newer_local_is_kept() {
        let id = ItemId::new();
        assert_eq!(
            PrecedenceDetector::decide(&at(id, 20, "a"), &at(id, 10, "b")),
            Decision::KeepLocal
        );
    }

    #[test]
    fn tie_favors_remote() {
        let id = ItemId::new();
        assert_eq!(
            PrecedenceDetector::decide(&at(id, 10, "local"), &at(id, 10, "remote")),
            Decision::AdoptRemote
        );
    }

    #[test]
    fn identical_copies_are_unchanged() {
        let id = ItemId::new();
        let local = at(id, 10, "same").with_image(vec![7; 16]);
        let remote = at(id, 10, "same");
        assert_eq!(PrecedenceDetector::decide(&local, &remote), Decision::Unchanged);
    }

    #[test]
    fn adopt_keeps_local_image() {
        let id = ItemId::new();
        let local = at(id, 10, "a").with_image(vec![1, 2, 3]);
        let remote = at(id, 20, "b").with_image(vec![9]);
        let adopted = PrecedenceDetector::adopt(&local, &remote);
        assert_eq!(adopted.title, "b");
        assert_eq!(adopted.image, Some(vec![1, 2, 3]));
    }

    #[test]
    fn adopt_takes_remote_image_when_local_has_none() {
        let id = ItemId::new();
        let adopted =
            PrecedenceDetector::adopt(&at(id, 10, "a"), &at(id, 20, "b").with_image(vec![9]));
        assert_eq!(adopted.image, Some(vec![9]));
    }
}
