//! Longbox Conflict - Reconciliation of local and remote catalogs
//!
//! Provides:
//! - Per-item precedence decisions keyed on `modified_at`
//! - A pure, deterministic merge of a local snapshot with a remote fetch
//!
//! Remote wins ties, local-only items are retained, and a cover image held
//! locally is never replaced by the remote copy.

pub mod detector;
pub mod resolver;

pub use detector::{Decision, PrecedenceDetector};
pub use resolver::{ConflictResolver, MergeOutcome, MergeStats};
