//! Domain entities and business logic
//!
//! This module contains the core domain types for Longbox:
//! - Newtypes for identifiers, pagination cursors and asset references
//! - The catalog item and its append-only value history
//! - The synchronization state machine
//! - Domain-specific error types

pub mod catalog_item;
pub mod errors;
pub mod newtypes;
pub mod sync_state;
pub mod value_point;

// Re-export commonly used types
pub use catalog_item::CatalogItem;
pub use errors::DomainError;
pub use newtypes::{AssetRef, Cursor, ItemId};
pub use sync_state::SyncState;
pub use value_point::{ValuePoint, ValueSource};
