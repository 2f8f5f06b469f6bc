//! Longbox Store - Authoritative local catalog
//!
//! Provides:
//! - [`LocalStore`]: in-memory catalog backed by a JSON snapshot file
//! - [`SnapshotWriter`]: channel-fed task that debounces and atomically
//!   writes snapshots
//! - [`SyncMetadataStore`]: small bookkeeping file for the sync engine
//!
//! Reads and writes against the catalog never wait on disk. Persistence
//! failures are logged and retried by the next mutation; they are never
//! surfaced to callers.

pub mod atomic;
pub mod error;
pub mod local_store;
pub mod metadata;
pub mod writer;

pub use error::StoreError;
pub use local_store::{LocalStore, DEFAULT_DEBOUNCE};
pub use metadata::{SyncMetadata, SyncMetadataStore};
pub use writer::{PersistCommand, SnapshotWriter, SnapshotWriterHandle};
