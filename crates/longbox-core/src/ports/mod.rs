//! Port definitions (hexagonal architecture interfaces)
//!
//! Ports are the interfaces the sync engine depends on; their
//! implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IRemoteGateway`] - Paginated remote record table with batch writes
//!   and content-addressed asset uploads

pub mod remote_gateway;

pub use remote_gateway::{
    BatchReport, FieldValue, IRemoteGateway, RecordPage, RemoteRecord, DEFAULT_BATCH_SIZE,
    RECORD_TYPE,
};
