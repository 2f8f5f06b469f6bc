//! Longbox Core - Domain logic, wire codec and ports
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `CatalogItem`, `ValuePoint`, `SyncState`
//! - **Record codec** - `RecordCodec`, the total mapping between `CatalogItem`
//!   and the flat `RemoteRecord` wire format
//! - **Port definitions** - `IRemoteGateway`, the paginated remote table
//! - **Configuration** - YAML-backed `Config` with validation and a builder
//!
//! # Architecture
//!
//! The domain module contains pure business logic with no I/O.
//! Ports define trait interfaces that adapter crates implement
//! (`longbox-remote` for HTTP, in-memory fakes in tests).

pub mod codec;
pub mod config;
pub mod domain;
pub mod ports;
