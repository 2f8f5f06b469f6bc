//! Longbox Remote - HTTP adapter for the remote record table
//!
//! Implements [`IRemoteGateway`](longbox_core::ports::IRemoteGateway) over a
//! small JSON/HTTPS protocol:
//!
//! | Operation | Request |
//! |-----------|---------|
//! | ensure namespace | `PUT {base}/zones/{zone}` |
//! | fetch page | `GET {base}/zones/{zone}/records?limit=N[&cursor=C]` |
//! | get / save / delete | `GET` / `PUT` / `DELETE {base}/zones/{zone}/records/{id}` |
//! | batch save | `POST {base}/zones/{zone}/records/batch` |
//! | asset upload | `PUT {base}/zones/{zone}/assets/{sha256}` |
//!
//! Page fetches retry transient failures with exponential backoff; writes
//! surface their first failure to the caller.

pub mod client;
pub mod error;
pub mod provider;
pub mod records;
pub mod retry;

pub use client::RecordClient;
pub use error::RemoteError;
pub use provider::HttpRecordGateway;
pub use retry::RetryPolicy;
