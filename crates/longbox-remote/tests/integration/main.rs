//! Integration tests for longbox-remote
//!
//! Uses wiremock to simulate the record service and verifies pagination,
//! idempotent writes, batch calls, asset uploads and retry behavior of
//! `HttpRecordGateway`.

mod common;

mod test_assets;
mod test_fetch;
mod test_writes;
