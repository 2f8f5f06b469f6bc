//! CLI command implementations

pub mod catalog;
pub mod config;
pub mod run;
pub mod status;
pub mod sync;
pub mod value;
