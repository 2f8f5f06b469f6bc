//! Longbox Assets - Transport encoding for cover images
//!
//! Raw cover images are downsized and re-encoded as JPEG before they are
//! uploaded, walking a quality ladder until the result fits the byte
//! ceiling. The encoded file lives in a scoped temporary path that is
//! removed when the [`PreparedAsset`] is dropped.

pub mod error;
pub mod pipeline;

pub use error::AssetError;
pub use pipeline::{AssetPipeline, AssetPipelineConfig, PreparedAsset};
