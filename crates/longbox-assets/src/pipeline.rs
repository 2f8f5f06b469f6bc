//! Asset pipeline
//!
//! `decode → downsize → JPEG ladder → temp file`. All CPU work runs on the
//! blocking pool; callers only see an `Option<PreparedAsset>`, since a cover
//! that cannot be prepared is dropped from the push rather than failing it.

use std::io::Write;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use sha2::{Digest, Sha256};
use tempfile::TempPath;
use tracing::{debug, warn};

use longbox_core::config::AssetsConfig;
use longbox_core::domain::AssetRef;

use crate::error::AssetError;

const TEMP_PREFIX: &str = "longbox-asset-";
const TEMP_SUFFIX: &str = ".jpg";

/// Pipeline tuning
#[derive(Debug, Clone, PartialEq)]
pub struct AssetPipelineConfig {
    pub max_edge_px: u32,
    pub max_bytes: u64,
    /// Qualities in (0, 1], tried in order
    pub quality_ladder: Vec<f32>,
    /// Directory for encoded files; the system temp dir when `None`
    pub temp_dir: Option<PathBuf>,
}

impl Default for AssetPipelineConfig {
    fn default() -> Self {
        Self::from(&AssetsConfig::default())
    }
}

impl From<&AssetsConfig> for AssetPipelineConfig {
    fn from(config: &AssetsConfig) -> Self {
        Self {
            max_edge_px: config.max_edge_px,
            max_bytes: config.max_bytes,
            quality_ladder: config.quality_ladder.clone(),
            temp_dir: None,
        }
    }
}

/// An encoded cover image ready for upload
///
/// Owns its temporary file; dropping the value deletes it.
#[derive(Debug)]
pub struct PreparedAsset {
    asset: AssetRef,
    path: TempPath,
    byte_len: u64,
    width: u32,
    height: u32,
    quality: f32,
}

impl PreparedAsset {
    /// Content address of the encoded bytes
    pub fn asset(&self) -> &AssetRef {
        &self.asset
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn byte_len(&self) -> u64 {
        self.byte_len
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Ladder rung that produced the bytes
    pub fn quality(&self) -> f32 {
        self.quality
    }
}

/// Prepares cover images for transport
#[derive(Debug, Clone, Default)]
pub struct AssetPipeline {
    config: AssetPipelineConfig,
}

impl AssetPipeline {
    pub fn new(config: AssetPipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AssetPipelineConfig {
        &self.config
    }

    /// Produces a transport-ready asset, or `None` if the input is unusable
    pub async fn prepare_for_transport(&self, raw: Vec<u8>) -> Option<PreparedAsset> {
        let input_len = raw.len();
        match self.try_prepare(raw).await {
            Ok(prepared) => {
                debug!(
                    input_bytes = input_len,
                    output_bytes = prepared.byte_len,
                    width = prepared.width,
                    height = prepared.height,
                    quality = prepared.quality,
                    asset = %prepared.asset,
                    "Prepared asset for transport"
                );
                Some(prepared)
            }
            Err(e) => {
                warn!(input_bytes = input_len, error = %e, "Dropping unusable cover image");
                None
            }
        }
    }

    /// Like [`prepare_for_transport`](Self::prepare_for_transport) but reports why it failed
    pub async fn try_prepare(&self, raw: Vec<u8>) -> Result<PreparedAsset, AssetError> {
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || encode_for_transport(&config, &raw))
            .await
            .map_err(|e| AssetError::Worker(e.to_string()))?
    }
}

/// Synchronous body of the pipeline
pub fn encode_for_transport(
    config: &AssetPipelineConfig,
    raw: &[u8],
) -> Result<PreparedAsset, AssetError> {
    if config.quality_ladder.is_empty() {
        return Err(AssetError::EmptyLadder);
    }

    let decoded = image::load_from_memory(raw).map_err(|e| AssetError::Decode(e.to_string()))?;
    let resized = downsize(decoded, config.max_edge_px);
    let (width, height) = resized.dimensions();
    let rgb = resized.to_rgb8();

    let mut chosen: Option<(Vec<u8>, f32)> = None;
    let last = config.quality_ladder.len() - 1;
    for (index, &quality) in config.quality_ladder.iter().enumerate() {
        let mut encoded = Vec::new();
        JpegEncoder::new_with_quality(&mut encoded, jpeg_quality(quality))
            .encode_image(&rgb)
            .map_err(|e| AssetError::Encode(e.to_string()))?;

        let fits = encoded.len() as u64 <= config.max_bytes;
        debug!(quality, bytes = encoded.len(), fits, "Encoded ladder rung");
        if fits || index == last {
            if !fits {
                warn!(
                    quality,
                    bytes = encoded.len(),
                    max_bytes = config.max_bytes,
                    "Asset exceeds ceiling at lowest quality; sending best effort"
                );
            }
            chosen = Some((encoded, quality));
            break;
        }
    }
    let (bytes, quality) = chosen.ok_or(AssetError::EmptyLadder)?;

    let asset = AssetRef::from_sha256_hex(&format!("{:x}", Sha256::digest(&bytes)))?;
    let path = write_temp(config.temp_dir.as_deref(), &bytes)?;

    Ok(PreparedAsset {
        asset,
        path,
        byte_len: bytes.len() as u64,
        width,
        height,
        quality,
    })
}

/// Shrinks so the longest edge is at most `max_edge`, preserving aspect ratio
fn downsize(image: DynamicImage, max_edge: u32) -> DynamicImage {
    let (w, h) = image.dimensions();
    if w.max(h) <= max_edge {
        return image;
    }
    image.resize(max_edge, max_edge, FilterType::Triangle)
}

/// Maps a (0, 1] quality onto the encoder's 1..=100 scale
fn jpeg_quality(quality: f32) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

fn write_temp(dir: Option<&Path>, bytes: &[u8]) -> Result<TempPath, AssetError> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(TEMP_PREFIX).suffix(TEMP_SUFFIX);
    let mut file = match dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };
    file.write_all(bytes)?;
    file.flush()?;
    Ok(file.into_temp_path())
}
