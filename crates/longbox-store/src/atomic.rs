//! Atomic file replacement
//!
//! Data is written to a sibling `.tmp` file and renamed over the target, so
//! readers only ever observe the previous or the new content.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::StoreError;

/// Path of the temporary sibling used while writing `target`
pub fn temp_path_for(target: &Path) -> PathBuf {
    let mut p = target.as_os_str().to_owned();
    p.push(".tmp");
    PathBuf::from(p)
}

/// Replaces `target` with `data` atomically, creating parent directories
pub async fn write_atomic(target: &Path, data: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let tmp_path = temp_path_for(target);
    debug!(?tmp_path, bytes = data.len(), "writing to temporary file");
    tokio::fs::write(&tmp_path, data).await?;

    if let Err(e) = tokio::fs::rename(&tmp_path, target).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(e.into());
    }

    debug!(path = %target.display(), "atomic write complete");
    Ok(())
}
