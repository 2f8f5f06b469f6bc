//! Sync bookkeeping file
//!
//! Remembers whether the remote namespace has been created and when the
//! last pull and push succeeded.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::warn;

use crate::atomic::write_atomic;
use crate::error::StoreError;

/// Persisted sync bookkeeping
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncMetadata {
    #[serde(default)]
    pub namespace_ready: bool,
    #[serde(default)]
    pub last_pull_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_push_at: Option<DateTime<Utc>>,
}

/// File-backed [`SyncMetadata`], updated atomically
pub struct SyncMetadataStore {
    path: PathBuf,
    state: Mutex<SyncMetadata>,
}

impl SyncMetadataStore {
    /// Loads the file at `path`; missing or unreadable files start from defaults
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = match tokio::fs::read(&path).await {
            Ok(data) => serde_json::from_slice(&data).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Sync metadata corrupt; resetting");
                SyncMetadata::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => SyncMetadata::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Sync metadata unreadable; resetting");
                SyncMetadata::default()
            }
        };

        Self {
            path,
            state: Mutex::new(state),
        }
    }

    /// A store that is never read from disk, for tests and local-only runs
    pub fn in_memory(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: Mutex::new(SyncMetadata::default()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn get(&self) -> SyncMetadata {
        self.state.lock().await.clone()
    }

    /// Applies `mutate` and persists the result
    ///
    /// The in-memory value is updated even if the write fails.
    pub async fn update<F>(&self, mutate: F) -> Result<SyncMetadata, StoreError>
    where
        F: FnOnce(&mut SyncMetadata),
    {
        let mut state = self.state.lock().await;
        mutate(&mut state);
        let data = serde_json::to_vec_pretty(&*state)?;
        write_atomic(&self.path, &data).await?;
        Ok(state.clone())
    }

    pub async fn mark_namespace_ready(&self) -> Result<(), StoreError> {
        self.update(|m| m.namespace_ready = true).await.map(|_| ())
    }

    pub async fn record_pull(&self, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.update(|m| m.last_pull_at = Some(at)).await.map(|_| ())
    }

    pub async fn record_push(&self, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.update(|m| m.last_push_at = Some(at)).await.map(|_| ())
    }
}
