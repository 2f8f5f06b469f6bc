//! Wiring shared by every command
//!
//! Builds the store, the sync backend selected by `sync.backend`, and the
//! [`CatalogService`] on top of them.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::sync::Mutex;
use tracing::{debug, info};

use longbox_assets::{AssetPipeline, AssetPipelineConfig};
use longbox_core::config::Config;
use longbox_core::domain::ItemId;
use longbox_remote::HttpRecordGateway;
use longbox_store::{LocalStore, SyncMetadataStore};
use longbox_sync::{
    CatalogService, NullSyncBackend, RemoteSyncBackend, SharedStore, SyncBackend, SyncEngine,
};

use crate::output::{get_formatter, OutputFormat, OutputFormatter};

/// Global options resolved once in `main`
pub struct AppContext {
    pub config: Config,
    pub config_path: PathBuf,
    pub format: OutputFormat,
}

impl AppContext {
    /// Loads the configuration
    ///
    /// An explicitly given file must exist and parse; the default location
    /// falls back to built-in defaults.
    pub fn load(config_path: Option<PathBuf>, format: OutputFormat) -> Result<Self> {
        let (config, config_path) = match config_path {
            Some(path) => (Config::load(&path)?, path),
            None => {
                let path = Config::default_path();
                (Config::load_or_default(&path), path)
            }
        };

        Ok(Self {
            config,
            config_path,
            format,
        })
    }

    pub fn formatter(&self) -> Box<dyn OutputFormatter> {
        get_formatter(self.format)
    }

    /// Opens the catalog and the configured sync backend
    pub async fn open_session(&self) -> Result<Session> {
        let metadata = Arc::new(SyncMetadataStore::open(&self.config.sync.metadata_path).await);
        let backend = build_backend(&self.config, Arc::clone(&metadata))?;

        let store: SharedStore = Arc::new(Mutex::new(
            LocalStore::open(
                &self.config.store.path,
                Duration::from_millis(self.config.store.debounce_ms),
            )
            .await,
        ));

        info!(
            store = %self.config.store.path.display(),
            backend = backend.name(),
            "Catalog session opened"
        );

        Ok(Session {
            service: Arc::new(CatalogService::new(store, backend)),
            metadata,
        })
    }
}

/// An open catalog plus its sync backend
pub struct Session {
    pub service: Arc<CatalogService>,
    pub metadata: Arc<SyncMetadataStore>,
}

impl Session {
    /// Lets background pushes finish, then flushes and stops everything
    pub async fn finish(self) {
        self.service.drain().await;
        self.service.shutdown().await;
    }
}

/// Selects the sync backend named by `sync.backend`
pub fn build_backend(
    config: &Config,
    metadata: Arc<SyncMetadataStore>,
) -> Result<Arc<dyn SyncBackend>> {
    match config.sync.backend.as_str() {
        "none" => {
            debug!("Using local-only backend");
            Ok(Arc::new(NullSyncBackend::new()))
        }
        "remote" => {
            let gateway = HttpRecordGateway::from_config(&config.remote)
                .context("Failed to create remote record client")?;
            let assets = AssetPipeline::new(AssetPipelineConfig::from(&config.assets));
            let engine = SyncEngine::new(Arc::new(gateway), assets, metadata);
            debug!(base_url = %config.remote.base_url, zone = %config.remote.zone, "Using remote backend");
            Ok(Arc::new(RemoteSyncBackend::new(Arc::new(engine))))
        }
        other => bail!("Unknown sync backend '{other}' (expected 'remote' or 'none')"),
    }
}

/// Clap value parser for amounts and grades; rejects NaN and infinities
pub fn parse_finite(raw: &str) -> std::result::Result<f64, String> {
    let value: f64 = raw.parse().map_err(|e| format!("'{raw}' is not a number: {e}"))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("'{raw}' is not a finite number"))
    }
}

/// Parses an item id given on the command line
pub fn parse_item_id(raw: &str) -> Result<ItemId> {
    raw.parse::<ItemId>()
        .with_context(|| format!("'{raw}' is not a valid item id"))
}
