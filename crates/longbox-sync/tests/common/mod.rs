//! In-memory remote gateway and fixtures shared by the sync test suites

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use longbox_assets::{AssetPipeline, AssetPipelineConfig};
use longbox_core::domain::{AssetRef, Cursor, ItemId};
use longbox_core::ports::{IRemoteGateway, RecordPage, RemoteRecord};
use longbox_store::{LocalStore, SyncMetadataStore};
use longbox_sync::{SharedStore, SyncEngine};

/// Remote record table held in memory
///
/// Pages are served in `record_name` order with the next index as cursor.
pub struct MemoryGateway {
    pub records: Mutex<BTreeMap<String, RemoteRecord>>,
    pub assets: Mutex<HashMap<String, u64>>,
    pub page_size: usize,
    pub batch_size: usize,
    pub fail_fetch: AtomicBool,
    pub hang_fetch: AtomicBool,
    pub fail_namespace: AtomicBool,
    pub fail_assets: AtomicBool,
    pub fail_batch: Mutex<Option<usize>>,
    pub namespace_calls: AtomicUsize,
    pub fetch_calls: AtomicUsize,
    pub upsert_started: AtomicUsize,
    pub upsert_completed: AtomicUsize,
    pub batch_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    /// Each upsert consumes one permit before saving
    pub upsert_gate: Semaphore,
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self {
            records: Mutex::new(BTreeMap::new()),
            assets: Mutex::new(HashMap::new()),
            page_size: 2,
            batch_size: 100,
            fail_fetch: AtomicBool::new(false),
            hang_fetch: AtomicBool::new(false),
            fail_namespace: AtomicBool::new(false),
            fail_assets: AtomicBool::new(false),
            fail_batch: Mutex::new(None),
            namespace_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
            upsert_started: AtomicUsize::new(0),
            upsert_completed: AtomicUsize::new(0),
            batch_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
            upsert_gate: Semaphore::new(Semaphore::MAX_PERMITS),
        }
    }
}

impl MemoryGateway {
    /// A gateway whose upserts block until `release` is called
    pub fn gated() -> Self {
        Self {
            upsert_gate: Semaphore::new(0),
            ..Self::default()
        }
    }

    pub fn release(&self, upserts: usize) {
        self.upsert_gate.add_permits(upserts);
    }

    pub fn insert(&self, record: RemoteRecord) {
        self.records
            .lock()
            .unwrap()
            .insert(record.record_name.clone(), record);
    }

    pub fn record(&self, id: ItemId) -> Option<RemoteRecord> {
        self.records.lock().unwrap().get(&id.to_string()).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

#[async_trait]
impl IRemoteGateway for MemoryGateway {
    async fn ensure_namespace(&self) -> anyhow::Result<()> {
        self.namespace_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_namespace.load(Ordering::SeqCst) {
            anyhow::bail!("zone service unavailable");
        }
        Ok(())
    }

    async fn fetch_page(&self, cursor: Option<&Cursor>) -> anyhow::Result<RecordPage> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.hang_fetch.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail_fetch.load(Ordering::SeqCst) {
            anyhow::bail!("remote unreachable");
        }

        let start: usize = match cursor {
            Some(c) => c.as_str().parse()?,
            None => 0,
        };
        let records = self.records.lock().unwrap();
        let page: Vec<RemoteRecord> = records
            .values()
            .skip(start)
            .take(self.page_size)
            .cloned()
            .collect();
        let next = start + self.page_size;
        let cursor = if next < records.len() {
            Some(Cursor::new(next.to_string())?)
        } else {
            None
        };
        Ok(RecordPage {
            records: page,
            cursor,
        })
    }

    async fn upsert(&self, record: &RemoteRecord) -> anyhow::Result<()> {
        self.upsert_started.fetch_add(1, Ordering::SeqCst);
        self.upsert_gate.acquire().await?.forget();
        self.insert(record.clone());
        self.upsert_completed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, id: &ItemId) -> anyhow::Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.records.lock().unwrap().remove(&id.to_string());
        Ok(())
    }

    async fn save_batch(&self, records: &[RemoteRecord]) -> anyhow::Result<()> {
        let index = self.batch_calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail_batch.lock().unwrap() == Some(index) {
            anyhow::bail!("batch {index} rejected");
        }
        for record in records {
            self.insert(record.clone());
        }
        Ok(())
    }

    async fn put_asset(&self, asset: &AssetRef, path: &Path) -> anyhow::Result<()> {
        if self.fail_assets.load(Ordering::SeqCst) {
            anyhow::bail!("asset store full");
        }
        let len = tokio::fs::metadata(path).await?.len();
        self.assets
            .lock()
            .unwrap()
            .insert(asset.digest().to_string(), len);
        Ok(())
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }
}

/// Everything a test needs to drive the engine
pub struct Harness {
    pub dir: tempfile::TempDir,
    pub gateway: Arc<MemoryGateway>,
    pub engine: Arc<SyncEngine>,
    pub store: SharedStore,
}

pub async fn harness(gateway: MemoryGateway) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let gateway = Arc::new(gateway);
    let metadata = Arc::new(SyncMetadataStore::open(dir.path().join("sync-state.json")).await);
    let assets = AssetPipeline::new(AssetPipelineConfig {
        temp_dir: Some(dir.path().to_path_buf()),
        ..AssetPipelineConfig::default()
    });
    let engine = Arc::new(SyncEngine::new(gateway.clone(), assets, metadata));
    let store = Arc::new(tokio::sync::Mutex::new(
        LocalStore::open(dir.path().join("catalog.json"), Duration::from_millis(20)).await,
    ));

    Harness {
        dir,
        gateway,
        engine,
        store,
    }
}

/// A small PNG cover
pub fn png_cover() -> Vec<u8> {
    let img = image::RgbImage::from_fn(64, 48, |x, y| image::Rgb([x as u8 * 3, y as u8 * 5, 90]));
    let mut bytes = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut bytes, image::ImageFormat::Png)
        .unwrap();
    bytes.into_inner()
}

/// Polls `condition` until it holds, yielding to other tasks in between
pub async fn wait_until(condition: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("condition not reached in time");
}
