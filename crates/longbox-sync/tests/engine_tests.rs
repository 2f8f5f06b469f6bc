//! SyncEngine behavior against an in-memory remote table

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use common::{harness, png_cover, wait_until, MemoryGateway};
use longbox_core::codec::RecordCodec;
use longbox_core::domain::{CatalogItem, ItemId, SyncState, ValuePoint};
use longbox_core::ports::RemoteRecord;
use longbox_sync::{PushOutcome, SyncError};

fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
}

// ============================================================================
// Pull
// ============================================================================

#[tokio::test]
async fn test_pull_newer_remote_wins_and_remote_only_is_added() {
    let h = harness(MemoryGateway::default()).await;
    let id_a = ItemId::new();

    let mut local_a = CatalogItem::from_parts(id_a, "Amazing Spider-Man", at(0), at(0));
    local_a.record_value(ValuePoint::manual(10.0));
    h.store.lock().await.replace(vec![local_a]);

    let mut remote_a = CatalogItem::from_parts(id_a, "Amazing Spider-Man", at(0), at(60));
    remote_a.record_value(ValuePoint::manual(20.0));
    let remote_b = CatalogItem::from_parts(ItemId::new(), "Fantastic Four", at(5), at(5));
    h.gateway.insert(RecordCodec::encode(&remote_a));
    h.gateway.insert(RecordCodec::encode(&remote_b));

    let report = h.engine.pull(&h.store).await.unwrap();

    assert!(report.applied);
    assert_eq!(report.merge.adopted_remote, 1);
    assert_eq!(report.merge.added_remote, 1);

    let store = h.store.lock().await;
    assert_eq!(store.len(), 2);
    assert_eq!(store.get(&id_a).unwrap().current_value, Some(20.0));
    assert!(store.get(&remote_b.id()).is_some());
    assert_eq!(h.engine.status().state(), SyncState::Idle);
}

#[tokio::test]
async fn test_pull_keeps_strictly_newer_local_copy() {
    let h = harness(MemoryGateway::default()).await;
    let id = ItemId::new();

    let mut local = CatalogItem::from_parts(id, "Local edit", at(0), at(100));
    local.notes = "re-bagged".into();
    h.store.lock().await.replace(vec![local.clone()]);
    h.gateway
        .insert(RecordCodec::encode(&CatalogItem::from_parts(id, "Stale", at(0), at(50))));

    let report = h.engine.pull(&h.store).await.unwrap();

    assert!(!report.applied);
    assert_eq!(report.merge.kept_local, 1);
    assert_eq!(h.store.lock().await.get(&id).unwrap(), &local);
}

#[tokio::test]
async fn test_pull_twice_is_idempotent() {
    let h = harness(MemoryGateway::default()).await;
    for i in 0..5 {
        let item = CatalogItem::from_parts(ItemId::new(), format!("Issue {i}"), at(i), at(i));
        h.gateway.insert(RecordCodec::encode(&item));
    }

    let first = h.engine.pull(&h.store).await.unwrap();
    let after_first = h.store.lock().await.items();
    let second = h.engine.pull(&h.store).await.unwrap();

    assert_eq!(first.fetched, 5);
    assert!(first.applied);
    assert!(!second.applied);
    assert_eq!(second.merge.unchanged, 5);
    assert_eq!(h.store.lock().await.items(), after_first);
}

#[tokio::test]
async fn test_pull_skips_undecodable_records() {
    let h = harness(MemoryGateway::default()).await;
    h.gateway
        .insert(RecordCodec::encode(&CatalogItem::new("Valid")));
    let mut foreign = RemoteRecord::new(ItemId::new());
    foreign.record_type = "Shelf".into();
    h.gateway.insert(foreign);

    let report = h.engine.pull(&h.store).await.unwrap();

    assert_eq!(report.fetched, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(h.store.lock().await.len(), 1);
}

#[tokio::test]
async fn test_pull_failure_sets_error_and_leaves_store_alone() {
    let gateway = MemoryGateway::default();
    gateway.fail_fetch.store(true, Ordering::SeqCst);
    let h = harness(gateway).await;
    h.store.lock().await.upsert(CatalogItem::new("Safe"));

    let err = h.engine.pull(&h.store).await.unwrap_err();

    assert!(matches!(err, SyncError::Remote(_)));
    assert!(h.engine.status().state().is_error());
    assert_eq!(h.store.lock().await.len(), 1);
}

#[tokio::test]
async fn test_cancelled_pull_applies_no_merge() {
    let gateway = MemoryGateway::default();
    gateway.hang_fetch.store(true, Ordering::SeqCst);
    gateway.insert(RecordCodec::encode(&CatalogItem::new("Never merged")));
    let h = harness(gateway).await;
    h.store.lock().await.upsert(CatalogItem::new("Local"));

    let pull = tokio::spawn({
        let engine = Arc::clone(&h.engine);
        let store = Arc::clone(&h.store);
        async move { engine.pull(&store).await }
    });

    let gateway = Arc::clone(&h.gateway);
    wait_until(|| gateway.fetch_calls.load(Ordering::SeqCst) > 0).await;
    h.engine.shutdown();

    let result = pull.await.unwrap();
    assert!(matches!(result, Err(SyncError::Cancelled)));
    assert_eq!(h.store.lock().await.len(), 1);
    assert_eq!(h.engine.status().state(), SyncState::Idle);
}

#[tokio::test]
async fn test_namespace_bootstrap_runs_once_even_after_failure() {
    let gateway = MemoryGateway::default();
    gateway.fail_namespace.store(true, Ordering::SeqCst);
    let h = harness(gateway).await;

    h.engine.pull(&h.store).await.unwrap();
    h.engine.pull(&h.store).await.unwrap();

    assert_eq!(h.gateway.namespace_calls.load(Ordering::SeqCst), 1);
    let metadata = h.engine.metadata().get().await;
    assert!(metadata.namespace_ready);
    assert!(metadata.last_pull_at.is_some());
}

#[tokio::test]
async fn test_pull_does_not_lose_save_made_during_fetch() {
    let h = harness(MemoryGateway::default()).await;
    h.gateway
        .insert(RecordCodec::encode(&CatalogItem::new("Remote")));

    // The merge input is whatever the store holds once the fetch returns
    let saved = h.store.lock().await.upsert(CatalogItem::new("Saved offline"));
    h.engine.pull(&h.store).await.unwrap();

    let store = h.store.lock().await;
    assert_eq!(store.len(), 2);
    assert!(store.get(&saved.id()).is_some());
}

// ============================================================================
// Push
// ============================================================================

#[tokio::test]
async fn test_push_single_encodes_and_upserts() {
    let h = harness(MemoryGateway::default()).await;
    let item = CatalogItem::new("Hulk").with_issue_number("181");

    let outcome = h.engine.push_single(item.clone()).await.unwrap();

    assert_eq!(outcome, PushOutcome::Pushed);
    let decoded = RecordCodec::decode(&h.gateway.record(item.id()).unwrap()).unwrap();
    assert_eq!(decoded.issue_number.as_deref(), Some("181"));
    assert_eq!(h.engine.pushes_in_flight(), 0);
    assert_eq!(h.engine.status().state(), SyncState::Idle);
}

#[tokio::test]
async fn test_overlapping_pushes_for_one_id_are_coalesced() {
    let h = harness(MemoryGateway::gated()).await;
    let item = CatalogItem::new("Spawn");

    let first = tokio::spawn({
        let engine = Arc::clone(&h.engine);
        let item = item.clone();
        async move { engine.push_single(item).await }
    });

    let gateway = Arc::clone(&h.gateway);
    wait_until(|| gateway.upsert_started.load(Ordering::SeqCst) == 1).await;

    let mut second = item.clone();
    second.title = "Spawn (second save)".into();
    second.touch();
    let mut third = second.clone();
    third.title = "Spawn (third save)".into();
    third.touch();

    assert_eq!(
        h.engine.push_single(second).await.unwrap(),
        PushOutcome::Coalesced
    );
    assert_eq!(
        h.engine.push_single(third).await.unwrap(),
        PushOutcome::Coalesced
    );

    h.gateway.release(2);
    assert_eq!(first.await.unwrap().unwrap(), PushOutcome::Pushed);

    assert_eq!(h.gateway.upsert_completed.load(Ordering::SeqCst), 2);
    let stored = RecordCodec::decode(&h.gateway.record(item.id()).unwrap()).unwrap();
    assert_eq!(stored.title, "Spawn (third save)");
    assert_eq!(h.engine.pushes_in_flight(), 0);
}

#[tokio::test]
async fn test_older_save_queued_behind_newer_push_is_dropped() {
    let h = harness(MemoryGateway::gated()).await;
    let older = CatalogItem::from_parts(ItemId::new(), "v1", at(0), at(10));
    let mut newer = older.clone();
    newer.title = "v2".into();
    newer.touch();

    let first = tokio::spawn({
        let engine = Arc::clone(&h.engine);
        let newer = newer.clone();
        async move { engine.push_single(newer).await }
    });
    let gateway = Arc::clone(&h.gateway);
    wait_until(|| gateway.upsert_started.load(Ordering::SeqCst) == 1).await;

    assert_eq!(
        h.engine.push_single(older.clone()).await.unwrap(),
        PushOutcome::Superseded
    );

    h.gateway.release(2);
    assert_eq!(first.await.unwrap().unwrap(), PushOutcome::Pushed);

    assert_eq!(h.gateway.upsert_completed.load(Ordering::SeqCst), 1);
    let stored = RecordCodec::decode(&h.gateway.record(older.id()).unwrap()).unwrap();
    assert_eq!(stored.title, "v2");
    assert_eq!(stored.modified_at(), newer.modified_at());
    assert_eq!(h.engine.pushes_in_flight(), 0);
}

#[tokio::test]
async fn test_older_save_arriving_after_newer_push_is_dropped() {
    let h = harness(MemoryGateway::default()).await;
    let older = CatalogItem::from_parts(ItemId::new(), "v1", at(0), at(10));
    let mut newer = older.clone();
    newer.title = "v2".into();
    newer.touch();

    assert_eq!(h.engine.push_single(newer).await.unwrap(), PushOutcome::Pushed);
    assert_eq!(
        h.engine.push_single(older.clone()).await.unwrap(),
        PushOutcome::Superseded
    );

    let stored = RecordCodec::decode(&h.gateway.record(older.id()).unwrap()).unwrap();
    assert_eq!(stored.title, "v2");
    assert_eq!(h.gateway.upsert_completed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_push_with_cover_uploads_asset() {
    let h = harness(MemoryGateway::default()).await;
    let item = CatalogItem::new("Covered").with_image(png_cover());

    h.engine.push_single(item.clone()).await.unwrap();

    let record = h.gateway.record(item.id()).unwrap();
    let asset = record.asset.expect("asset reference attached");
    let assets = h.gateway.assets.lock().unwrap();
    assert!(assets.get(asset.digest()).is_some_and(|len| *len > 0));
}

#[tokio::test]
async fn test_failed_asset_upload_drops_attachment_only() {
    let gateway = MemoryGateway::default();
    gateway.fail_assets.store(true, Ordering::SeqCst);
    let h = harness(gateway).await;
    let item = CatalogItem::new("Uncovered").with_image(png_cover());

    let outcome = h.engine.push_single(item.clone()).await.unwrap();

    assert_eq!(outcome, PushOutcome::Pushed);
    let record = h.gateway.record(item.id()).unwrap();
    assert!(record.asset.is_none());
    assert_eq!(h.engine.status().state(), SyncState::Idle);
}

#[tokio::test]
async fn test_undecodable_cover_is_not_attached() {
    let h = harness(MemoryGateway::default()).await;
    let item = CatalogItem::new("Garbage cover").with_image(b"not an image".to_vec());

    h.engine.push_single(item.clone()).await.unwrap();

    assert!(h.gateway.record(item.id()).unwrap().asset.is_none());
    assert!(h.gateway.assets.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_push_all_isolates_failed_batch() {
    let mut gateway = MemoryGateway::default();
    gateway.batch_size = 2;
    *gateway.fail_batch.lock().unwrap() = Some(1);
    let h = harness(gateway).await;
    let items: Vec<_> = (0..6)
        .map(|i| CatalogItem::new(format!("Issue #{i}")))
        .collect();

    let report = h.engine.push_all(&items).await.unwrap();

    assert_eq!(report.batches_attempted, 3);
    assert_eq!(report.batches_failed, 1);
    assert_eq!(report.records_saved, 4);
    assert_eq!(h.gateway.len(), 4);
    assert!(h.gateway.record(items[0].id()).is_some());
    assert!(h.gateway.record(items[2].id()).is_none());
    assert!(h.gateway.record(items[5].id()).is_some());
    assert!(h.engine.status().state().is_error());
}

#[tokio::test]
async fn test_push_all_success_records_push_time() {
    let h = harness(MemoryGateway::default()).await;
    let items = vec![CatalogItem::new("One"), CatalogItem::new("Two")];

    let report = h.engine.push_all(&items).await.unwrap();

    assert!(report.is_complete_success());
    assert!(h.engine.metadata().get().await.last_push_at.is_some());
    assert_eq!(h.engine.status().state(), SyncState::Idle);
}

#[tokio::test]
async fn test_delete_removes_remote_record() {
    let h = harness(MemoryGateway::default()).await;
    let item = CatalogItem::new("Doomed");
    h.gateway.insert(RecordCodec::encode(&item));

    h.engine.delete(item.id()).await.unwrap();
    h.engine.delete(item.id()).await.unwrap();

    assert!(h.gateway.record(item.id()).is_none());
    assert_eq!(h.gateway.delete_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_operations_after_shutdown_are_cancelled() {
    let h = harness(MemoryGateway::default()).await;
    h.engine.shutdown();

    let err = h.engine.push_single(CatalogItem::new("Late")).await.unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(h.engine.pushes_in_flight(), 0);
    assert_eq!(h.engine.status().state(), SyncState::Idle);
}

#[tokio::test]
async fn test_newer_local_edit_survives_round_trip() {
    let h = harness(MemoryGateway::default()).await;
    let mut item = CatalogItem::from_parts(ItemId::new(), "Watchmen", at(0), at(0));
    item.grade = Some(9.4);
    h.gateway.insert(RecordCodec::encode(&item));
    h.engine.pull(&h.store).await.unwrap();

    let edited = h
        .store
        .lock()
        .await
        .update(&item.id(), |i| i.grade = Some(9.6))
        .unwrap();
    assert!(edited.modified_at() > item.modified_at());
    h.engine.push_single(edited.clone()).await.unwrap();
    h.engine.pull(&h.store).await.unwrap();

    assert_eq!(h.store.lock().await.get(&item.id()).unwrap().grade, Some(9.6));
}
