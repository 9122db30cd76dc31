//! End-to-end asset lifecycle over the on-disk backends.

use std::sync::Arc;
use std::time::Duration;

use pixa_store::{
    AssetId, AssetStore, AssetUpload, BlobRepository, CatalogFilter, CatalogQuery, FileCatalog,
    FsBlobRepository, InMemoryBlobRepository, InMemoryCatalog, MetadataCatalog, SortOrder,
    StoreError, SweepOptions,
};

const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";
const GIF_MAGIC: &[u8] = b"GIF89a";

fn image(magic: &[u8], seed: u8, len: usize) -> Vec<u8> {
    let mut data = magic.to_vec();
    data.extend(std::iter::repeat(seed).take(len.saturating_sub(magic.len())));
    data
}

async fn disk_store(root: &std::path::Path) -> AssetStore {
    let blobs = FsBlobRepository::open(root.join("blobs")).await.unwrap();
    let catalog = FileCatalog::open(root.join("catalog.json")).await.unwrap();
    AssetStore::new(Arc::new(blobs), Arc::new(catalog))
}

async fn store(store: &AssetStore, data: Vec<u8>, tags: &[&str]) -> AssetId {
    store
        .store_bytes(data, AssetUpload::default().with_tags(tags.iter().copied()))
        .await
        .unwrap()
        .into_asset_id()
}

#[tokio::test]
async fn download_reproduces_the_fingerprint() {
    let dir = tempfile::tempdir().unwrap();
    let store = disk_store(dir.path()).await;

    let src = dir.path().join("upload").join("sunset.png");
    std::fs::create_dir_all(src.parent().unwrap()).unwrap();
    std::fs::write(&src, image(PNG_MAGIC, 3, 4096)).unwrap();

    let id = store
        .store_file(&src, AssetUpload::default())
        .await
        .unwrap()
        .into_asset_id();
    let record = store.get_asset_meta(&id).await.unwrap();
    assert_eq!(record.original_name, "sunset.png");

    let out = dir.path().join("out").join("nested").join("copy.png");
    let copied = store.download_to_path(&id, &out).await.unwrap();
    assert_eq!(copied, 4096);

    let downloaded = std::fs::read(&out).unwrap();
    assert_eq!(downloaded.len() as u64, record.size_bytes);
    assert_eq!(blake3::hash(&downloaded).to_hex().as_str(), record.fingerprint.to_hex());
}

#[tokio::test]
async fn assets_survive_reopening_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let id = {
        let s = disk_store(dir.path()).await;
        store(&s, image(GIF_MAGIC, 1, 256), &["animated"]).await
    };

    let s = disk_store(dir.path()).await;
    let record = s.get_asset_meta(&id).await.unwrap();
    assert_eq!(record.media_type, "image/gif");
    assert_eq!(record.tags, vec!["animated".to_string()]);

    let again = s
        .store_bytes(image(GIF_MAGIC, 1, 256), AssetUpload::default())
        .await
        .unwrap();
    assert!(again.is_duplicate());
    assert_eq!(again.asset_id(), &id);
}

#[tokio::test]
async fn delete_then_download_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let s = disk_store(dir.path()).await;
    let id = store(&s, image(PNG_MAGIC, 9, 128), &[]).await;

    s.delete_asset(&id).await.unwrap();
    let err = s
        .download_to_path(&id, dir.path().join("gone.png"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

async fn counts(blobs: &dyn BlobRepository, catalog: &dyn MetadataCatalog) -> (usize, u64) {
    (
        blobs.list_keys().await.unwrap().len(),
        catalog.count(&CatalogFilter::All).await.unwrap(),
    )
}

#[tokio::test]
async fn deleting_unknown_id_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let blobs = Arc::new(FsBlobRepository::open(dir.path().join("blobs")).await.unwrap());
    let catalog = Arc::new(FileCatalog::open(dir.path().join("catalog.json")).await.unwrap());
    let s = AssetStore::new(blobs.clone(), catalog.clone());
    store(&s, image(PNG_MAGIC, 1, 128), &[]).await;
    store(&s, image(PNG_MAGIC, 2, 128), &[]).await;

    assert_eq!(counts(&*blobs, &*catalog).await, (2, 2));

    let nonexistent = AssetId::new("does-not-exist").unwrap();
    assert!(matches!(
        s.delete_asset(&nonexistent).await,
        Err(StoreError::NotFound(_))
    ));
    assert_eq!(counts(&*blobs, &*catalog).await, (2, 2));
}

#[tokio::test]
async fn listing_orders_filters_and_pages() {
    let s = AssetStore::new(
        Arc::new(InMemoryBlobRepository::new()),
        Arc::new(InMemoryCatalog::new()),
    );
    let a = store(&s, image(PNG_MAGIC, 1, 64), &["cats"]).await;
    let b = store(&s, image(PNG_MAGIC, 2, 64), &["dogs"]).await;
    let c = store(&s, image(PNG_MAGIC, 3, 64), &["cats", "dogs"]).await;
    let d = store(&s, image(PNG_MAGIC, 4, 64), &[]).await;

    let ids = |records: Vec<pixa_store::AssetRecord>| -> Vec<AssetId> {
        records.into_iter().map(|r| r.asset_id).collect()
    };

    assert_eq!(
        ids(s.list_assets(&[], 0, 0).await.unwrap()),
        vec![d.clone(), c.clone(), b.clone(), a.clone()]
    );
    assert_eq!(
        ids(s.list_assets(&["cats".to_string()], 0, 0).await.unwrap()),
        vec![c.clone(), a.clone()]
    );
    assert_eq!(
        ids(s.list_assets(&[], 2, 1).await.unwrap()),
        vec![c.clone(), b.clone()]
    );
    assert!(s.list_assets(&[], 10, 10).await.unwrap().is_empty());

    let oldest_first = s
        .query_assets(
            &CatalogQuery::new(CatalogFilter::any_tag(["dogs"])).sort(SortOrder::CreatedAsc),
        )
        .await
        .unwrap();
    assert_eq!(ids(oldest_first), vec![b, c]);
}

#[tokio::test]
async fn sweep_removes_orphan_left_by_failed_store() {
    let blobs = Arc::new(InMemoryBlobRepository::new());
    let catalog = Arc::new(InMemoryCatalog::new());
    let s = AssetStore::new(blobs.clone(), catalog.clone());

    let kept = store(&s, image(PNG_MAGIC, 1, 64), &[]).await;

    // Insert fails and so does the compensating delete: one orphan remains.
    catalog.fail_next_inserts(1);
    blobs.fail_next_deletes(1);
    assert!(s
        .store_bytes(image(PNG_MAGIC, 2, 64), AssetUpload::default())
        .await
        .is_err());
    assert_eq!(blobs.len(), 2);

    let dry = s.sweep_orphans(SweepOptions::dry_run()).await.unwrap();
    assert_eq!((dry.scanned, dry.orphans_found, dry.orphans_removed), (2, 1, 0));
    assert_eq!(blobs.len(), 2);

    let report = s.sweep_orphans(SweepOptions::default()).await.unwrap();
    assert_eq!(report.scanned, 2);
    assert_eq!(report.orphans_found, 1);
    assert_eq!(report.orphans_removed, 1);
    assert!(report.failures.is_empty());
    assert_eq!(blobs.len(), 1);
    assert!(s.get_asset_data(&kept).await.is_ok());
    assert_eq!(s.metrics().snapshot().orphans_removed, 1);

    let again = s.sweep_orphans(SweepOptions::default()).await.unwrap();
    assert_eq!(again.orphans_removed, 0);
}

#[tokio::test]
async fn sweep_purges_interrupted_blob_writes() {
    let dir = tempfile::tempdir().unwrap();
    let s = disk_store(dir.path()).await;
    let id = store(&s, image(PNG_MAGIC, 7, 64), &[]).await;
    let key = s.get_asset_meta(&id).await.unwrap().storage_key;

    let shard = dir.path().join("blobs").join(&key.as_str()[..2]);
    let leftover = shard.join(format!(".{key}.tmp"));
    std::fs::write(&leftover, b"partial").unwrap();

    let dry = s.sweep_orphans(SweepOptions::dry_run()).await.unwrap();
    assert_eq!((dry.scanned, dry.incomplete_writes), (1, 1));
    assert!(leftover.exists());

    let report = s.sweep_orphans(SweepOptions::default()).await.unwrap();
    assert_eq!(report.incomplete_writes, 1);
    assert_eq!(report.orphans_removed, 0);
    assert!(!leftover.exists());
    assert!(s.get_asset_data(&id).await.is_ok());
}

#[tokio::test]
async fn sweep_continues_past_item_failures() {
    let blobs = Arc::new(InMemoryBlobRepository::new());
    let catalog = Arc::new(InMemoryCatalog::new());
    let s = AssetStore::new(blobs.clone(), catalog.clone());

    for seed in 1..=2 {
        catalog.fail_next_inserts(1);
        blobs.fail_next_deletes(1);
        assert!(s
            .store_bytes(image(PNG_MAGIC, seed, 64), AssetUpload::default())
            .await
            .is_err());
    }
    assert_eq!(blobs.len(), 2);

    catalog.fail_next_counts(1);
    let report = s.sweep_orphans(SweepOptions::default()).await.unwrap();
    assert_eq!(report.scanned, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.orphans_removed, 1);
    assert_eq!(blobs.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn sweep_grace_window_rechecks_candidates() {
    let blobs = Arc::new(InMemoryBlobRepository::new());
    let catalog = Arc::new(InMemoryCatalog::new());
    let s = AssetStore::new(blobs.clone(), catalog.clone());

    catalog.fail_next_inserts(1);
    blobs.fail_next_deletes(1);
    assert!(s
        .store_bytes(image(PNG_MAGIC, 5, 64), AssetUpload::default())
        .await
        .is_err());

    let report = s
        .sweep_orphans(SweepOptions::default().with_grace(Duration::from_secs(60)))
        .await
        .unwrap();
    assert_eq!(report.orphans_removed, 1);
    assert!(blobs.is_empty());
}

#[tokio::test]
async fn audit_reports_records_without_blobs() {
    let dir = tempfile::tempdir().unwrap();
    let blobs = Arc::new(FsBlobRepository::open(dir.path().join("blobs")).await.unwrap());
    let catalog = Arc::new(FileCatalog::open(dir.path().join("catalog.json")).await.unwrap());
    let s = AssetStore::new(blobs.clone(), catalog).with_config(pixa_store::StoreConfig {
        scan_page_size: 2,
        ..Default::default()
    });

    let mut ids = Vec::new();
    for seed in 1..=5 {
        ids.push(store(&s, image(PNG_MAGIC, seed, 32), &[]).await);
    }
    let broken = s.get_asset_meta(&ids[3]).await.unwrap();
    blobs.delete(&broken.storage_key).await.unwrap();

    let report = s.audit_integrity().await.unwrap();
    assert_eq!(report.checked, 5);
    assert_eq!(report.missing, vec![ids[3].clone()]);
    assert!(matches!(
        s.get_asset_data(&ids[3]).await,
        Err(StoreError::IntegrityViolation { .. })
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_identical_uploads_keep_one_copy() {
    let blobs = Arc::new(InMemoryBlobRepository::new());
    let catalog = Arc::new(InMemoryCatalog::new());
    let s = Arc::new(AssetStore::new(blobs.clone(), catalog.clone()));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let s = Arc::clone(&s);
            tokio::spawn(async move {
                s.store_bytes(image(PNG_MAGIC, 42, 2048), AssetUpload::default())
                    .await
                    .unwrap()
            })
        })
        .collect();

    let mut ids = Vec::new();
    for h in handles {
        ids.push(h.await.unwrap().into_asset_id());
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);
    assert_eq!(catalog.len(), 1);
    assert_eq!(blobs.len(), 1);

    let m = s.metrics().snapshot();
    assert_eq!(m.stored, 1);
    assert_eq!(m.duplicates, 15);
    assert_eq!(m.compensation_failures, 0);
}
