//! Backup, list, retention and restore against a real directory

use crate::common::{populate, remote_store, restore_engine};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use tempfile::TempDir;
use tv_core::{DataStore, EntityKind, MemoryStore, SnapshotCodec, CURRENT_SCHEMA_VERSION};
use vault::{BackupService, BuildMode, RetentionPolicy};

#[tokio::test]
async fn test_backup_cycle_on_empty_remote() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    populate(store.as_ref(), &mut ChaCha8Rng::seed_from_u64(11), 3);

    let remote = Arc::new(remote_store(temp_dir.path(), BuildMode::Prod));
    let codec = SnapshotCodec::new("4.2.0", "pixel");
    let service = BackupService::new(
        store.clone(),
        codec.clone(),
        remote.clone(),
        RetentionPolicy::default(),
    );

    let outcome = service.backup_now().await.unwrap();

    let listed = remote.list().await.unwrap();
    assert_eq!(listed.len(), 1);
    let record = &listed[0];
    assert_eq!(record, &outcome.record);
    assert_eq!(record.device_name, "pixel");
    assert_eq!(record.app_version, "4.2.0");
    assert_eq!(record.schema_version, CURRENT_SCHEMA_VERSION);

    let stored = SnapshotCodec::decode(&remote.read(record).await.unwrap()).unwrap();
    let current = codec.capture(store.as_ref()).unwrap();
    assert_eq!(stored.payload.counts(), current.payload.counts());

    // Fresh and alone: retention keeps it
    let report = RetentionPolicy::default().apply(&remote).await;
    assert!(report.deleted.is_empty());
    assert_eq!(remote.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_restore_remote_backup_into_other_store() {
    let temp_dir = TempDir::new().unwrap();
    let source = Arc::new(MemoryStore::new());
    populate(source.as_ref(), &mut ChaCha8Rng::seed_from_u64(5), 4);

    let remote = Arc::new(remote_store(temp_dir.path(), BuildMode::Prod));
    let service = BackupService::new(
        source.clone(),
        SnapshotCodec::new("1.0.0", "phone"),
        remote.clone(),
        RetentionPolicy::default(),
    );
    let outcome = service.backup_now().await.unwrap();

    let target = Arc::new(MemoryStore::new());
    let engine = restore_engine(target.clone(), temp_dir.path(), BuildMode::Prod);
    let report = engine.restore_remote(&remote, &outcome.record).await.unwrap();

    assert!(report.rejected.is_empty());
    assert_eq!(report.source.device_name, "phone");
    for kind in EntityKind::LOAD_ORDER {
        let ids = |store: &MemoryStore| -> Vec<String> {
            store
                .fetch_all(kind)
                .unwrap()
                .iter()
                .map(|r| r.id().to_string())
                .collect()
        };
        assert_eq!(ids(target.as_ref()), ids(source.as_ref()), "{} differ", kind);
    }
}

#[tokio::test]
async fn test_two_writers_share_one_directory() {
    let temp_dir = TempDir::new().unwrap();
    // Separate instances stand in for separate processes: they only share
    // the directory and its lock files
    let a = Arc::new(remote_store(temp_dir.path(), BuildMode::Prod));
    let b = Arc::new(remote_store(temp_dir.path(), BuildMode::Prod));
    let bytes = SnapshotCodec::new("1.0.0", "shared")
        .encode(&MemoryStore::new())
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..8 {
        let remote = if i % 2 == 0 { a.clone() } else { b.clone() };
        let bytes = bytes.clone();
        handles.push(tokio::spawn(async move { remote.create(&bytes).await }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let listed = a.list().await.unwrap();
    assert_eq!(listed.len(), 8);
    for record in &listed {
        let contents = a.read(record).await.unwrap();
        assert_eq!(contents, bytes);
    }
}
