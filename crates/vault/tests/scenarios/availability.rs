//! Precondition and guard failures happen before anything is touched

use crate::common::{journey, remote_store, restore_engine, snapshot_bytes_aged, FaultyStore};
use chrono::Duration;
use std::sync::Arc;
use tempfile::TempDir;
use tv_core::{DataStore, EntityKind, Error};
use vault::{BuildMode, ManualConnectivity, RemoteStore};

#[tokio::test]
async fn test_dev_backup_is_refused_on_prod_build() {
    let temp_dir = TempDir::new().unwrap();
    let dev_remote = remote_store(temp_dir.path(), BuildMode::Dev);
    let record = dev_remote
        .create(&snapshot_bytes_aged(Duration::zero()))
        .await
        .unwrap();
    assert!(record.is_dev());

    let store = Arc::new(FaultyStore::new());
    store.insert(journey("J1")).unwrap();
    let before = store.dump();

    let prod_engine = restore_engine(store.clone(), temp_dir.path(), BuildMode::Prod);
    let err = prod_engine
        .restore_remote(&dev_remote, &record)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DevBackupOnProdBuild(ref name) if *name == record.file_name));
    assert_eq!(store.dump(), before);

    // A dev build restores it (the fixture snapshot is empty)
    let dev_engine = restore_engine(store.clone(), temp_dir.path(), BuildMode::Dev);
    dev_engine.restore_remote(&dev_remote, &record).await.unwrap();
    assert!(store.fetch_all(EntityKind::Journeys).unwrap().is_empty());
}

#[tokio::test]
async fn test_prod_backup_restores_on_prod_build() {
    let temp_dir = TempDir::new().unwrap();
    let remote = remote_store(temp_dir.path(), BuildMode::Prod);
    let record = remote
        .create(&snapshot_bytes_aged(Duration::minutes(1)))
        .await
        .unwrap();

    let store = Arc::new(FaultyStore::new());
    let engine = restore_engine(store, temp_dir.path(), BuildMode::Prod);
    assert!(engine.restore_remote(&remote, &record).await.is_ok());
}

#[tokio::test]
async fn test_unmounted_remote_fails_every_operation() {
    let temp_dir = TempDir::new().unwrap();
    let missing_root = temp_dir.path().join("volumes/cloud");
    let remote = RemoteStore::new(
        missing_root.join("tripvault"),
        Arc::new(ManualConnectivity::new()),
    );

    let bytes = snapshot_bytes_aged(Duration::zero());
    assert!(matches!(remote.create(&bytes).await, Err(Error::RemoteUnavailable(_))));
    assert!(matches!(remote.list().await, Err(Error::RemoteUnavailable(_))));
    assert!(matches!(remote.delete_all().await, Err(Error::RemoteUnavailable(_))));
    assert!(!missing_root.exists(), "no directory may be created");
}

#[tokio::test]
async fn test_offline_restore_leaves_store_untouched() {
    let temp_dir = TempDir::new().unwrap();
    let probe = Arc::new(ManualConnectivity::new());
    let remote = RemoteStore::new(temp_dir.path().join("remote"), probe.clone())
        .with_build_mode(BuildMode::Prod);
    let record = remote
        .create(&snapshot_bytes_aged(Duration::zero()))
        .await
        .unwrap();

    let store = Arc::new(FaultyStore::new());
    store.insert(journey("J1")).unwrap();
    let before = store.dump();

    probe.set_online(false);
    let engine = restore_engine(store.clone(), temp_dir.path(), BuildMode::Prod);
    let err = engine.restore_remote(&remote, &record).await.unwrap_err();

    assert!(matches!(err, Error::NetworkUnavailable(_)));
    assert!(err.is_unavailable());
    assert_eq!(store.dump(), before);
    assert!(engine.safety().latest().unwrap().is_none());
}
