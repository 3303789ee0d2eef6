//! Failures during restore must leave the store as it was

use crate::common::{journey, populate, remote_store, restore_engine, FaultyStore, POISON_ID};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use tempfile::TempDir;
use tv_core::{
    DataStore, EntityKind, Error, MemoryStore, SledStore, SnapshotCodec, CURRENT_SCHEMA_VERSION,
};
use vault::{BackupService, BuildMode, RetentionPolicy};

#[tokio::test]
async fn test_corrupted_snapshot_rolls_back_to_pre_attempt_state() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(FaultyStore::new());
    store.insert(journey("J1")).unwrap();

    // B1 holds J1 only
    let remote = Arc::new(remote_store(temp_dir.path(), BuildMode::Prod));
    let service = BackupService::new(
        store.clone(),
        SnapshotCodec::new("1.0.0", "phone"),
        remote.clone(),
        RetentionPolicy::default(),
    );
    let b1 = service.backup_now().await.unwrap().record;

    store.insert(journey("J2")).unwrap();
    let before = store.dump();

    // Decodes fine, but one record breaks the store on reload
    let mut corrupted = SnapshotCodec::decode(&remote.read(&b1).await.unwrap()).unwrap();
    corrupted.payload.push(journey(POISON_ID));
    let bytes = SnapshotCodec::encode_snapshot(&corrupted).unwrap();

    let engine = restore_engine(store.clone(), temp_dir.path(), BuildMode::Prod);
    let err = engine.restore_bytes(&bytes).unwrap_err();

    assert!(matches!(err, Error::RestoreFailed { .. }), "got {:?}", err);
    assert!(!err.is_data_loss_risk());
    assert_eq!(store.dump(), before);

    let ids: Vec<_> = store
        .fetch_all(EntityKind::Journeys)
        .unwrap()
        .iter()
        .map(|r| r.id().to_string())
        .collect();
    assert_eq!(ids, vec!["J1", "J2"]);
}

#[tokio::test]
async fn test_truncated_file_is_rejected_without_side_effects() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(FaultyStore::new());
    store.insert(journey("J1")).unwrap();
    let before = store.dump();

    let full = SnapshotCodec::new("1.0.0", "phone")
        .encode(store.as_ref())
        .unwrap();
    let path = temp_dir.path().join("truncated.json");
    std::fs::write(&path, &full[..full.len() / 2]).unwrap();

    let engine = restore_engine(store.clone(), temp_dir.path(), BuildMode::Prod);
    let err = engine.import_file(&path).await.unwrap_err();

    assert!(matches!(err, Error::MalformedSnapshot(_)));
    assert_eq!(store.dump(), before);
    assert!(engine.safety().latest().unwrap().is_none());
}

#[test]
fn test_rollback_fidelity_for_any_failure_point() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x7e57);

    for round in 0..12 {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(FaultyStore::new());
        let journeys = rng.gen_range(0..5);
        populate(store.as_ref(), &mut rng, journeys);
        let before = store.dump();

        let source = MemoryStore::new();
        let incoming_journeys = rng.gen_range(1..6);
        populate(&source, &mut rng, incoming_journeys);
        let incoming = SnapshotCodec::new("1.0.0", "other").capture(&source).unwrap();

        let total = incoming.payload.record_count();
        let fail_after = rng.gen_range(0..total);
        store.fail_once_after(fail_after);

        // Odd rounds go through the serialized form, as a restore from disk does
        let engine = restore_engine(store.clone(), temp_dir.path(), BuildMode::Prod);
        let err = if round % 2 == 0 {
            engine.restore_snapshot(&incoming).unwrap_err()
        } else {
            let bytes = SnapshotCodec::encode_snapshot(&incoming).unwrap();
            engine.restore_bytes(&bytes).unwrap_err()
        };

        assert!(
            matches!(err, Error::RestoreFailed { .. }),
            "round {}: failing after {} of {} gave {:?}",
            round,
            fail_after,
            total,
            err
        );
        assert_eq!(
            store.dump(),
            before,
            "round {}: store differs after failing at {} of {}",
            round,
            fail_after,
            total
        );
    }
}

#[test]
fn test_failed_rollback_is_reported_as_data_loss_risk() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(FaultyStore::new());
    store.insert(journey("J1")).unwrap();
    store.insert(journey("J2")).unwrap();

    let source = MemoryStore::new();
    source.insert(journey("A")).unwrap();
    source.insert(journey("B")).unwrap();
    let incoming = SnapshotCodec::new("1.0.0", "other").capture(&source).unwrap();

    // Every insert after the first fails, including those of the rollback
    store.fail_always_after(1);

    let engine = restore_engine(store.clone(), temp_dir.path(), BuildMode::Prod);
    let err = engine.restore_snapshot(&incoming).unwrap_err();

    assert!(err.is_data_loss_risk());
    match err {
        Error::RollbackFailed {
            safety_snapshot, ..
        } => {
            // The pre-restore state survives on disk
            let saved = SnapshotCodec::decode(&std::fs::read(&safety_snapshot).unwrap()).unwrap();
            let ids: Vec<_> = saved.payload.journeys.iter().map(|j| j.id.as_str()).collect();
            assert_eq!(ids, vec!["J1", "J2"]);
        }
        other => panic!("expected RollbackFailed, got {:?}", other),
    }
}

#[test]
fn test_schema_gate_leaves_sled_store_unchanged() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(SledStore::open(&temp_dir.path().join("db")).unwrap());
    populate(store.as_ref(), &mut ChaCha8Rng::seed_from_u64(3), 2);

    let read_all = |store: &SledStore| -> Vec<Vec<u8>> {
        EntityKind::LOAD_ORDER
            .iter()
            .flat_map(|kind| store.fetch_all(*kind).unwrap())
            .map(|record| record.to_json().unwrap())
            .collect()
    };
    let before = read_all(store.as_ref());

    let mut incoming = SnapshotCodec::new("9.0.0", "future")
        .capture(&MemoryStore::new())
        .unwrap();
    incoming.metadata.schema_version = CURRENT_SCHEMA_VERSION + 1;
    let bytes = SnapshotCodec::encode_snapshot(&incoming).unwrap();

    let engine = restore_engine(store.clone(), temp_dir.path(), BuildMode::Prod);
    let err = engine.restore_bytes(&bytes).unwrap_err();

    assert!(matches!(err, Error::IncompatibleSchema { .. }));
    assert_eq!(read_all(store.as_ref()), before);
    assert!(engine.safety().latest().unwrap().is_none());
}

#[test]
fn test_restore_from_bytes_reproduces_source_exactly() {
    let mut rng = ChaCha8Rng::seed_from_u64(0xf10a7);

    for _ in 0..8 {
        let temp_dir = TempDir::new().unwrap();
        let source = MemoryStore::new();
        let journeys = rng.gen_range(1..8);
        populate(&source, &mut rng, journeys);
        let bytes = SnapshotCodec::new("1.0.0", "other").encode(&source).unwrap();

        let store = Arc::new(FaultyStore::new());
        populate(store.as_ref(), &mut rng, 2);

        let engine = restore_engine(store.clone(), temp_dir.path(), BuildMode::Prod);
        let report = engine.restore_bytes(&bytes).unwrap();

        assert!(report.rejected.is_empty());
        assert_eq!(store.dump(), source.dump());
    }
}

#[test]
fn test_failed_restores_do_not_pile_up_safety_snapshots() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(FaultyStore::new());
    store.insert(journey("J1")).unwrap();
    let before = store.dump();

    let source = MemoryStore::new();
    source.insert(journey("A")).unwrap();
    source.insert(journey("B")).unwrap();
    let incoming = SnapshotCodec::new("1.0.0", "other").capture(&source).unwrap();

    // restore_engine keeps 5 safety snapshots
    let engine = restore_engine(store.clone(), temp_dir.path(), BuildMode::Prod);
    for _ in 0..8 {
        store.fail_once_after(1);
        let err = engine.restore_snapshot(&incoming).unwrap_err();
        assert!(matches!(err, Error::RestoreFailed { .. }));
    }

    assert_eq!(store.dump(), before);
    assert_eq!(engine.safety().list().unwrap().len(), 5);
}
