//! Shared fixtures for vault scenario tests

#![allow(dead_code)]

use chrono::{Duration, NaiveDate, SubsecRound, Utc};
use parking_lot::Mutex;
use rand::Rng;
use std::path::Path;
use std::sync::Arc;
use tv_core::snapshot::{Expense, Hotel, Journey, Note, Place, UserSettings};
use tv_core::{
    DataStore, EntityKind, MemoryStore, Record, Snapshot, SnapshotCodec, SnapshotMetadata,
    StoreError, CURRENT_SCHEMA_VERSION,
};
use vault::{BuildMode, ManualConnectivity, RemoteStore, RestoreEngine, SafetyVault};

/// Inserting a record with this id fails like a corrupted page would
pub const POISON_ID: &str = "corrupt";

/// Armed insert failure
#[derive(Debug, Clone, Copy)]
struct Fault {
    /// Inserts still let through before failing
    remaining: usize,
    /// Disarm after the first failure
    once: bool,
}

/// `MemoryStore` wrapper that fails on demand
pub struct FaultyStore {
    inner: MemoryStore,
    fault: Mutex<Option<Fault>>,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            fault: Mutex::new(None),
        }
    }

    /// Fail the insert after `n` successful ones, once
    pub fn fail_once_after(&self, n: usize) {
        *self.fault.lock() = Some(Fault { remaining: n, once: true });
    }

    /// Fail every insert after `n` successful ones
    pub fn fail_always_after(&self, n: usize) {
        *self.fault.lock() = Some(Fault { remaining: n, once: false });
    }

    pub fn dump(&self) -> std::collections::BTreeMap<EntityKind, Vec<Record>> {
        self.inner.dump()
    }

    fn injected_failure(&self) -> Option<StoreError> {
        let mut fault = self.fault.lock();
        let armed = (*fault)?;
        if armed.remaining > 0 {
            *fault = Some(Fault {
                remaining: armed.remaining - 1,
                ..armed
            });
            return None;
        }
        if armed.once {
            *fault = None;
        }
        Some(StoreError::Backend("injected insert failure".into()))
    }
}

impl DataStore for FaultyStore {
    fn fetch_all(&self, kind: EntityKind) -> Result<Vec<Record>, StoreError> {
        self.inner.fetch_all(kind)
    }

    fn insert(&self, record: Record) -> Result<(), StoreError> {
        if record.id() == POISON_ID {
            return Err(StoreError::Backend("database disk image is malformed".into()));
        }
        if let Some(e) = self.injected_failure() {
            return Err(e);
        }
        self.inner.insert(record)
    }

    fn wipe_all(&self) -> Result<(), StoreError> {
        self.inner.wipe_all()
    }

    fn current_schema_version(&self) -> Result<u32, StoreError> {
        self.inner.current_schema_version()
    }
}

pub fn journey(id: &str) -> Record {
    Record::Journey(Journey {
        id: id.into(),
        name: format!("Journey {}", id),
        destination: Some("Norway".into()),
        start_date: NaiveDate::from_ymd_opt(2024, 6, 1),
        end_date: None,
        notes: None,
        cover_image: None,
    })
}

/// Fill a store with random journeys and children
pub fn populate(store: &dyn DataStore, rng: &mut impl Rng, journeys: usize) {
    for j in 0..journeys {
        store.insert(journey(&format!("j{}", j))).unwrap();
    }
    if journeys == 0 {
        return;
    }

    let children = rng.gen_range(journeys..journeys * 4 + 1);
    for c in 0..children {
        let parent = format!("j{}", rng.gen_range(0..journeys));
        let id = format!("c{}", c);
        let record = match rng.gen_range(0..4) {
            0 => Record::Hotel(Hotel {
                id,
                journey_id: parent,
                name: "Fjord Inn".into(),
                address: None,
                check_in: NaiveDate::from_ymd_opt(2024, 6, rng.gen_range(1..28)),
                check_out: None,
                confirmation_code: Some(format!("H{}", rng.gen_range(1000..9999))),
                notes: None,
            }),
            1 => Record::Note(Note {
                id,
                journey_id: parent,
                title: None,
                body: format!("note {}", rng.gen::<u32>()),
                created_at: Some(Utc::now().trunc_subsecs(3)),
            }),
            2 => Record::Place(Place {
                id,
                journey_id: parent,
                name: "Viewpoint".into(),
                address: None,
                latitude: Some(rng.gen_range(-90.0..90.0)),
                longitude: Some(rng.gen_range(-180.0..180.0)),
                visited: rng.gen(),
            }),
            _ => Record::Expense(Expense {
                id,
                journey_id: parent,
                description: "ferry".into(),
                amount: rng.gen_range(1..50_000) as f64 / 100.0,
                currency: "NOK".into(),
                category: None,
                spent_on: None,
            }),
        };
        store.insert(record).unwrap();
    }

    store
        .insert(Record::UserSettings(UserSettings {
            preferred_currency: Some("NOK".into()),
            preferred_language: Some("nb".into()),
        }))
        .unwrap();
}

/// Encoded empty snapshot with a chosen creation time
pub fn snapshot_bytes_aged(age: Duration) -> Vec<u8> {
    let snapshot = Snapshot {
        metadata: SnapshotMetadata {
            created_at: (Utc::now() - age).trunc_subsecs(0),
            app_version: "1.0.0".into(),
            device_name: "fixture".into(),
            schema_version: CURRENT_SCHEMA_VERSION,
        },
        payload: Default::default(),
    };
    SnapshotCodec::encode_snapshot(&snapshot).unwrap()
}

pub fn remote_store(root: &Path, mode: BuildMode) -> RemoteStore {
    RemoteStore::new(root.join("remote"), Arc::new(ManualConnectivity::new()))
        .with_build_mode(mode)
}

pub fn restore_engine(store: Arc<dyn DataStore>, root: &Path, mode: BuildMode) -> RestoreEngine {
    let safety = Arc::new(SafetyVault::new(root.join("safety"), 5));
    RestoreEngine::new(store, SnapshotCodec::new("1.0.0", "test-device"), safety)
        .with_build_mode(mode)
}
