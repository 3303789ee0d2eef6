//! Data store facade
//!
//! The backup engine sees the whole travel database as one logical store
//! with four operations. Per-entity CRUD lives elsewhere; implementations of
//! [`DataStore`] adapt it to this boundary.

use crate::error::StoreError;
use crate::snapshot::{EntityKind, Record};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Schema version understood by this build
pub const CURRENT_SCHEMA_VERSION: u32 = 3;

/// The boundary the codec and restore protocol depend on
///
/// No transactional guarantee is assumed beyond "complete or signal
/// failure". A store that cannot be reached must fail every call with
/// [`StoreError::Unavailable`].
pub trait DataStore: Send + Sync {
    /// Every record of one collection, in a stable order
    fn fetch_all(&self, kind: EntityKind) -> Result<Vec<Record>, StoreError>;

    /// Insert one record. Referential checks happen here.
    fn insert(&self, record: Record) -> Result<(), StoreError>;

    /// Remove every collection and the user preferences
    fn wipe_all(&self) -> Result<(), StoreError>;

    /// Schema version of the data this store holds
    fn current_schema_version(&self) -> Result<u32, StoreError>;
}

/// Check the invariants every backend enforces on insert
pub(crate) fn check_insert(
    record: &Record,
    id_exists: impl Fn(EntityKind, &str) -> Result<bool, StoreError>,
) -> Result<(), StoreError> {
    let kind = record.kind();
    let reject = |reason: String| StoreError::Rejected {
        kind,
        id: record.id().to_string(),
        reason,
    };

    if record.id().trim().is_empty() {
        return Err(reject("empty id".to_string()));
    }

    if let Some(field) = record.non_finite_field() {
        return Err(reject(format!("{} is not a finite number", field)));
    }

    if kind != EntityKind::UserSettings && id_exists(kind, record.id())? {
        return Err(reject("duplicate id".to_string()));
    }

    if let Some(journey_id) = record.journey_id() {
        if !id_exists(EntityKind::Journeys, journey_id)? {
            return Err(reject(format!("unknown journey '{}'", journey_id)));
        }
    }

    Ok(())
}

/// In-memory store, preserving insertion order per collection
///
/// Used by tests and as a scratch store. Can be switched offline to
/// exercise the fail-closed path.
pub struct MemoryStore {
    tables: RwLock<BTreeMap<EntityKind, Vec<Record>>>,
    schema_version: u32,
    available: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_schema_version(CURRENT_SCHEMA_VERSION)
    }

    pub fn with_schema_version(schema_version: u32) -> Self {
        Self {
            tables: RwLock::new(BTreeMap::new()),
            schema_version,
            available: AtomicBool::new(true),
        }
    }

    /// Toggle reachability. While unavailable every call fails closed.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Copy of all tables, for comparisons in tests and diagnostics
    pub fn dump(&self) -> BTreeMap<EntityKind, Vec<Record>> {
        self.tables
            .read()
            .iter()
            .filter(|(_, rows)| !rows.is_empty())
            .map(|(kind, rows)| (*kind, rows.clone()))
            .collect()
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store is offline".to_string()))
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DataStore for MemoryStore {
    fn fetch_all(&self, kind: EntityKind) -> Result<Vec<Record>, StoreError> {
        self.ensure_available()?;
        Ok(self.tables.read().get(&kind).cloned().unwrap_or_default())
    }

    fn insert(&self, record: Record) -> Result<(), StoreError> {
        self.ensure_available()?;
        let mut tables = self.tables.write();

        check_insert(&record, |kind, id| {
            Ok(tables
                .get(&kind)
                .map(|rows| rows.iter().any(|r| r.id() == id))
                .unwrap_or(false))
        })?;

        let rows = tables.entry(record.kind()).or_default();
        if record.kind() == EntityKind::UserSettings {
            rows.clear();
        }
        rows.push(record);
        Ok(())
    }

    fn wipe_all(&self) -> Result<(), StoreError> {
        self.ensure_available()?;
        self.tables.write().clear();
        Ok(())
    }

    fn current_schema_version(&self) -> Result<u32, StoreError> {
        self.ensure_available()?;
        Ok(self.schema_version)
    }
}
