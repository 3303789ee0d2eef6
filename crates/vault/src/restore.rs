//! Safety-net restore: replace the whole store, or put it back as it was
//!
//! Every attempt walks `Idle -> SnapshotTaken -> Wiped -> Reloading` and ends
//! in `Committed` or `RolledBack`:
//!
//! 1. The incoming schema version is checked against the store. A newer
//!    snapshot is refused before anything is touched.
//! 2. The current store is captured and written to the safety vault. If that
//!    fails the attempt aborts, nothing has been mutated yet.
//! 3. The store is wiped.
//! 4. Records are inserted parents first. A record the store rejects is
//!    skipped and reported; any other store error is fatal.
//! 5. On a fatal error, steps 3 and 4 run again with the safety snapshot and
//!    the original error is returned as [`Error::RestoreFailed`]. If that
//!    fails too the caller gets [`Error::RollbackFailed`].
//!
//! A process that dies between wipe and commit leaves the store wiped or
//! partially reloaded; only in-process failures are rolled back. The safety
//! snapshot on disk is the manual way back in that case.

use crate::record::{BackupRecord, BuildMode};
use crate::remote::RemoteStore;
use crate::safety::SafetyVault;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tv_core::{
    DataStore, EntityKind, Error, Payload, Result, Snapshot, SnapshotCodec, SnapshotMetadata,
    StoreError,
};
use ulid::Ulid;

/// Where a restore attempt currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RestorePhase {
    Idle,
    SnapshotTaken,
    Wiped,
    Reloading,
    Committed,
    RolledBack,
}

impl fmt::Display for RestorePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RestorePhase::Idle => "idle",
            RestorePhase::SnapshotTaken => "snapshot-taken",
            RestorePhase::Wiped => "wiped",
            RestorePhase::Reloading => "reloading",
            RestorePhase::Committed => "committed",
            RestorePhase::RolledBack => "rolled-back",
        };
        f.write_str(name)
    }
}

/// A record the store refused during reload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRecord {
    pub kind: EntityKind,
    pub id: String,
    pub reason: String,
}

/// Result of a committed restore
#[derive(Debug, Clone, Serialize)]
pub struct RestoreReport {
    pub attempt: Ulid,
    pub source: SnapshotMetadata,
    pub inserted: BTreeMap<EntityKind, usize>,
    pub rejected: Vec<RejectedRecord>,
    pub safety_snapshot: PathBuf,
    pub phases: Vec<RestorePhase>,
}

impl RestoreReport {
    pub fn inserted_total(&self) -> usize {
        self.inserted.values().sum()
    }
}

/// What the user confirms before a destructive restore
#[derive(Debug, Clone)]
pub struct SnapshotPreview {
    pub metadata: SnapshotMetadata,
    pub current_schema_version: u32,
}

impl SnapshotPreview {
    pub fn is_compatible(&self) -> bool {
        self.metadata.schema_version <= self.current_schema_version
    }
}

/// Runs restores against one store
#[derive(Clone)]
pub struct RestoreEngine {
    store: Arc<dyn DataStore>,
    codec: SnapshotCodec,
    safety: Arc<SafetyVault>,
    build_mode: BuildMode,
}

impl RestoreEngine {
    pub fn new(store: Arc<dyn DataStore>, codec: SnapshotCodec, safety: Arc<SafetyVault>) -> Self {
        Self {
            store,
            codec,
            safety,
            build_mode: BuildMode::current(),
        }
    }

    pub fn with_build_mode(mut self, build_mode: BuildMode) -> Self {
        self.build_mode = build_mode;
        self
    }

    pub fn safety(&self) -> &SafetyVault {
        &self.safety
    }

    /// Read only the metadata block and the store's schema version
    pub fn preview(&self, bytes: &[u8]) -> Result<SnapshotPreview> {
        let metadata = SnapshotCodec::peek_metadata(bytes)?;
        let current_schema_version = self.store.current_schema_version()?;
        Ok(SnapshotPreview {
            metadata,
            current_schema_version,
        })
    }

    /// Replace the store with a local snapshot file
    pub async fn import_file(&self, path: &Path) -> Result<RestoreReport> {
        let bytes = tokio::fs::read(path).await?;
        info!(file = %path.display(), "Importing snapshot");
        self.restore_bytes_blocking(bytes).await
    }

    /// Replace the store with a remote backup
    pub async fn restore_remote(
        &self,
        remote: &RemoteStore,
        record: &BackupRecord,
    ) -> Result<RestoreReport> {
        if record.is_dev() && !self.build_mode.is_dev() {
            return Err(Error::DevBackupOnProdBuild(record.file_name.clone()));
        }

        let bytes = remote.read(record).await?;
        info!(file = %record.file_name, "Restoring remote backup");
        self.restore_bytes_blocking(bytes).await
    }

    async fn restore_bytes_blocking(&self, bytes: Vec<u8>) -> Result<RestoreReport> {
        let engine = self.clone();
        tokio::task::spawn_blocking(move || engine.restore_bytes(&bytes))
            .await
            .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?
    }

    /// Validate and decode, then run the protocol. Blocking.
    pub fn restore_bytes(&self, bytes: &[u8]) -> Result<RestoreReport> {
        // The schema gate runs on the metadata alone, so a newer snapshot
        // whose payload this build cannot parse still reports the schema
        let metadata = SnapshotCodec::peek_metadata(bytes)?;
        self.check_schema(metadata.schema_version)?;

        let snapshot = SnapshotCodec::decode(bytes)?;
        self.restore_snapshot(&snapshot)
    }

    /// Run the full protocol for an already decoded snapshot. Blocking.
    pub fn restore_snapshot(&self, snapshot: &Snapshot) -> Result<RestoreReport> {
        let attempt = Ulid::new();
        let mut phases = vec![RestorePhase::Idle];

        self.check_schema(snapshot.metadata.schema_version)?;

        // SnapshotTaken: nothing below runs unless this succeeds
        let safety_snapshot = self.codec.capture(self.store.as_ref())?;
        let safety_bytes = SnapshotCodec::encode_snapshot(&safety_snapshot)?;
        let safety_path = self.safety.store(&safety_bytes)?;
        self.enter(attempt, &mut phases, RestorePhase::SnapshotTaken);
        info!(
            attempt = %attempt,
            records = safety_snapshot.payload.record_count(),
            safety = %safety_path.display(),
            "Captured pre-restore state"
        );

        match self.replace_contents(attempt, &snapshot.payload, Some(&mut phases)) {
            Ok((inserted, rejected)) => {
                self.enter(attempt, &mut phases, RestorePhase::Committed);
                if !rejected.is_empty() {
                    warn!(
                        attempt = %attempt,
                        "Restore committed with {} rejected records",
                        rejected.len()
                    );
                }
                if let Err(e) = self.safety.prune() {
                    warn!("Could not prune safety snapshots: {}", e);
                }
                info!(attempt = %attempt, records = inserted.values().sum::<usize>(), "Restore committed");

                Ok(RestoreReport {
                    attempt,
                    source: snapshot.metadata.clone(),
                    inserted,
                    rejected,
                    safety_snapshot: safety_path,
                    phases,
                })
            }
            Err(cause) => {
                warn!(attempt = %attempt, "Restore failed, rolling back: {}", cause);
                self.roll_back(attempt, cause, &safety_snapshot, safety_path)
            }
        }
    }

    fn roll_back(
        &self,
        attempt: Ulid,
        cause: Error,
        safety_snapshot: &Snapshot,
        safety_path: PathBuf,
    ) -> Result<RestoreReport> {
        match self.replace_contents(attempt, &safety_snapshot.payload, None) {
            Ok((_, rejected)) => {
                if !rejected.is_empty() {
                    warn!(
                        attempt = %attempt,
                        "Rollback skipped {} records the store rejected",
                        rejected.len()
                    );
                }
                info!(attempt = %attempt, phase = %RestorePhase::RolledBack, "Pre-restore state put back");
                // Failed attempts count toward the same cap as commits
                if let Err(e) = self.safety.prune() {
                    warn!("Could not prune safety snapshots: {}", e);
                }
                Err(Error::RestoreFailed {
                    cause: Box::new(cause),
                })
            }
            Err(rollback) => {
                error!(
                    attempt = %attempt,
                    safety = %safety_path.display(),
                    "Rollback failed, local data may be lost: {}",
                    rollback
                );
                Err(Error::RollbackFailed {
                    cause: Box::new(cause),
                    rollback: Box::new(rollback),
                    safety_snapshot: safety_path,
                })
            }
        }
    }

    /// Wipe, then insert every record parents first
    fn replace_contents(
        &self,
        attempt: Ulid,
        payload: &Payload,
        mut phases: Option<&mut Vec<RestorePhase>>,
    ) -> Result<(BTreeMap<EntityKind, usize>, Vec<RejectedRecord>)> {
        self.store.wipe_all()?;
        if let Some(phases) = phases.as_deref_mut() {
            self.enter(attempt, phases, RestorePhase::Wiped);
            self.enter(attempt, phases, RestorePhase::Reloading);
        }

        let mut inserted = BTreeMap::new();
        let mut rejected = Vec::new();

        for kind in EntityKind::LOAD_ORDER {
            let mut count = 0;
            for record in payload.records(kind) {
                match self.store.insert(record) {
                    Ok(()) => count += 1,
                    Err(StoreError::Rejected { kind, id, reason }) => {
                        debug!(attempt = %attempt, %kind, %id, "Record rejected: {}", reason);
                        rejected.push(RejectedRecord { kind, id, reason });
                    }
                    Err(e) => return Err(Error::Store(e)),
                }
            }
            inserted.insert(kind, count);
        }

        Ok((inserted, rejected))
    }

    fn check_schema(&self, found: u32) -> Result<()> {
        let current = self.store.current_schema_version()?;
        if found > current {
            return Err(Error::IncompatibleSchema { current, found });
        }
        Ok(())
    }

    fn enter(&self, attempt: Ulid, phases: &mut Vec<RestorePhase>, phase: RestorePhase) {
        debug!(attempt = %attempt, %phase, "Restore phase");
        phases.push(phase);
    }
}
