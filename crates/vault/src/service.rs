//! Backup service: encode the store, write it remotely, apply retention

use crate::record::BackupRecord;
use crate::remote::RemoteStore;
use crate::retention::{RetentionPolicy, RetentionReport};
use std::sync::Arc;
use tracing::info;
use tv_core::{DataStore, Result, SnapshotCodec};

/// What one backup produced
#[derive(Debug, Clone)]
pub struct BackupOutcome {
    pub record: BackupRecord,
    pub retention: RetentionReport,
}

/// Wires the store, the codec and the remote directory together
pub struct BackupService {
    store: Arc<dyn DataStore>,
    codec: SnapshotCodec,
    remote: Arc<RemoteStore>,
    retention: RetentionPolicy,
}

impl BackupService {
    pub fn new(
        store: Arc<dyn DataStore>,
        codec: SnapshotCodec,
        remote: Arc<RemoteStore>,
        retention: RetentionPolicy,
    ) -> Self {
        Self {
            store,
            codec,
            remote,
            retention,
        }
    }

    pub fn remote(&self) -> &RemoteStore {
        &self.remote
    }

    /// Back up now. Availability is checked before the store is read;
    /// retention problems never fail the backup.
    pub async fn backup_now(&self) -> Result<BackupOutcome> {
        self.remote.ensure_available().await?;

        let bytes = self.codec.encode(self.store.as_ref())?;
        let record = self.remote.create(&bytes).await?;
        let retention = self.retention.apply(&self.remote).await;

        info!(
            file = %record.file_name,
            evicted = retention.deleted.len(),
            "Backup complete"
        );
        Ok(BackupOutcome { record, retention })
    }
}
