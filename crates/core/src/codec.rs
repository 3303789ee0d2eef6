//! Snapshot codec: whole-store capture and the portable JSON document
//!
//! Document layout (UTF-8 JSON, keys in a fixed order):
//! ```text
//! {
//!   "metadata": { "createdAt", "appVersion", "deviceName", "databaseSchemaVersion" },
//!   "journeys": [...], "transports": [...], "hotels": [...], "carRentals": [...],
//!   "documents": [...], "notes": [...], "places": [...], "reminders": [...],
//!   "expenses": [...],
//!   "userSettings": { "preferredCurrency", "preferredLanguage" }
//! }
//! ```
//! Missing collections decode as empty. The metadata block can be read on
//! its own with [`SnapshotCodec::peek_metadata`].

use crate::datastore::DataStore;
use crate::error::{Error, Result};
use crate::snapshot::{EntityKind, Payload, Snapshot, SnapshotMetadata};
use chrono::{SubsecRound, Utc};
use serde::Deserialize;

/// Builds and parses snapshot documents
#[derive(Debug, Clone)]
pub struct SnapshotCodec {
    app_version: String,
    device_name: String,
}

/// Only the metadata block; every other key is skipped by serde
#[derive(Deserialize)]
struct MetadataOnly {
    metadata: SnapshotMetadata,
}

impl SnapshotCodec {
    pub fn new(app_version: impl Into<String>, device_name: impl Into<String>) -> Self {
        Self {
            app_version: app_version.into(),
            device_name: device_name.into(),
        }
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Read every collection of the store into a fresh snapshot
    ///
    /// Collections are read back to back with no writes in between; callers
    /// serialize access to the store.
    pub fn capture(&self, store: &dyn DataStore) -> Result<Snapshot> {
        let schema_version = store.current_schema_version()?;

        let mut payload = Payload::default();
        for kind in EntityKind::LOAD_ORDER {
            for record in store.fetch_all(kind)? {
                payload.push(record);
            }
        }

        Ok(Snapshot {
            metadata: SnapshotMetadata {
                created_at: Utc::now().trunc_subsecs(3),
                app_version: self.app_version.clone(),
                device_name: self.device_name.clone(),
                schema_version,
            },
            payload,
        })
    }

    /// Capture the store and serialize it
    pub fn encode(&self, store: &dyn DataStore) -> Result<Vec<u8>> {
        let snapshot = self.capture(store)?;
        Self::encode_snapshot(&snapshot)
    }

    /// Serialize an already captured snapshot. Refuses NaN and infinite
    /// values, which JSON would silently turn into `null`.
    pub fn encode_snapshot(snapshot: &Snapshot) -> Result<Vec<u8>> {
        for record in snapshot.payload.records_in_load_order() {
            if let Some(field) = record.non_finite_field() {
                return Err(Error::MalformedSnapshot(format!(
                    "{} record '{}' has a non-finite {}",
                    record.kind(),
                    record.id(),
                    field
                )));
            }
        }

        serde_json::to_vec_pretty(snapshot)
            .map_err(|e| Error::MalformedSnapshot(format!("failed to serialize snapshot: {}", e)))
    }

    /// Parse a full snapshot. All or nothing.
    pub fn decode(bytes: &[u8]) -> Result<Snapshot> {
        serde_json::from_slice(bytes).map_err(|e| Error::MalformedSnapshot(e.to_string()))
    }

    /// Parse only the metadata block
    pub fn peek_metadata(bytes: &[u8]) -> Result<SnapshotMetadata> {
        serde_json::from_slice::<MetadataOnly>(bytes)
            .map(|m| m.metadata)
            .map_err(|e| Error::MalformedSnapshot(e.to_string()))
    }
}
