//! Error taxonomy shared by the backup and restore engine

use crate::snapshot::EntityKind;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a [`DataStore`](crate::DataStore) implementation
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying store cannot be reached. Every facade method fails
    /// closed with this variant instead of pretending the store is empty.
    #[error("data store unavailable: {0}")]
    Unavailable(String),

    /// A single record was refused (duplicate id, dangling parent reference).
    /// Not fatal to a bulk reload.
    #[error("{kind} record '{id}' rejected: {reason}")]
    Rejected {
        kind: EntityKind,
        id: String,
        reason: String,
    },

    /// The backend failed in a way that leaves the store unusable for the
    /// current operation.
    #[error("data store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether this error must abort a bulk operation
    pub fn is_fatal(&self) -> bool {
        !matches!(self, StoreError::Rejected { .. })
    }
}

impl From<sled::Error> for StoreError {
    fn from(e: sled::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

/// Errors surfaced by snapshot, remote store and restore operations
#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),

    #[error("snapshot schema version {found} is newer than the supported version {current}")]
    IncompatibleSchema { current: u32, found: u32 },

    #[error("remote backup location unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("network unavailable: {0}")]
    NetworkUnavailable(String),

    /// Raised after the pre-restore state has already been put back.
    #[error("restore failed, local data was rolled back: {cause}")]
    RestoreFailed {
        #[source]
        cause: Box<Error>,
    },

    /// The restore failed and putting the previous state back failed too.
    /// Local data may be empty or partial.
    #[error(
        "restore failed ({cause}) and rollback failed ({rollback}); local data may be lost, safety snapshot kept at {}",
        .safety_snapshot.display()
    )]
    RollbackFailed {
        #[source]
        cause: Box<Error>,
        rollback: Box<Error>,
        safety_snapshot: PathBuf,
    },

    #[error("backup '{0}' was made by a development build and cannot be restored into a production build")]
    DevBackupOnProdBuild(String),

    #[error("backup not found: {0}")]
    NotFound(String),

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("coordinated file access failed: {0}")]
    Lock(String),

    /// Settings needed for the operation are missing or invalid
    #[error("not configured: {0}")]
    Misconfigured(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True only for the one class where user data may have been lost
    pub fn is_data_loss_risk(&self) -> bool {
        matches!(self, Error::RollbackFailed { .. })
    }

    /// True when the remote medium or the network was not reachable.
    /// These are expected conditions, checked before any I/O.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Error::RemoteUnavailable(_) | Error::NetworkUnavailable(_)
        )
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;
