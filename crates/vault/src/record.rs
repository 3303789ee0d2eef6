//! Backup file naming and the records describing persisted snapshots

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// File name marker separating development backups from production ones
pub const DEV_MARKER: &str = "_dev";

/// Which kind of build produced (or is restoring) a backup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    Dev,
    Prod,
}

impl BuildMode {
    /// Mode of the running binary
    pub fn current() -> Self {
        if cfg!(debug_assertions) {
            BuildMode::Dev
        } else {
            BuildMode::Prod
        }
    }

    pub fn is_dev(&self) -> bool {
        matches!(self, BuildMode::Dev)
    }
}

impl std::str::FromStr for BuildMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dev" => Ok(BuildMode::Dev),
            "prod" => Ok(BuildMode::Prod),
            other => Err(format!("unknown build mode '{}' (expected dev or prod)", other)),
        }
    }
}

/// `<app>_backup[_dev]_<yyyy-MM-dd_HH-mm-ss>[-N].json`
///
/// The timestamp uses the local clock; ordering of backups never relies on
/// it (the snapshot metadata carries the authoritative creation time).
pub fn backup_file_name(
    app_name: &str,
    mode: BuildMode,
    created_at: DateTime<Utc>,
    attempt: u32,
) -> String {
    let marker = if mode.is_dev() { DEV_MARKER } else { "" };
    let stamp = created_at.with_timezone(&Local).format("%Y-%m-%d_%H-%M-%S");
    if attempt <= 1 {
        format!("{}_backup{}_{}.json", app_name, marker, stamp)
    } else {
        format!("{}_backup{}_{}-{}.json", app_name, marker, stamp, attempt)
    }
}

/// Whether a file name belongs to this app's backups
pub fn is_backup_file_name(app_name: &str, file_name: &str) -> bool {
    file_name.starts_with(&format!("{}_backup_", app_name)) && file_name.ends_with(".json")
}

/// Whether a backup file name carries the development marker
pub fn is_dev_file_name(file_name: &str) -> bool {
    file_name.contains(&format!("_backup{}_", DEV_MARKER))
}

/// Metadata describing one snapshot file in the remote directory
///
/// Computed on demand from the snapshot's metadata block plus file system
/// attributes; never stored on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupRecord {
    pub file_name: String,
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
    pub size_bytes: u64,
    pub device_name: String,
    pub app_version: String,
    pub schema_version: u32,
}

impl BackupRecord {
    /// Made by a development build
    pub fn is_dev(&self) -> bool {
        is_dev_file_name(&self.file_name)
    }

    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.created_at
    }
}
