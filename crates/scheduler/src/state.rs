//! Persisted automatic-backup state

use crate::error::Result;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use tv_core::atomic_write;

/// Survives restarts; shared by the daemon and interactive commands
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerState {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, rename = "lastAutomaticBackupDate")]
    pub last_automatic_backup: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_attempt: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pending_retry: bool,
}

/// Load/save boundary for [`SchedulerState`]
pub trait StateStore: Send + Sync {
    fn load(&self) -> Result<SchedulerState>;
    fn save(&self, state: &SchedulerState) -> Result<()>;
}

/// State kept as a small JSON file, replaced atomically on save
pub struct JsonStateFile {
    path: PathBuf,
}

impl JsonStateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for JsonStateFile {
    fn load(&self) -> Result<SchedulerState> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(SchedulerState::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, state: &SchedulerState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec_pretty(state)?;
        atomic_write(&self.path, &bytes)?;
        Ok(())
    }
}

/// Volatile state, for tests and one-shot runs
#[derive(Default)]
pub struct MemoryStateStore {
    state: Mutex<SchedulerState>,
}

impl MemoryStateStore {
    pub fn new(state: SchedulerState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> Result<SchedulerState> {
        Ok(self.state.lock().clone())
    }

    fn save(&self, state: &SchedulerState) -> Result<()> {
        *self.state.lock() = state.clone();
        Ok(())
    }
}
