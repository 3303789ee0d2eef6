//! Local safety snapshots taken before every destructive restore
//!
//! Files are named `safety_<ULID>.json`, so lexical order is creation order.
//! The directory is private to this process and needs no coordination.

use parking_lot::Mutex;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use tv_core::{atomic_create, Error, Result};
use ulid::{Generator, Ulid};

const PREFIX: &str = "safety_";
const SUFFIX: &str = ".json";

/// Capped directory of pre-restore snapshots
pub struct SafetyVault {
    dir: PathBuf,
    keep: usize,
    ids: Mutex<Generator>,
}

impl SafetyVault {
    pub fn new(dir: impl Into<PathBuf>, keep: usize) -> Self {
        Self {
            dir: dir.into(),
            keep: keep.max(1),
            ids: Mutex::new(Generator::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist a snapshot; returns its path
    pub fn store(&self, snapshot: &[u8]) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;

        let id = self
            .ids
            .lock()
            .generate()
            .unwrap_or_else(|_| Ulid::new());
        let path = self.dir.join(format!("{}{}{}", PREFIX, id, SUFFIX));
        atomic_create(&path, snapshot)?;

        debug!(path = %path.display(), "Stored safety snapshot");
        Ok(path)
    }

    /// Safety snapshots, newest first
    pub fn list(&self) -> Result<Vec<PathBuf>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::Io(e)),
        };

        let mut found: Vec<(Ulid, PathBuf)> = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(id) = parse_id(&name) {
                found.push((id, entry.path()));
            }
        }

        found.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(found.into_iter().map(|(_, path)| path).collect())
    }

    /// Most recent safety snapshot, if any
    pub fn latest(&self) -> Result<Option<PathBuf>> {
        Ok(self.list()?.into_iter().next())
    }

    /// Drop everything beyond the newest `keep`; returns how many were removed
    pub fn prune(&self) -> Result<usize> {
        let mut removed = 0;
        for path in self.list()?.into_iter().skip(self.keep) {
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => warn!(path = %path.display(), "Could not prune safety snapshot: {}", e),
            }
        }
        Ok(removed)
    }
}

fn parse_id(file_name: &str) -> Option<Ulid> {
    let id = file_name.strip_prefix(PREFIX)?.strip_suffix(SUFFIX)?;
    Ulid::from_string(id).ok()
}
