//! Local export to a private directory
//!
//! The directory carries a `CACHEDIR.TAG` so backup tools leave it alone.
//! Moving or sharing the exported file is up to the caller.

use chrono::{DateTime, Local, Utc};
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;
use tv_core::{atomic_create, atomic_write, DataStore, Result, SnapshotCodec};

const CACHEDIR_TAG: &str = "CACHEDIR.TAG";
const CACHEDIR_TAG_CONTENT: &str = "Signature: 8a477f597d28d172789f06886806bc55\n\
# This file is a cache directory tag created by tripvault.\n\
# For information about cache directory tags see https://bford.info/cachedir/\n";

/// Writes timestamped snapshot files into one directory
pub struct LocalExporter {
    dir: PathBuf,
    app_name: String,
}

impl LocalExporter {
    pub fn new(dir: impl Into<PathBuf>, app_name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            app_name: app_name.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Capture the store and write it; returns the new file's path
    pub fn export(&self, store: &dyn DataStore, codec: &SnapshotCodec) -> Result<PathBuf> {
        let snapshot = codec.capture(store)?;
        let bytes = SnapshotCodec::encode_snapshot(&snapshot)?;
        self.prepare_dir()?;

        let mut attempt = 1;
        loop {
            let path = self.dir.join(export_file_name(
                &self.app_name,
                snapshot.metadata.created_at,
                attempt,
            ));
            match atomic_create(&path, &bytes) {
                Ok(()) => {
                    info!(
                        path = %path.display(),
                        records = snapshot.payload.record_count(),
                        "Exported snapshot"
                    );
                    return Ok(path);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists && attempt < 100 => {
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn prepare_dir(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let tag = self.dir.join(CACHEDIR_TAG);
        if !tag.exists() {
            atomic_write(&tag, CACHEDIR_TAG_CONTENT.as_bytes())?;
        }
        Ok(())
    }
}

/// `<app>_export_<yyyy-MM-dd_HH-mm-ss>[-N].json`
fn export_file_name(app_name: &str, created_at: DateTime<Utc>, attempt: u32) -> String {
    let stamp = created_at.with_timezone(&Local).format("%Y-%m-%d_%H-%M-%S");
    if attempt <= 1 {
        format!("{}_export_{}.json", app_name, stamp)
    } else {
        format!("{}_export_{}-{}.json", app_name, stamp, attempt)
    }
}
