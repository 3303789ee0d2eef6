//! On-disk data store backed by sled, plus atomic file helpers

use crate::datastore::{check_insert, DataStore, CURRENT_SCHEMA_VERSION};
use crate::error::StoreError;
use crate::snapshot::{EntityKind, Record};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

const META_TREE: &str = "meta";
const SCHEMA_KEY: &[u8] = b"schema_version";

/// Local travel database
///
/// One sled tree per entity collection, keyed by record id:
/// ```text
/// <path>/
///   db            (sled files)
///   trees:
///     meta           schema_version -> u32 (LE)
///     journeys       id -> JSON
///     transports     id -> JSON
///     ...
///     userSettings   "settings" -> JSON
/// ```
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    /// Open or create a store, stamping the current schema version on
    /// first use
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        let meta = db.open_tree(META_TREE)?;
        if meta.get(SCHEMA_KEY)?.is_none() {
            meta.insert(SCHEMA_KEY, CURRENT_SCHEMA_VERSION.to_le_bytes().to_vec())?;
            meta.flush()?;
        }
        Ok(Self { db })
    }

    fn tree(&self, kind: EntityKind) -> Result<sled::Tree, StoreError> {
        Ok(self.db.open_tree(kind.name())?)
    }
}

// Inserts are not flushed one by one; make sure they reach disk before the
// handle goes away.
impl Drop for SledStore {
    fn drop(&mut self) {
        if let Err(e) = self.db.flush() {
            tracing::warn!("Failed to flush store on close: {}", e);
        }
    }
}

impl DataStore for SledStore {
    fn fetch_all(&self, kind: EntityKind) -> Result<Vec<Record>, StoreError> {
        let tree = self.tree(kind)?;
        let mut records = Vec::with_capacity(tree.len());
        for item in tree.iter() {
            let (key, value) = item?;
            let record = Record::from_json(kind, &value).map_err(|e| {
                StoreError::Backend(format!(
                    "corrupt {} row '{}': {}",
                    kind,
                    String::from_utf8_lossy(&key),
                    e
                ))
            })?;
            records.push(record);
        }
        Ok(records)
    }

    fn insert(&self, record: Record) -> Result<(), StoreError> {
        check_insert(&record, |kind, id| {
            Ok(self.tree(kind)?.contains_key(id.as_bytes())?)
        })?;

        let value = record
            .to_json()
            .map_err(|e| StoreError::Backend(format!("failed to serialize record: {}", e)))?;
        self.tree(record.kind())?
            .insert(record.id().as_bytes(), value)?;
        Ok(())
    }

    fn wipe_all(&self) -> Result<(), StoreError> {
        for kind in EntityKind::LOAD_ORDER {
            self.tree(kind)?.clear()?;
        }
        self.db.flush()?;
        Ok(())
    }

    fn current_schema_version(&self) -> Result<u32, StoreError> {
        let meta = self.db.open_tree(META_TREE)?;
        let raw = meta
            .get(SCHEMA_KEY)?
            .ok_or_else(|| StoreError::Backend("schema version missing".to_string()))?;
        let bytes: [u8; 4] = raw
            .as_ref()
            .try_into()
            .map_err(|_| StoreError::Backend("schema version has wrong width".to_string()))?;
        Ok(u32::from_le_bytes(bytes))
    }
}

/// Atomic write helper
///
/// Writes data to a hidden temporary file in the target's directory, fsyncs
/// it, then renames it over the target. Readers see either the old content
/// or the new content, never a prefix.
pub fn atomic_write(target: &Path, data: &[u8]) -> io::Result<()> {
    let tmp = write_temp_sibling(target, data)?;
    tmp.persist(target).map_err(|e| e.error)?;
    sync_parent(target);
    Ok(())
}

/// Like [`atomic_write`] but refuses to replace an existing file
///
/// Fails with [`io::ErrorKind::AlreadyExists`] when `target` exists.
pub fn atomic_create(target: &Path, data: &[u8]) -> io::Result<()> {
    let tmp = write_temp_sibling(target, data)?;
    tmp.persist_noclobber(target).map_err(|e| e.error)?;
    sync_parent(target);
    Ok(())
}

fn write_temp_sibling(target: &Path, data: &[u8]) -> io::Result<tempfile::NamedTempFile> {
    let dir = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".tmp-")
        .suffix(".part")
        .tempfile_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    Ok(tmp)
}

fn sync_parent(target: &Path) {
    #[cfg(unix)]
    {
        if let Some(parent) = target.parent() {
            if let Ok(dir) = File::open(parent) {
                let _ = dir.sync_all();
            }
        }
    }
    #[cfg(not(unix))]
    let _ = target;
}
