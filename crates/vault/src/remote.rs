//! Remote backup directory shared by several devices or processes
//!
//! Layout of the remote directory:
//! ```text
//! <remote>/
//!   tripvault_backup_2024-07-03_12-00-05.json
//!   tripvault_backup_dev_2024-07-04_08-15-00.json
//!   .locks/
//!     tripvault_backup_2024-07-03_12-00-05.json.lock
//! ```
//! Every operation first checks that the medium is mounted and that the
//! network answers, then runs under an I/O timeout.

use crate::connectivity::Connectivity;
use crate::coordinate::FileCoordinator;
use crate::record::{backup_file_name, is_backup_file_name, BackupRecord, BuildMode};
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use tv_core::{atomic_create, Error, Result, SnapshotCodec};

/// Default bound on a single remote operation
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(60);

/// How many names to try when several backups land in the same second
const MAX_NAME_ATTEMPTS: u32 = 100;

/// Metadata reads in flight while listing
const LIST_CONCURRENCY: usize = 4;

/// Dated snapshot files in a shared directory
pub struct RemoteStore {
    dir: PathBuf,
    mount_root: PathBuf,
    app_name: String,
    build_mode: BuildMode,
    io_timeout: Duration,
    connectivity: Arc<dyn Connectivity>,
    coordinator: FileCoordinator,
}

impl RemoteStore {
    /// Remote store rooted at `dir`. The parent of `dir` must exist for the
    /// medium to count as mounted (override with [`with_mount_root`]).
    ///
    /// [`with_mount_root`]: RemoteStore::with_mount_root
    pub fn new(dir: impl Into<PathBuf>, connectivity: Arc<dyn Connectivity>) -> Self {
        let dir = dir.into();
        let mount_root = dir
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| dir.clone());
        let coordinator = FileCoordinator::new(&dir);

        Self {
            dir,
            mount_root,
            app_name: "tripvault".to_string(),
            build_mode: BuildMode::current(),
            io_timeout: DEFAULT_IO_TIMEOUT,
            connectivity,
            coordinator,
        }
    }

    pub fn with_mount_root(mut self, mount_root: impl Into<PathBuf>) -> Self {
        self.mount_root = mount_root.into();
        self
    }

    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    pub fn with_build_mode(mut self, build_mode: BuildMode) -> Self {
        self.build_mode = build_mode;
        self
    }

    pub fn with_io_timeout(mut self, io_timeout: Duration) -> Self {
        self.io_timeout = io_timeout;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn build_mode(&self) -> BuildMode {
        self.build_mode
    }

    /// Fail fast when the medium or the network is not reachable
    pub async fn ensure_available(&self) -> Result<()> {
        match tokio::fs::metadata(&self.mount_root).await {
            Ok(meta) if meta.is_dir() => {}
            _ => {
                return Err(Error::RemoteUnavailable(format!(
                    "{} is not mounted",
                    self.mount_root.display()
                )))
            }
        }

        self.connectivity
            .check()
            .await
            .map_err(Error::NetworkUnavailable)
    }

    /// Write a new snapshot file and describe it
    pub async fn create(&self, snapshot: &[u8]) -> Result<BackupRecord> {
        self.ensure_available().await?;
        self.bounded(self.create_inner(snapshot)).await
    }

    /// Every readable backup of this app, newest first
    pub async fn list(&self) -> Result<Vec<BackupRecord>> {
        self.ensure_available().await?;
        self.bounded(self.list_inner()).await
    }

    /// Look up one backup by file name
    pub async fn find(&self, file_name: &str) -> Result<BackupRecord> {
        self.list()
            .await?
            .into_iter()
            .find(|r| r.file_name == file_name)
            .ok_or_else(|| Error::NotFound(file_name.to_string()))
    }

    /// Read a backup's bytes under shared access
    pub async fn read(&self, record: &BackupRecord) -> Result<Vec<u8>> {
        self.ensure_available().await?;
        self.bounded(async {
            let _guard = self.coordinator.read(&record.path).await?;
            tokio::fs::read(&record.path).await.map_err(|e| {
                if e.kind() == io::ErrorKind::NotFound {
                    Error::NotFound(record.file_name.clone())
                } else {
                    Error::Io(e)
                }
            })
        })
        .await
    }

    /// Delete one backup. A file that is already gone is not an error.
    pub async fn delete(&self, record: &BackupRecord) -> Result<()> {
        self.ensure_available().await?;
        self.bounded(self.delete_inner(record)).await
    }

    /// Delete every listed backup; returns how many were removed
    pub async fn delete_all(&self) -> Result<usize> {
        let records = self.list().await?;
        for record in &records {
            self.delete(record).await?;
        }
        if !records.is_empty() {
            info!("Deleted {} remote backups", records.len());
        }
        Ok(records.len())
    }

    async fn bounded<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.io_timeout, fut)
            .await
            .map_err(|_| Error::Timeout(self.io_timeout))?
    }

    async fn create_inner(&self, snapshot: &[u8]) -> Result<BackupRecord> {
        let metadata = SnapshotCodec::peek_metadata(snapshot)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        for attempt in 1..=MAX_NAME_ATTEMPTS {
            let file_name =
                backup_file_name(&self.app_name, self.build_mode, metadata.created_at, attempt);
            let path = self.dir.join(&file_name);

            let guard = self.coordinator.write(&path).await?;
            let bytes = snapshot.to_vec();
            let target = path.clone();
            let written = tokio::task::spawn_blocking(move || atomic_create(&target, &bytes))
                .await
                .map_err(|e| Error::Io(io::Error::new(io::ErrorKind::Other, e)))?;
            drop(guard);

            match written {
                Ok(()) => {
                    info!(file = %file_name, size = snapshot.len(), "Created remote backup");
                    return Ok(BackupRecord {
                        file_name,
                        path,
                        created_at: metadata.created_at,
                        size_bytes: snapshot.len() as u64,
                        device_name: metadata.device_name,
                        app_version: metadata.app_version,
                        schema_version: metadata.schema_version,
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    debug!(file = %file_name, "Backup name taken, trying next");
                }
                Err(e) => return Err(Error::Io(e)),
            }
        }

        Err(Error::Io(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "no free backup file name",
        )))
    }

    async fn list_inner(&self) -> Result<Vec<BackupRecord>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::Io(e)),
        };

        let mut candidates = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name().to_string_lossy().to_string();
            if is_backup_file_name(&self.app_name, &file_name) && entry.file_type().await?.is_file()
            {
                candidates.push((file_name, entry.path()));
            }
        }

        let mut records: Vec<BackupRecord> = stream::iter(candidates)
            .map(|(file_name, path)| self.describe(file_name, path))
            .buffer_unordered(LIST_CONCURRENCY)
            .filter_map(|record| async move { record })
            .collect()
            .await;

        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.file_name.cmp(&a.file_name))
        });
        Ok(records)
    }

    /// Read one file's metadata; `None` (with a warning) if unreadable
    async fn describe(&self, file_name: String, path: PathBuf) -> Option<BackupRecord> {
        let read = async {
            let _guard = self.coordinator.read(&path).await?;
            let bytes = tokio::fs::read(&path).await?;
            let metadata = SnapshotCodec::peek_metadata(&bytes)?;
            Ok::<_, Error>((bytes.len() as u64, metadata))
        };

        match read.await {
            Ok((size_bytes, metadata)) => Some(BackupRecord {
                file_name,
                path,
                created_at: metadata.created_at,
                size_bytes,
                device_name: metadata.device_name,
                app_version: metadata.app_version,
                schema_version: metadata.schema_version,
            }),
            Err(e) => {
                warn!(file = %file_name, "Skipping unreadable backup: {}", e);
                None
            }
        }
    }

    async fn delete_inner(&self, record: &BackupRecord) -> Result<()> {
        let guard = self.coordinator.write(&record.path).await?;
        match tokio::fs::remove_file(&record.path).await {
            Ok(()) => {
                info!(file = %record.file_name, "Deleted remote backup");
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(file = %record.file_name, "Backup already gone");
            }
            Err(e) => return Err(Error::Io(e)),
        }
        guard.discard_lock_file();
        Ok(())
    }
}
