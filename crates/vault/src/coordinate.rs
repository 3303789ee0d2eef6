//! Coordinated access to files in a shared directory
//!
//! Two layers guard every file:
//! - an in-process async `RwLock` per path, so tasks of this process queue
//!   up without tying up blocking threads
//! - an advisory `flock` on a sidecar lock file, so other processes sharing
//!   the directory respect the same reader/writer discipline
//!
//! Combined with atomic rename on write, a reader never observes a partial
//! file and two writers never interleave bytes into one file.

use dashmap::DashMap;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};
use tv_core::{Error, Result};

/// Name of the sidecar lock directory inside a coordinated directory
pub const LOCK_DIR_NAME: &str = ".locks";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LockMode {
    Shared,
    Exclusive,
}

/// Holds a shared lock on one file until dropped
pub struct ReadGuard {
    _file: FileLock,
    _local: OwnedRwLockReadGuard<()>,
}

/// Holds an exclusive lock on one file until dropped
pub struct WriteGuard {
    lock_path: PathBuf,
    _file: FileLock,
    _local: OwnedRwLockWriteGuard<()>,
}

impl WriteGuard {
    /// Remove the sidecar lock file while still holding it. Used after the
    /// guarded file itself has been deleted.
    pub fn discard_lock_file(&self) {
        let _ = std::fs::remove_file(&self.lock_path);
    }
}

/// Per-file reader/writer coordination for one directory
pub struct FileCoordinator {
    lock_dir: PathBuf,
    local: DashMap<PathBuf, Arc<RwLock<()>>>,
}

impl FileCoordinator {
    /// Coordinate files of `dir`; lock files live in `dir/.locks/`
    pub fn new(dir: &Path) -> Self {
        Self {
            lock_dir: dir.join(LOCK_DIR_NAME),
            local: DashMap::new(),
        }
    }

    /// Acquire shared access to `path`
    pub async fn read(&self, path: &Path) -> Result<ReadGuard> {
        let local = self.local_lock(path).read_owned().await;
        let file = FileLock::acquire(self.lock_path(path)?, LockMode::Shared).await?;
        Ok(ReadGuard {
            _file: file,
            _local: local,
        })
    }

    /// Acquire exclusive access to `path`
    pub async fn write(&self, path: &Path) -> Result<WriteGuard> {
        let local = self.local_lock(path).write_owned().await;
        let lock_path = self.lock_path(path)?;
        let file = FileLock::acquire(lock_path.clone(), LockMode::Exclusive).await?;
        Ok(WriteGuard {
            lock_path,
            _file: file,
            _local: local,
        })
    }

    fn local_lock(&self, path: &Path) -> Arc<RwLock<()>> {
        self.local
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .clone()
    }

    fn lock_path(&self, path: &Path) -> Result<PathBuf> {
        let name = path
            .file_name()
            .ok_or_else(|| Error::Lock(format!("not a file path: {}", path.display())))?;
        let mut lock_name = name.to_os_string();
        lock_name.push(".lock");
        Ok(self.lock_dir.join(lock_name))
    }
}

/// An open sidecar file holding a `flock`; released when the file closes
struct FileLock {
    _file: File,
}

impl FileLock {
    async fn acquire(lock_path: PathBuf, mode: LockMode) -> Result<Self> {
        let file = tokio::task::spawn_blocking(move || -> io::Result<File> {
            if let Some(parent) = lock_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .open(&lock_path)?;
            flock_blocking(&file, mode)?;
            Ok(file)
        })
        .await
        .map_err(|e| Error::Lock(format!("lock task failed: {}", e)))?
        .map_err(|e| Error::Lock(e.to_string()))?;

        Ok(Self { _file: file })
    }
}

/// Block until the advisory lock is granted
#[cfg(unix)]
fn flock_blocking(file: &File, mode: LockMode) -> io::Result<()> {
    use nix::fcntl::{flock, FlockArg};
    use std::os::unix::io::AsRawFd;

    let arg = match mode {
        LockMode::Shared => FlockArg::LockShared,
        LockMode::Exclusive => FlockArg::LockExclusive,
    };
    loop {
        match flock(file.as_raw_fd(), arg) {
            Ok(()) => return Ok(()),
            Err(nix::errno::Errno::EINTR) => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

#[cfg(not(unix))]
fn flock_blocking(_file: &File, _mode: LockMode) -> io::Result<()> {
    // No advisory locking here; in-process coordination still applies
    Ok(())
}
