//! Single-instance lock for the scheduler daemon

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Held while `tv daemon` runs
pub struct SchedulerLock {
    path: PathBuf,
    #[allow(dead_code)]
    file: File,
}

/// Who holds the lock
#[derive(Debug, Serialize, Deserialize)]
pub struct LockOwner {
    pub pid: u32,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl SchedulerLock {
    /// Take the lock under `locks_dir`, clearing it if its owner died
    pub fn acquire(locks_dir: &Path) -> Result<Self> {
        let lock_path = lock_path(locks_dir);
        std::fs::create_dir_all(locks_dir).context("Failed to create locks directory")?;

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .context("Failed to open lock file")?;

        if !try_flock_exclusive(&file)? {
            match read_owner(&mut file) {
                Ok(owner) if is_process_alive(owner.pid) => {
                    anyhow::bail!("Scheduler already running (pid {})", owner.pid);
                }
                _ => {
                    tracing::warn!(path = %lock_path.display(), "Removing stale scheduler lock");
                    drop(file);
                    std::fs::remove_file(&lock_path)?;
                    return Self::acquire(locks_dir);
                }
            }
        }

        write_owner(&mut file)?;
        Ok(Self {
            path: lock_path,
            file,
        })
    }

    /// Owner of a live lock, if any
    pub fn holder(locks_dir: &Path) -> Option<LockOwner> {
        let mut file = File::open(lock_path(locks_dir)).ok()?;
        let owner = read_owner(&mut file).ok()?;
        is_process_alive(owner.pid).then_some(owner)
    }

    pub fn release(self) -> Result<()> {
        std::fs::remove_file(&self.path).context("Failed to remove lock file")?;
        Ok(())
    }
}

impl Drop for SchedulerLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

fn lock_path(locks_dir: &Path) -> PathBuf {
    locks_dir.join("scheduler.lock")
}

fn write_owner(file: &mut File) -> Result<()> {
    let owner = LockOwner {
        pid: std::process::id(),
        started_at: chrono::Utc::now(),
    };
    let serialized = serde_json::to_string(&owner).context("Failed to serialize lock owner")?;

    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(serialized.as_bytes())?;
    file.sync_all()?;
    Ok(())
}

fn read_owner(file: &mut File) -> Result<LockOwner> {
    file.seek(SeekFrom::Start(0))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    serde_json::from_str(&contents).context("Failed to parse lock owner")
}

#[cfg(unix)]
fn try_flock_exclusive(file: &File) -> Result<bool> {
    use nix::fcntl::{flock, FlockArg};
    use std::os::unix::io::AsRawFd;

    match flock(file.as_raw_fd(), FlockArg::LockExclusiveNonblock) {
        Ok(_) => Ok(true),
        Err(nix::errno::Errno::EWOULDBLOCK) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(not(unix))]
fn try_flock_exclusive(_file: &File) -> Result<bool> {
    Ok(true)
}

#[cfg(target_os = "linux")]
fn is_process_alive(pid: u32) -> bool {
    Path::new(&format!("/proc/{}", pid)).exists()
}

#[cfg(all(unix, not(target_os = "linux")))]
fn is_process_alive(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    // Signal 0 probes existence
    match kill(Pid::from_raw(pid as i32), None) {
        Ok(_) => true,
        Err(nix::errno::Errno::ESRCH) => false,
        Err(_) => true,
    }
}

#[cfg(not(unix))]
fn is_process_alive(_pid: u32) -> bool {
    true
}
