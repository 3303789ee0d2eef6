//! Automatic daily backups
//!
//! The scheduler owns no global state: the backup job and the state store
//! are injected. The persisted [`SchedulerState`] is re-read before each
//! change and before each trigger fires, so `tv auto disable` from another
//! process stops a running daemon.

pub mod error;
pub mod job;
pub mod scheduler;
pub mod state;
pub mod trigger;

pub use error::{Result, SchedulerError};
pub use job::BackupJob;
pub use scheduler::{BackupAttempt, BackupScheduler};
pub use state::{JsonStateFile, MemoryStateStore, SchedulerState, StateStore};
pub use trigger::Trigger;
