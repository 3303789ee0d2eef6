//! Scheduler error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("scheduler state I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("scheduler state is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    /// The next trigger could not be registered
    #[error("cannot schedule next backup: {0}")]
    Schedule(String),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
