//! End-to-end scenarios across remote store, retention and restore

pub mod availability;
pub mod backup_cycle;
pub mod restore_rollback;
pub mod retention;
