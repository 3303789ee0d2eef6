//! Remote backups, retention and the safety-net restore protocol
//!
//! This crate provides:
//! - Coordinated access to a shared backup directory (in-process `RwLock`
//!   plus cross-process `flock`)
//! - The remote backup store and its retention policy
//! - The safety-net restore engine and its local safety snapshots
//! - Local export and the backup service used by the scheduler

pub mod connectivity;
pub mod coordinate;
pub mod export;
pub mod record;
pub mod remote;
pub mod restore;
pub mod retention;
pub mod safety;
pub mod service;

// Re-exports
pub use connectivity::{AlwaysOnline, Connectivity, ManualConnectivity, TcpProbe};
pub use coordinate::FileCoordinator;
pub use export::LocalExporter;
pub use record::{BackupRecord, BuildMode};
pub use remote::RemoteStore;
pub use restore::{RejectedRecord, RestoreEngine, RestorePhase, RestoreReport, SnapshotPreview};
pub use retention::{RetentionPolicy, RetentionReport};
pub use safety::SafetyVault;
pub use service::{BackupOutcome, BackupService};
