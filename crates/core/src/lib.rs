//! Core types for the tripvault backup engine
//!
//! This crate provides:
//! - The snapshot data model (journeys and their child collections)
//! - The snapshot codec (portable JSON document with a metadata block)
//! - The data store facade plus in-memory and sled-backed stores
//! - The shared error taxonomy
//! - Atomic file write helpers

pub mod codec;
pub mod datastore;
pub mod error;
pub mod snapshot;
pub mod store;

// Re-exports
pub use codec::SnapshotCodec;
pub use datastore::{DataStore, MemoryStore, CURRENT_SCHEMA_VERSION};
pub use error::{Error, Result, StoreError};
pub use snapshot::{EntityKind, Payload, Record, Snapshot, SnapshotMetadata};
pub use store::{atomic_create, atomic_write, SledStore};
