//! CLI command implementations

pub mod auto;
pub mod backup;
pub mod config;
pub mod daemon;
pub mod delete;
pub mod export;
pub mod import;
pub mod list;
pub mod prune;
pub mod restore;
pub mod retry;
pub mod status;
