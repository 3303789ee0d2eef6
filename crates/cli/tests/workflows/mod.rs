//! Workflows that exercise several commands against one installation

pub mod backup_restore;
pub mod config_commands;
pub mod export_import;
pub mod guards;
