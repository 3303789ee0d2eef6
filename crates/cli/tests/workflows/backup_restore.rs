//! tv backup / list / restore / delete / prune

use crate::common::TestVault;
use crate::tv;
use anyhow::Result;

#[test]
fn test_backup_list_and_restore() -> Result<()> {
    let vault = TestVault::new()?;
    vault.seed(&["j1", "j2"])?;

    let result = tv!(vault.config_path(), "list").assert_success()?;
    assert!(result.contains_stdout("No backups"));

    tv!(vault.config_path(), "backup").assert_success()?;
    let files = vault.backup_files()?;
    assert_eq!(files.len(), 1);
    assert!(files[0].starts_with("tripvault_backup_"));
    assert!(!files[0].contains("_dev"));

    let result = tv!(vault.config_path(), "list").assert_success()?;
    assert!(result.contains_stdout(&files[0]));
    assert!(result.contains_stdout("test-device"));

    vault.seed(&["j3"])?;
    let result = tv!(vault.config_path(), "restore", &files[0], "-y").assert_success()?;
    assert!(result.contains_stdout("Restored"));
    assert_eq!(vault.journey_ids()?, vec!["j1", "j2"]);
    Ok(())
}

#[test]
fn test_retention_keeps_newest() -> Result<()> {
    let vault = TestVault::new()?;
    vault.write_config("prod", 2)?;
    vault.seed(&["j1"])?;

    for _ in 0..4 {
        tv!(vault.config_path(), "backup").assert_success()?;
    }
    assert_eq!(vault.backup_files()?.len(), 2);

    let result = tv!(vault.config_path(), "prune").assert_success()?;
    assert!(result.contains_stdout("Nothing to prune"));
    Ok(())
}

#[test]
fn test_delete_one_and_all() -> Result<()> {
    let vault = TestVault::new()?;
    vault.seed(&["j1"])?;
    for _ in 0..3 {
        tv!(vault.config_path(), "backup").assert_success()?;
    }
    let files = vault.backup_files()?;
    assert_eq!(files.len(), 3);

    tv!(vault.config_path(), "delete", &files[0], "-y").assert_success()?;
    assert_eq!(vault.backup_files()?.len(), 2);

    tv!(vault.config_path(), "delete", "--all")
        .stdin("no\n")
        .assert_success()?;
    assert_eq!(vault.backup_files()?.len(), 2);

    let result = tv!(vault.config_path(), "delete", "--all", "-y").assert_success()?;
    assert!(result.contains_stdout("Deleted 2 backups"));
    assert!(vault.backup_files()?.is_empty());

    let result = tv!(vault.config_path(), "delete", "missing.json", "-y").assert_failure()?;
    assert!(result.contains_stderr("not found"));
    Ok(())
}

#[test]
fn test_automatic_backup_state() -> Result<()> {
    let vault = TestVault::new()?;

    let result = tv!(vault.config_path(), "auto", "status").assert_success()?;
    assert!(result.contains_stdout("Disabled"));

    tv!(vault.config_path(), "auto", "enable").assert_success()?;
    let result = tv!(vault.config_path(), "auto", "status").assert_success()?;
    assert!(result.contains_stdout("Enabled"));
    assert!(result.contains_stdout("never"));

    let result = tv!(vault.config_path(), "retry").assert_success()?;
    assert!(result.contains_stdout("No automatic backup is pending"));

    tv!(vault.config_path(), "auto", "disable").assert_success()?;
    let state = std::fs::read_to_string(vault.data_dir().join("scheduler.json"))?;
    let state: serde_json::Value = serde_json::from_str(&state)?;
    assert_eq!(state["enabled"], false);
    Ok(())
}
