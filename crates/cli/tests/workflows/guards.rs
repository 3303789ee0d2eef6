//! Build-mode isolation and unavailable remotes

use crate::common::TestVault;
use crate::tv;
use anyhow::Result;

#[test]
fn test_dev_backup_refused_by_prod_build() -> Result<()> {
    let vault = TestVault::with_build_mode("dev")?;
    vault.seed(&["j1"])?;
    tv!(vault.config_path(), "backup").assert_success()?;

    let files = vault.backup_files()?;
    assert_eq!(files.len(), 1);
    assert!(files[0].starts_with("tripvault_backup_dev_"));

    vault.write_config("prod", 5)?;
    vault.seed(&["j2"])?;
    let result = tv!(vault.config_path(), "restore", &files[0], "-y").assert_failure()?;
    assert!(result.contains_stderr("development build"));
    assert_eq!(vault.journey_ids()?, vec!["j1", "j2"]);

    // A dev build may restore it
    vault.write_config("dev", 5)?;
    tv!(vault.config_path(), "restore", &files[0], "-y").assert_success()?;
    assert_eq!(vault.journey_ids()?, vec!["j1"]);
    Ok(())
}

#[test]
fn test_unmounted_remote_fails_without_side_effects() -> Result<()> {
    let vault = TestVault::new()?;
    vault.seed(&["j1"])?;
    std::fs::remove_dir_all(vault.root().join("cloud"))?;

    let result = tv!(vault.config_path(), "backup").assert_failure()?;
    assert!(result.contains_stderr("unavailable"));
    tv!(vault.config_path(), "list").assert_failure()?;
    tv!(vault.config_path(), "prune").assert_failure()?;
    assert!(!vault.root().join("cloud").exists());
    Ok(())
}

#[test]
fn test_remote_commands_need_a_remote() -> Result<()> {
    let vault = TestVault::new()?;
    std::fs::write(
        vault.config_path(),
        format!(
            "[app]\ndata_dir = \"{}\"\n",
            vault.data_dir().display()
        ),
    )?;

    let result = tv!(vault.config_path(), "backup").assert_failure()?;
    assert!(result.contains_stderr("remote.dir is not configured"));

    let result = tv!(vault.config_path(), "status").assert_success()?;
    assert!(result.contains_stdout("Not configured"));
    Ok(())
}
