//! tv export / tv import

use crate::common::TestVault;
use crate::tv;
use anyhow::Result;

#[test]
fn test_export_then_import_replaces_data() -> Result<()> {
    let vault = TestVault::new()?;
    vault.seed(&["j1"])?;

    let out = vault.root().join("exports");
    let out_arg = out.to_string_lossy().to_string();
    let result = tv!(vault.config_path(), "export", "--out", &out_arg).assert_success()?;
    assert!(result.contains_stdout("Exported to"));

    let exported: Vec<_> = std::fs::read_dir(&out)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().map(|x| x == "json").unwrap_or(false))
        .collect();
    assert_eq!(exported.len(), 1);
    assert!(out.join("CACHEDIR.TAG").exists());

    vault.seed(&["j2"])?;
    assert_eq!(vault.journey_ids()?, vec!["j1", "j2"]);

    let file = exported[0].to_string_lossy().to_string();
    let result = tv!(vault.config_path(), "import", &file, "-y").assert_success()?;
    assert!(result.contains_stdout("Restored"));
    assert_eq!(vault.journey_ids()?, vec!["j1"]);

    // Pre-import state kept as a safety snapshot
    let safety: Vec<_> = std::fs::read_dir(vault.data_dir().join("safety"))?.collect();
    assert_eq!(safety.len(), 1);
    Ok(())
}

#[test]
fn test_declined_import_changes_nothing() -> Result<()> {
    let vault = TestVault::new()?;
    vault.seed(&["j1"])?;

    let out = vault.root().join("exports");
    let out_arg = out.to_string_lossy().to_string();
    tv!(vault.config_path(), "export", "--out", &out_arg).assert_success()?;
    vault.seed(&["j2"])?;

    let file = std::fs::read_dir(&out)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .find(|p| p.extension().map(|x| x == "json").unwrap_or(false))
        .expect("export written");

    let result = tv!(vault.config_path(), "import", file.to_str().unwrap())
        .stdin("n\n")
        .assert_success()?;
    assert!(result.contains_stdout("cancelled"));
    assert_eq!(vault.journey_ids()?, vec!["j1", "j2"]);
    Ok(())
}

#[test]
fn test_truncated_file_is_rejected_before_any_change() -> Result<()> {
    let vault = TestVault::new()?;
    vault.seed(&["j1"])?;

    let file = vault.root().join("broken.json");
    std::fs::write(&file, br#"{"metadata":{"createdAt":"2024-01-01T00:00:00Z","#)?;

    let result = tv!(vault.config_path(), "import", file.to_str().unwrap(), "-y")
        .assert_failure()?;
    assert!(result.contains_stderr("malformed snapshot"));
    assert_eq!(vault.journey_ids()?, vec!["j1"]);
    assert!(!vault.data_dir().join("safety").exists());
    Ok(())
}
