//! tv config

use crate::common::cli::TvCommand;
use crate::tv;
use anyhow::Result;
use tempfile::TempDir;

#[test]
fn test_path_create_then_set_and_get() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config_path = temp_dir.path().join("nested").join("config.toml");

    let result = tv!(&config_path, "config", "path").assert_success()?;
    assert!(result.contains_stdout("does not exist"));

    tv!(&config_path, "config", "path", "--create").assert_success()?;
    assert!(config_path.exists());

    tv!(&config_path, "config", "set", "retention.max_count", "3").assert_success()?;
    let result = tv!(&config_path, "config", "get", "retention.max_count").assert_success()?;
    assert_eq!(result.stdout.trim(), "3");

    let result = tv!(&config_path, "config", "get", "remote.probe_host").assert_success()?;
    assert!(result.contains_stdout("unset"));
    Ok(())
}

#[test]
fn test_set_rejects_bad_values() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config_path = temp_dir.path().join("config.toml");

    tv!(&config_path, "config", "set", "retention.max_count", "0").assert_failure()?;
    tv!(&config_path, "config", "set", "remote.probe_timeout_ms", "5").assert_failure()?;
    let result = tv!(&config_path, "config", "set", "retention.forever", "1").assert_failure()?;
    assert!(result.contains_stderr("Unknown config key"));
    assert!(!config_path.exists());
    Ok(())
}

#[test]
fn test_environment_overrides_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config_path = temp_dir.path().join("config.toml");
    tv!(&config_path, "config", "set", "retention.max_count", "4").assert_success()?;

    let mut cmd = TvCommand::new(&config_path);
    cmd.args(&["config", "get", "retention.max_count"])
        .env("TRIPVAULT__RETENTION__MAX_COUNT", "8");
    let result = cmd.assert_success()?;
    assert_eq!(result.stdout.trim(), "8");
    Ok(())
}

#[test]
fn test_example_is_printed() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let result = tv!(temp_dir.path().join("config.toml"), "config", "example").assert_success()?;
    assert!(result.contains_stdout("[retention]"));
    assert!(result.contains_stdout("max_count = 5"));
    Ok(())
}
