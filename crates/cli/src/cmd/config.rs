//! Configuration management command
//!
//! Keys are addressed as `section.name`, matching the TOML layout.

use crate::config::{self, Config};
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::Path;
use toml::Value;

/// List the effective configuration (file plus environment)
pub fn run_list(config_path: &Path) -> Result<()> {
    let config = config::load(config_path)?;
    let table = to_table(&config)?;

    println!("{}", "Configuration".bold());
    println!("{}: {}\n", "Location".dimmed(), config_path.display().dimmed());

    for (section, values) in &table {
        println!("{}", format!("[{}]", section).yellow());
        if let Value::Table(values) = values {
            for (key, value) in values {
                println!("  {} = {}", key.cyan(), value);
            }
        }
        println!();
    }

    println!("{}", "Unset paths default to locations under app.data_dir".dimmed());
    Ok(())
}

/// Print one effective value
pub fn run_get(config_path: &Path, key: &str) -> Result<()> {
    let config = config::load(config_path)?;
    let table = to_table(&config)?;
    let (section, name) = split_key(key)?;

    match table.get(section).and_then(|s| s.get(name)) {
        Some(Value::String(s)) => println!("{}", s),
        Some(value) => println!("{}", value),
        None => {
            if is_known_key(key)? {
                println!("{}", "(unset)".dimmed());
            } else {
                anyhow::bail!(
                    "Unknown config key: {}. Use 'tv config list' to see available keys.",
                    key
                );
            }
        }
    }
    Ok(())
}

/// Set one value in the config file. The environment is not consulted, so
/// overrides never leak into the file.
pub fn run_set(config_path: &Path, key: &str, value: &str) -> Result<()> {
    let (section, name) = split_key(key)?;
    if !is_known_key(key)? {
        anyhow::bail!(
            "Unknown config key: {}. Use 'tv config list' to see available keys.",
            key
        );
    }

    let current = config::load_file(config_path)?;
    let mut table = to_table(&current)?;
    let defaults = to_table(&Config::default())?;
    let parsed = parse_value(defaults.get(section).and_then(|s| s.get(name)), value)?;

    let section_table = table
        .entry(section.to_string())
        .or_insert_with(|| Value::Table(toml::map::Map::new()));
    match section_table {
        Value::Table(values) => {
            values.insert(name.to_string(), parsed);
        }
        _ => anyhow::bail!("Section [{}] is not a table", section),
    }

    let updated: Config = Value::Table(table)
        .try_into()
        .with_context(|| format!("Invalid value for {}", key))?;
    updated.validate().context("Invalid configuration value")?;
    config::save(config_path, &updated)?;

    println!("{} {} = {}", "✓".green(), key.cyan(), value);
    println!(
        "{}",
        "Note: Restart 'tv daemon' for changes to take effect".yellow()
    );
    Ok(())
}

/// Show the config file path and optionally create it
pub fn run_path(config_path: &Path, create: bool) -> Result<()> {
    if create && !config_path.exists() {
        config::save(config_path, &Config::default())?;
        println!("{} Created config file at: {}", "✓".green(), config_path.display());
    } else {
        println!("{}", config_path.display());
        if !config_path.exists() {
            println!("{}", "File does not exist. Use --create to create it.".yellow());
        }
    }
    Ok(())
}

pub fn run_example() -> Result<()> {
    println!("{}", config::example_config());
    Ok(())
}

fn to_table(config: &Config) -> Result<toml::map::Map<String, Value>> {
    match Value::try_from(config).context("Failed to serialize configuration")? {
        Value::Table(table) => Ok(table),
        _ => anyhow::bail!("Configuration did not serialize to a table"),
    }
}

fn split_key(key: &str) -> Result<(&str, &str)> {
    key.split_once('.')
        .filter(|(section, name)| !section.is_empty() && !name.is_empty())
        .with_context(|| format!("Config keys look like section.name, got '{}'", key))
}

/// Optional keys are absent from a serialized default, so probe by setting
/// a placeholder and checking it survives a round trip through [`Config`].
fn is_known_key(key: &str) -> Result<bool> {
    let (section, name) = split_key(key)?;
    let defaults = to_table(&Config::default())?;
    if defaults.get(section).and_then(|s| s.get(name)).is_some() {
        return Ok(true);
    }

    let mut probe = defaults;
    if let Some(Value::Table(values)) = probe.get_mut(section) {
        values.insert(name.to_string(), Value::String("probe".to_string()));
    } else {
        return Ok(false);
    }
    let config: Config = match Value::Table(probe).try_into() {
        Ok(config) => config,
        Err(_) => return Ok(false),
    };
    let round_trip = to_table(&config)?;
    Ok(round_trip.get(section).and_then(|s| s.get(name)).is_some())
}

/// Parse `raw` as the same TOML type as the default; strings otherwise
fn parse_value(default: Option<&Value>, raw: &str) -> Result<Value> {
    Ok(match default {
        Some(Value::Integer(_)) => Value::Integer(
            raw.parse()
                .context("Invalid value: must be a non-negative integer")?,
        ),
        Some(Value::Boolean(_)) => Value::Boolean(
            raw.parse()
                .context("Invalid value: must be 'true' or 'false'")?,
        ),
        _ => Value::String(raw.to_string()),
    })
}
