//! Layered configuration: built-in defaults, then `config.toml`, then
//! `TRIPVAULT__<SECTION>__<KEY>` environment variables.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use vault::BuildMode;

const APP_DIR: &str = "tripvault";
const ENV_PREFIX: &str = "TRIPVAULT";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub app: AppSection,
    pub store: StoreSection,
    pub remote: RemoteSection,
    pub retention: RetentionSection,
    pub safety: SafetySection,
    pub export: ExportSection,
    pub scheduler: SchedulerSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSection {
    /// Prefix of backup and export file names
    pub name: String,
    pub device_name: String,
    pub build_mode: BuildMode,
    /// Root for locks, logs and every path left unset below
    pub data_dir: PathBuf,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: APP_DIR.to_string(),
            device_name: default_device_name(),
            build_mode: BuildMode::current(),
            data_dir: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSection {
    /// Shared backup directory; remote commands need it
    pub dir: Option<PathBuf>,
    /// Must exist for the medium to count as mounted (default: parent of `dir`)
    pub mount_root: Option<PathBuf>,
    /// `host:port` probed before remote I/O; unset means always online
    pub probe_host: Option<String>,
    pub probe_timeout_ms: u64,
    pub io_timeout_secs: u64,
}

impl Default for RemoteSection {
    fn default() -> Self {
        Self {
            dir: None,
            mount_root: None,
            probe_host: None,
            probe_timeout_ms: 3000,
            io_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionSection {
    pub max_age_days: u32,
    pub max_count: usize,
}

impl Default for RetentionSection {
    fn default() -> Self {
        Self {
            max_age_days: 30,
            max_count: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetySection {
    pub dir: Option<PathBuf>,
    pub keep: usize,
}

impl Default for SafetySection {
    fn default() -> Self {
        Self { dir: None, keep: 5 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSection {
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSection {
    pub state_path: Option<PathBuf>,
    /// `midnight` or an interval in seconds
    pub trigger: String,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            state_path: None,
            trigger: "midnight".to_string(),
        }
    }
}

impl Config {
    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.app.name.trim().is_empty() {
            anyhow::bail!("app.name must not be empty");
        }
        if self.retention.max_count < 1 {
            anyhow::bail!("retention.max_count must be at least 1");
        }
        if self.retention.max_age_days < 1 {
            anyhow::bail!("retention.max_age_days must be at least 1");
        }
        if self.safety.keep < 1 {
            anyhow::bail!("safety.keep must be at least 1");
        }
        if !(100..=60_000).contains(&self.remote.probe_timeout_ms) {
            anyhow::bail!("remote.probe_timeout_ms must be between 100 and 60000");
        }
        if self.remote.io_timeout_secs < 1 {
            anyhow::bail!("remote.io_timeout_secs must be at least 1");
        }
        self.scheduler
            .trigger
            .parse::<scheduler::Trigger>()
            .map_err(|e| anyhow::anyhow!("scheduler.trigger: {}", e))?;
        Ok(())
    }

    pub fn store_path(&self) -> PathBuf {
        self.store
            .path
            .clone()
            .unwrap_or_else(|| self.app.data_dir.join("store"))
    }

    pub fn safety_dir(&self) -> PathBuf {
        self.safety
            .dir
            .clone()
            .unwrap_or_else(|| self.app.data_dir.join("safety"))
    }

    pub fn export_dir(&self) -> PathBuf {
        self.export
            .dir
            .clone()
            .unwrap_or_else(|| self.app.data_dir.join("exports"))
    }

    pub fn state_path(&self) -> PathBuf {
        self.scheduler
            .state_path
            .clone()
            .unwrap_or_else(|| self.app.data_dir.join("scheduler.json"))
    }

    pub fn locks_dir(&self) -> PathBuf {
        self.app.data_dir.join("locks")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.app.data_dir.join("logs")
    }

    pub fn remote_dir(&self) -> Result<&Path> {
        self.remote
            .dir
            .as_deref()
            .context("remote.dir is not configured (see 'tv config set remote.dir <path>')")
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.remote.probe_timeout_ms)
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.remote.io_timeout_secs)
    }

    pub fn trigger(&self) -> Result<scheduler::Trigger> {
        self.scheduler
            .trigger
            .parse()
            .map_err(|e| anyhow::anyhow!("scheduler.trigger: {}", e))
    }
}

/// Default location of the config file
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
}

/// Resolve `--config`, falling back to the default location
pub fn config_file_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => default_config_path().context("Could not determine config directory"),
    }
}

/// Load defaults, the file (if present) and the environment, then validate
pub fn load(path: &Path) -> Result<Config> {
    let settings = ::config::Config::builder()
        .add_source(::config::File::from(path).required(false))
        .add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .with_context(|| format!("Failed to read configuration from {}", path.display()))?;

    let config: Config = settings
        .try_deserialize()
        .context("Invalid configuration")?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Load only what the file says (no environment), for editing
pub fn load_file(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Write the whole config back to `path`
pub fn save(path: &Path, config: &Config) -> Result<()> {
    config.validate()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
    }
    let text = toml::to_string_pretty(config).context("Failed to serialize configuration")?;
    tv_core::atomic_write(path, text.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Annotated example configuration
pub fn example_config() -> &'static str {
    r#"# tripvault configuration
# Every key can be overridden with TRIPVAULT__<SECTION>__<KEY>, e.g.
#   TRIPVAULT__REMOTE__DIR=/mnt/cloud/tripvault

[app]
name = "tripvault"
device_name = "my-laptop"
build_mode = "prod"            # dev | prod
# data_dir = "~/.local/share/tripvault"

[store]
# path = "<data_dir>/store"

[remote]
dir = "/mnt/cloud/tripvault"
# mount_root = "/mnt/cloud"    # default: parent of dir
# probe_host = "cloud.example.com:443"
probe_timeout_ms = 3000        # 100-60000
io_timeout_secs = 60

[retention]
max_age_days = 30
max_count = 5

[safety]
# dir = "<data_dir>/safety"
keep = 5

[export]
# dir = "<data_dir>/exports"

[scheduler]
# state_path = "<data_dir>/scheduler.json"
trigger = "midnight"           # midnight | seconds between backups
"#
}

fn default_device_name() -> String {
    #[cfg(unix)]
    {
        if let Ok(name) = nix::unistd::gethostname() {
            let name = name.to_string_lossy().to_string();
            if !name.is_empty() {
                return name;
            }
        }
    }
    "unknown-device".to_string()
}
