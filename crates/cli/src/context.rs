//! Builds the engine components from a loaded [`Config`]

use crate::config::Config;
use anyhow::{Context, Result};
use async_trait::async_trait;
use scheduler::{BackupJob, BackupScheduler, JsonStateFile};
use std::sync::Arc;
use tv_core::{DataStore, SledStore, SnapshotCodec};
use vault::{
    AlwaysOnline, BackupService, Connectivity, LocalExporter, RemoteStore, RestoreEngine,
    RetentionPolicy, SafetyVault, TcpProbe,
};

pub struct AppContext {
    pub config: Config,
}

impl AppContext {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn codec(&self) -> SnapshotCodec {
        SnapshotCodec::new(env!("CARGO_PKG_VERSION"), &self.config.app.device_name)
    }

    /// Open the local travel database. Sled allows one process at a time,
    /// so only commands that need the data call this.
    pub fn open_store(&self) -> Result<Arc<dyn DataStore>> {
        let path = self.config.store_path();
        std::fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create store directory {}", path.display()))?;
        let store = SledStore::open(&path).with_context(|| {
            format!(
                "Failed to open store at {} (is 'tv daemon' running?)",
                path.display()
            )
        })?;
        Ok(Arc::new(store))
    }

    pub fn connectivity(&self) -> Arc<dyn Connectivity> {
        match &self.config.remote.probe_host {
            Some(host) => Arc::new(TcpProbe::new(host.clone(), self.config.probe_timeout())),
            None => Arc::new(AlwaysOnline),
        }
    }

    pub fn remote(&self) -> Result<RemoteStore> {
        let dir = self.config.remote_dir()?;
        let mut remote = RemoteStore::new(dir, self.connectivity())
            .with_app_name(&self.config.app.name)
            .with_build_mode(self.config.app.build_mode)
            .with_io_timeout(self.config.io_timeout());
        if let Some(mount_root) = &self.config.remote.mount_root {
            remote = remote.with_mount_root(mount_root);
        }
        Ok(remote)
    }

    pub fn retention(&self) -> RetentionPolicy {
        RetentionPolicy::new(
            chrono::Duration::days(i64::from(self.config.retention.max_age_days)),
            self.config.retention.max_count,
        )
    }

    pub fn safety(&self) -> Arc<SafetyVault> {
        Arc::new(SafetyVault::new(
            self.config.safety_dir(),
            self.config.safety.keep,
        ))
    }

    pub fn exporter(&self) -> LocalExporter {
        LocalExporter::new(self.config.export_dir(), &self.config.app.name)
    }

    pub fn restore_engine(&self, store: Arc<dyn DataStore>) -> RestoreEngine {
        RestoreEngine::new(store, self.codec(), self.safety())
            .with_build_mode(self.config.app.build_mode)
    }

    pub fn backup_service(&self, store: Arc<dyn DataStore>) -> Result<BackupService> {
        Ok(BackupService::new(
            store,
            self.codec(),
            Arc::new(self.remote()?),
            self.retention(),
        ))
    }

    pub fn state_file(&self) -> JsonStateFile {
        JsonStateFile::new(self.config.state_path())
    }

    /// Scheduler whose job opens the store only while a backup runs
    pub fn scheduler(&self) -> Result<Arc<BackupScheduler>> {
        let job = StoreBackupJob {
            config: self.config.clone(),
        };
        let scheduler = BackupScheduler::new(
            Arc::new(job),
            Arc::new(self.state_file()),
            self.config.trigger()?,
        )
        .context("Failed to load scheduler state")?;
        Ok(scheduler)
    }
}

/// Backs up through a freshly opened store, so the daemon does not keep the
/// database locked between runs
struct StoreBackupJob {
    config: Config,
}

#[async_trait]
impl BackupJob for StoreBackupJob {
    async fn run(&self) -> tv_core::Result<()> {
        let ctx = AppContext::new(self.config.clone());
        // A missing remote is a setup problem, not an offline medium
        ctx.remote()
            .map_err(|e| tv_core::Error::Misconfigured(format!("{:#}", e)))?;

        let path = self.config.store_path();
        let store = tokio::task::spawn_blocking(move || SledStore::open(&path))
            .await
            .map_err(|e| tv_core::Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))??;

        let service = ctx
            .backup_service(Arc::new(store))
            .map_err(|e| tv_core::Error::Misconfigured(format!("{:#}", e)))?;
        service.run().await
    }
}
