//! The unit of work the scheduler triggers

use async_trait::async_trait;
use tracing::debug;
use vault::BackupService;

/// One silent backup
#[async_trait]
pub trait BackupJob: Send + Sync {
    async fn run(&self) -> tv_core::Result<()>;
}

#[async_trait]
impl BackupJob for BackupService {
    async fn run(&self) -> tv_core::Result<()> {
        let outcome = self.backup_now().await?;
        debug!(
            file = %outcome.record.file_name,
            evicted = outcome.retention.deleted.len(),
            "Scheduled backup written"
        );
        Ok(())
    }
}
