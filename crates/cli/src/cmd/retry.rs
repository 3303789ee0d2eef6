//! Run a pending automatic backup now

use crate::context::AppContext;
use anyhow::Result;
use owo_colors::OwoColorize;
use scheduler::BackupAttempt;

pub async fn run(ctx: &AppContext) -> Result<()> {
    let scheduler = ctx.scheduler()?;

    match scheduler.retry_if_needed().await {
        None => {
            println!("No automatic backup is pending");
            Ok(())
        }
        Some(BackupAttempt::Completed) => {
            println!("{} Pending backup completed", "✓".green());
            Ok(())
        }
        Some(BackupAttempt::Deferred(reason)) => {
            anyhow::bail!("Backup location still unavailable: {}", reason)
        }
        Some(BackupAttempt::Failed(reason)) => anyhow::bail!("Backup failed: {}", reason),
    }
}
