//! Foreground scheduler process

use crate::context::AppContext;
use crate::locks::SchedulerLock;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use scheduler::BackupAttempt;
use tracing::{info, warn};

pub async fn run(ctx: &AppContext) -> Result<()> {
    let lock = SchedulerLock::acquire(&ctx.config.locks_dir())?;
    let scheduler = ctx.scheduler()?;

    if !scheduler.start() {
        anyhow::bail!("Automatic backup is disabled (enable it with 'tv auto enable')");
    }

    println!(
        "{} Scheduler running ({}), logging to {}",
        "✓".green(),
        scheduler.trigger(),
        ctx.config.logs_dir().display()
    );
    info!(trigger = %scheduler.trigger(), pid = std::process::id(), "Scheduler started");

    // Catch up on an attempt that failed before the last shutdown
    match scheduler.retry_if_needed().await {
        Some(BackupAttempt::Completed) => info!("Pending backup completed"),
        Some(attempt) => warn!(?attempt, "Pending backup still not possible"),
        None => {}
    }

    wait_for_shutdown().await.context("Failed to wait for shutdown signal")?;

    info!("Scheduler stopping");
    drop(scheduler);
    lock.release()?;
    println!("Scheduler stopped");
    Ok(())
}

async fn wait_for_shutdown() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result?,
            _ = sigterm.recv() => {}
        }
        Ok(())
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}
