//! Apply the retention policy on demand

use crate::context::AppContext;
use anyhow::Result;
use owo_colors::OwoColorize;

pub async fn run(ctx: &AppContext) -> Result<()> {
    let remote = ctx.remote()?;
    remote.ensure_available().await?;

    let policy = ctx.retention();
    let report = policy.apply(&remote).await;

    if report.deleted.is_empty() && report.failed.is_empty() {
        println!(
            "Nothing to prune {}",
            format!(
                "(keeping at most {} backups, none older than {} days)",
                policy.max_count,
                policy.max_age.num_days()
            )
            .dimmed()
        );
        return Ok(());
    }

    for name in &report.deleted {
        println!("{} Removed {}", "✓".green(), name);
    }
    for name in &report.failed {
        println!("{} Could not remove {}", "!".yellow(), name);
    }
    if !report.failed.is_empty() {
        anyhow::bail!("{} backups could not be removed", report.failed.len());
    }
    Ok(())
}
