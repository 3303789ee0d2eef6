//! Back up to the remote directory now

use crate::context::AppContext;
use crate::util;
use anyhow::Result;
use owo_colors::OwoColorize;

pub async fn run(ctx: &AppContext) -> Result<()> {
    let store = ctx.open_store()?;
    let service = ctx.backup_service(store)?;

    let pb = util::spinner(format!(
        "Backing up to {}...",
        service.remote().dir().display()
    ))?;
    let outcome = match service.backup_now().await {
        Ok(outcome) => outcome,
        Err(e) => {
            pb.finish_and_clear();
            return Err(e.into());
        }
    };
    pb.finish_with_message(format!(
        "{} Backup written: {} {}",
        "✓".green(),
        outcome.record.file_name.cyan(),
        format!("({})", util::format_size(outcome.record.size_bytes)).dimmed()
    ));

    if !outcome.retention.deleted.is_empty() {
        println!(
            "  {}",
            format!(
                "Removed {} old backups: {}",
                outcome.retention.deleted.len(),
                outcome.retention.deleted.join(", ")
            )
            .dimmed()
        );
    }
    for failed in &outcome.retention.failed {
        println!("  {} could not remove {}", "!".yellow(), failed);
    }
    Ok(())
}
