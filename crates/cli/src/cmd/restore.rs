//! Replace the local database with a remote backup

use crate::context::AppContext;
use crate::util;
use anyhow::Result;
use owo_colors::OwoColorize;

pub async fn run(ctx: &AppContext, name: &str, yes: bool) -> Result<()> {
    let remote = ctx.remote()?;
    let record = remote.find(name).await?;

    // Refuse before prompting; the engine checks again
    if record.is_dev() && !ctx.config.app.build_mode.is_dev() {
        return Err(tv_core::Error::DevBackupOnProdBuild(record.file_name).into());
    }

    let store = ctx.open_store()?;
    let engine = ctx.restore_engine(store);
    let preview = engine.preview(&remote.read(&record).await?)?;

    println!("{} {}", "Backup".bold(), record.file_name.cyan());
    util::print_preview(&preview);
    println!();

    if !preview.is_compatible() {
        return Err(tv_core::Error::IncompatibleSchema {
            current: preview.current_schema_version,
            found: preview.metadata.schema_version,
        }
        .into());
    }

    if !yes && !util::confirm("Replace all local travel data with this backup?")? {
        println!("{}", "Restore cancelled".yellow());
        return Ok(());
    }

    let pb = util::spinner("Restoring...")?;
    let result = engine.restore_remote(&remote, &record).await;
    pb.finish_and_clear();

    util::print_restore_report(&result?);
    Ok(())
}
