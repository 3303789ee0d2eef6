//! Replace the local database with a snapshot file

use crate::context::AppContext;
use crate::util;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::Path;

pub async fn run(ctx: &AppContext, file: &Path, yes: bool) -> Result<()> {
    let store = ctx.open_store()?;
    let engine = ctx.restore_engine(store);

    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let preview = engine.preview(&bytes)?;

    println!("{} {}", "Snapshot".bold(), file.display().to_string().cyan());
    util::print_preview(&preview);
    println!();

    if !preview.is_compatible() {
        return Err(tv_core::Error::IncompatibleSchema {
            current: preview.current_schema_version,
            found: preview.metadata.schema_version,
        }
        .into());
    }

    if !yes && !util::confirm("Replace all local travel data with this snapshot?")? {
        println!("{}", "Import cancelled".yellow());
        return Ok(());
    }

    let report = engine.import_file(file).await?;
    util::print_restore_report(&report);
    Ok(())
}
