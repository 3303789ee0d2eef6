//! Write the local database to a snapshot file

use crate::context::AppContext;
use crate::util;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use vault::LocalExporter;

pub fn run(ctx: &AppContext, out: Option<PathBuf>) -> Result<()> {
    let store = ctx.open_store()?;
    let exporter = match out {
        Some(dir) => LocalExporter::new(dir, &ctx.config.app.name),
        None => ctx.exporter(),
    };

    let path = exporter
        .export(store.as_ref(), &ctx.codec())
        .context("Export failed")?;
    let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);

    println!(
        "{} Exported to {} {}",
        "✓".green(),
        path.display().to_string().cyan(),
        format!("({})", util::format_size(size)).dimmed()
    );
    Ok(())
}
