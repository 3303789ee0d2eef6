//! List remote backups

use crate::context::AppContext;
use crate::util;
use anyhow::Result;
use chrono::Utc;
use owo_colors::OwoColorize;

pub async fn run(ctx: &AppContext) -> Result<()> {
    let remote = ctx.remote()?;
    let records = remote.list().await?;

    if records.is_empty() {
        println!("No backups in {}", remote.dir().display());
        println!("  {}", "Tip: Create one with 'tv backup'".dimmed());
        return Ok(());
    }

    let now = Utc::now();
    println!("{}", format!("Backups in {}", remote.dir().display()).bold());
    println!();
    for record in &records {
        let tag = if record.is_dev() {
            " dev".magenta().to_string()
        } else {
            String::new()
        };
        println!("{}{}", record.file_name.cyan(), tag);
        println!(
            "  {} ({})  {}  {}  schema {}",
            util::format_local_time(record.created_at),
            util::format_relative_time(record.created_at, now).dimmed(),
            record.device_name,
            util::format_size(record.size_bytes).dimmed(),
            record.schema_version
        );
    }
    println!();
    println!("{} backups", records.len());
    Ok(())
}
