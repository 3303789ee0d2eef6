//! Shared helpers for CLI commands

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::io::{BufRead, Write};
use std::time::Duration;
use vault::{RestoreReport, SnapshotPreview};

/// Human readable size
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// "2 hours ago"
pub fn format_relative_time(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - at).num_seconds();
    if seconds < 0 {
        return "in the future".to_string();
    }

    if seconds < 60 {
        format!("{} seconds ago", seconds)
    } else if seconds < 3600 {
        format!("{} minutes ago", seconds / 60)
    } else if seconds < 86400 {
        format!("{} hours ago", seconds / 3600)
    } else if seconds < 604800 {
        format!("{} days ago", seconds / 86400)
    } else {
        format!("{} weeks ago", seconds / 604800)
    }
}

/// Local wall-clock rendering
pub fn format_local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Ask a yes/no question on stdin; anything but y/yes declines
pub fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    std::io::stdout().flush().context("Failed to flush stdout")?;

    let mut answer = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("Failed to read confirmation")?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

/// Ticking spinner for remote operations
pub fn spinner(message: impl Into<String>) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

/// What a restore would bring back
pub fn print_preview(preview: &SnapshotPreview) {
    let meta = &preview.metadata;
    println!("  {} {}", "Device:".dimmed(), meta.device_name);
    println!(
        "  {} {} ({})",
        "Created:".dimmed(),
        format_local_time(meta.created_at),
        format_relative_time(meta.created_at, Utc::now())
    );
    println!("  {} {}", "App version:".dimmed(), meta.app_version);
    if preview.is_compatible() {
        println!("  {} {}", "Schema:".dimmed(), meta.schema_version);
    } else {
        println!(
            "  {} {} {}",
            "Schema:".dimmed(),
            meta.schema_version.to_string().red(),
            format!("(this build understands up to {})", preview.current_schema_version).red()
        );
    }
}

/// Summary of a committed restore
pub fn print_restore_report(report: &RestoreReport) {
    println!(
        "{} Restored {} records from {} ({})",
        "✓".green(),
        report.inserted_total(),
        report.source.device_name.cyan(),
        format_local_time(report.source.created_at)
    );
    for (kind, count) in &report.inserted {
        if *count > 0 {
            println!("  {:<14} {}", kind.to_string().dimmed(), count);
        }
    }

    if !report.rejected.is_empty() {
        println!();
        println!(
            "{}",
            format!("{} records were skipped:", report.rejected.len()).yellow()
        );
        for rejected in &report.rejected {
            println!(
                "  {} {} {}",
                rejected.kind.to_string().dimmed(),
                rejected.id,
                format!("({})", rejected.reason).dimmed()
            );
        }
    }

    println!(
        "{}",
        format!("Previous data saved to {}", report.safety_snapshot.display()).dimmed()
    );
}
