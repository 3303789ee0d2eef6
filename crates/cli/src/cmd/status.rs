//! Show configuration, remote and scheduler status

use crate::context::AppContext;
use crate::locks::SchedulerLock;
use crate::util;
use anyhow::Result;
use chrono::Utc;
use owo_colors::OwoColorize;
use scheduler::StateStore;
use std::path::Path;

pub async fn run(ctx: &AppContext, config_path: &Path) -> Result<()> {
    let config = &ctx.config;
    let now = Utc::now();

    println!("{}", "Tripvault Status".bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();

    println!("Config:        {}", config_path.display().to_string().cyan());
    println!("Device:        {}", config.app.device_name);
    println!(
        "Build:         {}",
        if config.app.build_mode.is_dev() { "dev" } else { "prod" }
    );
    println!("Store:         {}", config.store_path().display());
    println!();

    // Remote
    print!("Remote:        ");
    match ctx.remote() {
        Err(_) => {
            println!("{}", "Not configured".yellow());
            println!(
                "  {}",
                "Tip: Set one with 'tv config set remote.dir <path>'".dimmed()
            );
        }
        Ok(remote) => {
            println!("{}", remote.dir().display().to_string().cyan());
            match remote.ensure_available().await {
                Err(e) => println!("  Available:   {} {}", "No".red(), format!("({})", e).dimmed()),
                Ok(()) => {
                    println!("  Available:   {}", "Yes ✓".green());
                    match remote.list().await {
                        Ok(records) => {
                            let mine = records
                                .iter()
                                .filter(|r| r.is_dev() == config.app.build_mode.is_dev())
                                .count();
                            println!(
                                "  Backups:     {} {}",
                                records.len(),
                                format!("({} from this build mode)", mine).dimmed()
                            );
                            if let Some(latest) = records.first() {
                                println!(
                                    "  Latest:      {} ({})",
                                    latest.file_name,
                                    util::format_relative_time(latest.created_at, now).dimmed()
                                );
                            }
                        }
                        Err(e) => println!("  Backups:     {}", e.to_string().red()),
                    }
                }
            }
        }
    }
    println!(
        "  Retention:   {} backups, {} days",
        config.retention.max_count, config.retention.max_age_days
    );
    println!();

    // Scheduler
    let state = ctx.state_file().load()?;
    print!("Automatic:     ");
    if state.enabled {
        println!("{} ({})", "Enabled".green(), config.scheduler.trigger);
    } else {
        println!("{}", "Disabled".yellow());
    }
    if let Some(at) = state.last_automatic_backup {
        println!(
            "  Last:        {}",
            util::format_relative_time(at, now).dimmed()
        );
    }
    if state.pending_retry {
        println!("  {}", "Retry pending (run 'tv retry')".yellow());
    }
    match SchedulerLock::holder(&config.locks_dir()) {
        Some(owner) => println!(
            "  Daemon:      {} (pid {}, since {})",
            "Running ✓".green(),
            owner.pid,
            util::format_relative_time(owner.started_at, now)
        ),
        None => println!("  Daemon:      {}", "Not running".dimmed()),
    }
    println!();

    // Safety snapshots
    let safety = ctx.safety();
    let snapshots = safety.list().unwrap_or_default();
    println!("Safety:        {}", safety.dir().display());
    println!("  Snapshots:   {} (keeping {})", snapshots.len(), config.safety.keep);
    if let Some(latest) = snapshots.first() {
        println!("  Latest:      {}", latest.display().to_string().dimmed());
    }

    Ok(())
}
