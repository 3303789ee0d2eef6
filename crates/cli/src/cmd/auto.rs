//! Turn automatic backup on or off

use crate::context::AppContext;
use crate::locks::SchedulerLock;
use crate::util;
use anyhow::Result;
use chrono::{Local, Utc};
use owo_colors::OwoColorize;
use scheduler::StateStore;

pub fn run_enable(ctx: &AppContext) -> Result<()> {
    // Fails early on an unusable remote configuration
    ctx.remote()?;

    let scheduler = ctx.scheduler()?;
    scheduler.enable()?;
    println!(
        "{} Automatic backup enabled ({})",
        "✓".green(),
        scheduler.trigger()
    );
    print_daemon_hint(ctx, true);
    Ok(())
}

pub fn run_disable(ctx: &AppContext) -> Result<()> {
    let scheduler = ctx.scheduler()?;
    scheduler.disable()?;
    println!("{} Automatic backup disabled", "✓".green());
    print_daemon_hint(ctx, false);
    Ok(())
}

pub fn run_status(ctx: &AppContext) -> Result<()> {
    let state = ctx.state_file().load()?;
    let trigger = ctx.config.trigger()?;
    let now = Utc::now();

    print!("Automatic backup: ");
    if state.enabled {
        println!("{} ({})", "Enabled".green(), trigger);
    } else {
        println!("{}", "Disabled".yellow());
    }

    match state.last_automatic_backup {
        Some(at) => println!(
            "  Last backup:   {} ({})",
            util::format_local_time(at),
            util::format_relative_time(at, now).dimmed()
        ),
        None => println!("  Last backup:   {}", "never".dimmed()),
    }
    if let Some(at) = state.last_attempt {
        println!(
            "  Last attempt:  {} ({})",
            util::format_local_time(at),
            util::format_relative_time(at, now).dimmed()
        );
    }
    if state.pending_retry {
        println!("  {}", "Last attempt did not complete; retry pending".yellow());
        println!("  {}", "Tip: Run it now with 'tv retry'".dimmed());
    }

    if state.enabled {
        if let Ok(delay) = trigger.delay_from(&Local::now()) {
            let next = now + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero());
            println!("  Next backup:   {}", util::format_local_time(next));
        }
        match SchedulerLock::holder(&ctx.config.locks_dir()) {
            Some(owner) => println!("  Daemon:        {} (pid {})", "Running".green(), owner.pid),
            None => println!(
                "  Daemon:        {} {}",
                "Not running".yellow(),
                "(start with 'tv daemon')".dimmed()
            ),
        }
    }
    Ok(())
}

fn print_daemon_hint(ctx: &AppContext, enabled: bool) {
    if SchedulerLock::holder(&ctx.config.locks_dir()).is_some() {
        // A running daemon re-reads the state before each backup, but only
        // arms its trigger at startup
        if enabled {
            println!(
                "{}",
                "Note: Restart 'tv daemon' for the change to take effect".yellow()
            );
        } else {
            println!(
                "  {}",
                "The running daemon skips its next backup and stops scheduling".dimmed()
            );
        }
    } else {
        println!("  {}", "Tip: Backups run while 'tv daemon' is running".dimmed());
    }
}
