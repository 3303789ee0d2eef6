//! Tripvault CLI - tv command

use anyhow::Result;
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

mod cmd;
mod config;
mod context;
mod locks;
mod util;

/// Tripvault - backup and restore for your travel data
#[derive(Parser)]
#[command(name = "tv")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (default: <config dir>/tripvault/config.toml)
    #[arg(long, global = true, env = "TRIPVAULT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the local database to a snapshot file in the export directory
    Export {
        /// Export directory (default: export.dir)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Replace the local database with a snapshot file
    Import {
        /// Snapshot file
        file: PathBuf,
        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Back up the local database to the remote directory now
    Backup,
    /// List remote backups, newest first
    List,
    /// Replace the local database with a remote backup
    Restore {
        /// Backup file name (see 'tv list')
        name: String,
        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Delete one remote backup, or all of them
    Delete {
        /// Backup file name
        name: Option<String>,
        /// Delete every backup in the remote directory
        #[arg(long, conflicts_with = "name")]
        all: bool,
        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Apply the retention policy to remote backups
    Prune,
    /// Automatic backup settings
    #[command(subcommand)]
    Auto(AutoCommands),
    /// Run the automatic backup scheduler in the foreground
    Daemon,
    /// Run a pending automatic backup now
    Retry,
    /// Show configuration, remote and scheduler status
    Status,
    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum AutoCommands {
    /// Turn automatic backup on
    Enable,
    /// Turn automatic backup off
    Disable,
    /// Show automatic backup state
    Status,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration
    List,
    /// Get a single value
    Get {
        /// Key in section.name form (e.g. retention.max_count)
        key: String,
    },
    /// Set a value in the config file
    Set {
        key: String,
        value: String,
    },
    /// Show the config file location
    Path {
        /// Write a default config file if none exists
        #[arg(long)]
        create: bool,
    },
    /// Print an annotated example config
    Example,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = config::config_file_path(cli.config.as_deref())?;

    // Config editing works even when the current file is invalid
    let command = match cli.command {
        Commands::Config(config_cmd) => {
            init_tracing(None);
            return match config_cmd {
                ConfigCommands::List => cmd::config::run_list(&config_path),
                ConfigCommands::Get { key } => cmd::config::run_get(&config_path, &key),
                ConfigCommands::Set { key, value } => {
                    cmd::config::run_set(&config_path, &key, &value)
                }
                ConfigCommands::Path { create } => cmd::config::run_path(&config_path, create),
                ConfigCommands::Example => cmd::config::run_example(),
            };
        }
        command => command,
    };

    let config = config::load(&config_path)?;
    let log_dir = matches!(command, Commands::Daemon).then(|| config.logs_dir());
    let _guard = init_tracing(log_dir.as_deref());
    let ctx = context::AppContext::new(config);

    match command {
        Commands::Export { out } => cmd::export::run(&ctx, out),
        Commands::Import { file, yes } => cmd::import::run(&ctx, &file, yes).await,
        Commands::Backup => cmd::backup::run(&ctx).await,
        Commands::List => cmd::list::run(&ctx).await,
        Commands::Restore { name, yes } => cmd::restore::run(&ctx, &name, yes).await,
        Commands::Delete { name, all, yes } => cmd::delete::run(&ctx, name.as_deref(), all, yes).await,
        Commands::Prune => cmd::prune::run(&ctx).await,
        Commands::Auto(auto_cmd) => match auto_cmd {
            AutoCommands::Enable => cmd::auto::run_enable(&ctx),
            AutoCommands::Disable => cmd::auto::run_disable(&ctx),
            AutoCommands::Status => cmd::auto::run_status(&ctx),
        },
        Commands::Daemon => cmd::daemon::run(&ctx).await,
        Commands::Retry => cmd::retry::run(&ctx).await,
        Commands::Status => cmd::status::run(&ctx, &config_path).await,
        Commands::Config(_) => unreachable!("handled above"),
    }
}

/// Interactive commands log to stderr; the daemon logs to a daily file
fn init_tracing(log_dir: Option<&std::path::Path>) -> Option<WorkerGuard> {
    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "daemon.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(env_filter("info"))
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter("warn"))
                .with_writer(std::io::stderr)
                .init();
            None
        }
    }
}

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

fn report(err: &anyhow::Error) {
    eprintln!("{} {:#}", "Error:".red().bold(), err);

    let engine_error = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<tv_core::Error>());

    match engine_error {
        Some(tv_core::Error::RollbackFailed {
            safety_snapshot, ..
        }) => {
            eprintln!();
            eprintln!("{}", "Local data may be empty or incomplete.".red().bold());
            eprintln!(
                "The state from before the restore was saved to:\n  {}",
                safety_snapshot.display().to_string().cyan()
            );
            eprintln!(
                "{}",
                format!("Recover it with 'tv import {}'", safety_snapshot.display()).dimmed()
            );
        }
        Some(tv_core::Error::RestoreFailed { .. }) => {
            eprintln!("{}", "Your data was left as it was before the restore.".dimmed());
        }
        Some(e) if e.is_unavailable() => {
            eprintln!(
                "{}",
                "Tip: check that the backup location is mounted and online".dimmed()
            );
        }
        _ => {}
    }
}
