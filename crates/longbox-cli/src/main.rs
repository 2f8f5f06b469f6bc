//! Longbox CLI - local-first comic catalog with remote sync
//!
//! Provides commands for:
//! - Adding, listing and removing catalog items
//! - Recording and undoing valuations
//! - Pulling from and pushing to the remote record table
//! - Running a periodic sync loop
//! - Inspecting and validating configuration

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod context;
mod output;

use commands::{
    catalog::{AddCommand, ListCommand, RemoveCommand},
    config::ConfigCommand,
    run::RunCommand,
    status::StatusCommand,
    sync::{PullCommand, PushCommand},
    value::ValueCommand,
};
use context::AppContext;
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "longbox", version, about = "Local-first comic catalog with remote sync")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Merge the remote table into the local catalog
    Pull(PullCommand),
    /// Upload the whole local catalog
    Push(PushCommand),
    /// Show catalog and sync status
    Status(StatusCommand),
    /// Add an issue to the catalog
    Add(AddCommand),
    /// List catalog items
    List(ListCommand),
    /// Remove an item
    Remove(RemoveCommand),
    /// Record, undo or show valuations
    #[command(subcommand)]
    Value(ValueCommand),
    /// Sync periodically until interrupted
    Run(RunCommand),
    /// View and validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

fn log_filter(cli: &Cli, configured: &str) -> EnvFilter {
    let level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => configured,
            1 => "debug",
            _ => "trace",
        }
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let format = OutputFormat::from_flag(cli.json);

    let ctx = AppContext::load(cli.config.clone(), format)?;

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(&cli, &ctx.config.logging.level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match &cli.command {
        Commands::Pull(cmd) => cmd.execute(&ctx).await,
        Commands::Push(cmd) => cmd.execute(&ctx).await,
        Commands::Status(cmd) => cmd.execute(&ctx).await,
        Commands::Add(cmd) => cmd.execute(&ctx).await,
        Commands::List(cmd) => cmd.execute(&ctx).await,
        Commands::Remove(cmd) => cmd.execute(&ctx).await,
        Commands::Value(cmd) => cmd.execute(&ctx).await,
        Commands::Run(cmd) => cmd.execute(&ctx).await,
        Commands::Config(cmd) => cmd.execute(&ctx).await,
    }
}
