//! Dirdelta CLI - Command-line interface for Dirdelta
//!
//! Takes a baseline of a directory tree and reports what changed between
//! successive scans.

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "dirdelta")]
#[command(author = "Dirdelta Contributors")]
#[command(version)]
#[command(about = "Incremental directory change detection", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON file with watcher options
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a directory once and show index statistics
    Scan {
        /// Path to scan (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Only track entries whose name matches this glob
        #[arg(short, long)]
        filter: Option<String>,

        /// Do not walk into subdirectories
        #[arg(long)]
        no_recurse: bool,
    },

    /// Poll a directory and print changes as they happen
    Watch {
        /// Path to watch (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Milliseconds between scans
        #[arg(short, long, default_value = "1000")]
        interval: u64,

        /// Only report entries whose name matches this glob
        #[arg(short, long)]
        filter: Option<String>,

        /// Do not walk into subdirectories
        #[arg(long)]
        no_recurse: bool,

        /// Print one JSON object per change
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(tracing_subscriber::EnvFilter::new(filter))
        .init();

    let result = match cli.command {
        Commands::Scan {
            path,
            filter,
            no_recurse,
        } => commands::load_options(cli.config.as_deref(), filter, no_recurse)
            .and_then(|options| commands::scan(&path, options)),
        Commands::Watch {
            path,
            interval,
            filter,
            no_recurse,
            json,
        } => match commands::load_options(cli.config.as_deref(), filter, no_recurse) {
            Ok(options) => commands::watch(&path, options, interval, json).await,
            Err(e) => Err(e),
        },
    };

    if let Err(e) = result {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}
