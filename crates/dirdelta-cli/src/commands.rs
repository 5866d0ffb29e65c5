//! CLI command implementations.

use colored::Colorize;
use dirdelta_watcher::{ChangeType, DirectoryWatcher, FileChange, WatcherOptions};
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::debug;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Builds watcher options from an optional config file plus flags.
/// Flags win over the file.
pub fn load_options(
    config: Option<&Path>,
    filter: Option<String>,
    no_recurse: bool,
) -> Result<WatcherOptions> {
    let mut options = match config {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .map_err(|e| format!("failed to read config '{}': {}", path.display(), e))?;
            serde_json::from_str(&raw)
                .map_err(|e| format!("invalid config '{}': {}", path.display(), e))?
        }
        None => WatcherOptions::default(),
    };

    if let Some(filter) = filter {
        options.filter = filter;
    }
    if no_recurse {
        options.include_subdirectories = false;
    }
    debug!(?options, "Watcher options");
    Ok(options)
}

/// Scan a directory once and print what the index holds.
pub fn scan(path: &Path, options: WatcherOptions) -> Result<()> {
    println!("{}", "Scanning directory...".cyan());

    let start = Instant::now();
    let mut watcher = DirectoryWatcher::new(path, options)?;
    let entries = watcher.attach()?;
    let stats = watcher.stats();

    println!(
        "{} Tracked {} entries in {}ms",
        "✓".green(),
        entries.to_string().cyan(),
        start.elapsed().as_millis()
    );
    println!("  Path prefixes:  {}", stats.paths);
    println!("  Segments:       {}", stats.segments);
    println!("  Segment bytes:  {}", stats.text_bytes);

    Ok(())
}

/// Poll a directory until Ctrl-C, printing every change.
pub async fn watch(path: &Path, options: WatcherOptions, interval_ms: u64, json: bool) -> Result<()> {
    let mut watcher = DirectoryWatcher::new(path, options)?;
    let entries = tokio::task::block_in_place(|| watcher.attach())?;

    if !json {
        println!(
            "{} Watching {} ({} entries), press Ctrl-C to stop",
            "✓".green(),
            path.display().to_string().cyan(),
            entries
        );
    }

    let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms.max(1)));
    // The first tick fires immediately; the baseline was just taken.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let changes = tokio::task::block_in_place(|| watcher.get_changes())?;
                for change in &changes {
                    if json {
                        println!("{}", serde_json::to_string(change)?);
                    } else {
                        print_change(change);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                if !json {
                    println!("\n{} Stopped", "✓".green());
                }
                break;
            }
        }
    }

    Ok(())
}

fn print_change(change: &FileChange) {
    let marker = marker(change.change_type);
    let marker = match change.change_type {
        ChangeType::Created => marker.green(),
        ChangeType::Changed => marker.yellow(),
        ChangeType::Deleted => marker.red(),
        ChangeType::Renamed => marker.cyan(),
    };
    println!("{} {}", marker, describe(change));
}

fn marker(change_type: ChangeType) -> &'static str {
    match change_type {
        ChangeType::Created => "+",
        ChangeType::Changed => "~",
        ChangeType::Deleted => "-",
        ChangeType::Renamed => ">",
    }
}

/// Plain-text description of a change.
fn describe(change: &FileChange) -> String {
    match change.old_path() {
        Some(old) => format!(
            "{} {} -> {}",
            change.change_type,
            old.display(),
            change.path().display()
        ),
        None => format!("{} {}", change.change_type, change.path().display()),
    }
}
