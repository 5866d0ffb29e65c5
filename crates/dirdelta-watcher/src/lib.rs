//! Dirdelta Watcher - polling change detection for directory trees
//!
//! This crate handles the scanning side of things:
//! - Walking directories and filtering entries by name
//! - Tracking per-file state across scans in the core index
//! - Reporting created, changed, deleted and renamed entries
//!
//! Nothing is persisted between processes. A watcher takes a baseline with
//! `attach` and every `get_changes` call rescans and diffs against the
//! previous scan.
//!
//! # Example
//!
//! ```no_run
//! use dirdelta_watcher::{DirectoryWatcher, WatcherOptions};
//!
//! let mut watcher = DirectoryWatcher::new("./data", WatcherOptions::default()).unwrap();
//! watcher.attach().unwrap();
//! for change in watcher.get_changes().unwrap() {
//!     println!("{} {}", change.change_type, change.path().display());
//! }
//! ```

mod detector;
mod enumerator;
mod error;
mod state;
mod watcher;

pub use detector::{ChangeDetector, ChangeType, FileChange, Phase};
pub use enumerator::{enumerate, AcceptAll, EntryFilter, EntryInfo, PatternFilter};
pub use error::{Result, WatchError};
pub use state::{signature, FileState, StateFlags};
pub use watcher::{DirectoryWatcher, WatcherOptions, WatcherStats};
