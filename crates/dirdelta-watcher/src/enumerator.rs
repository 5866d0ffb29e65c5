//! Directory walking.
//!
//! Walks the tree depth-first and reports each entry through a callback,
//! after asking an [`EntryFilter`] whether to include it and whether to
//! descend into it. Entries that cannot be read, or whose path is not valid
//! UTF-8, are logged and skipped.

use ignore::overrides::{Override, OverrideBuilder};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;
use walkdir::WalkDir;

use crate::error::{Result, WatchError};

/// One discovered directory entry.
#[derive(Debug, Clone, Copy)]
pub struct EntryInfo<'a> {
    /// Path of the containing directory.
    pub parent: &'a str,
    /// File or directory name, without separators.
    pub name: &'a str,
    pub is_directory: bool,
    pub last_write: SystemTime,
    /// Byte length; zero for directories.
    pub len: u64,
}

/// Decides which entries are reported and which directories are walked.
pub trait EntryFilter {
    fn should_include(&self, entry: &EntryInfo<'_>) -> bool;
    fn should_recurse(&self, entry: &EntryInfo<'_>) -> bool;
}

/// Reports every file and walks every directory.
///
/// Directories themselves are not reported. Their modification time moves
/// whenever a child is added, removed or renamed, which would shadow every
/// such change with a second event.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAll;

impl EntryFilter for AcceptAll {
    fn should_include(&self, entry: &EntryInfo<'_>) -> bool {
        !entry.is_directory
    }

    fn should_recurse(&self, _entry: &EntryInfo<'_>) -> bool {
        true
    }
}

/// Matches file names against a glob such as `*.txt`.
///
/// The pattern applies to names only, so `*.rs` matches at every depth.
/// Directories are never reported, as with [`AcceptAll`]. Recursion is
/// controlled separately and ignores the pattern.
#[derive(Debug)]
pub struct PatternFilter {
    matcher: Option<Override>,
    include_subdirectories: bool,
}

impl PatternFilter {
    /// Builds a filter for `pattern`. `*` and the empty pattern match all.
    pub fn new(root: &Path, pattern: &str, include_subdirectories: bool) -> Result<Self> {
        let pattern = pattern.trim();
        let matcher = if pattern.is_empty() || pattern == "*" {
            None
        } else {
            let mut builder = OverrideBuilder::new(root);
            builder
                .add(pattern)
                .map_err(|e| WatchError::InvalidPattern(e.to_string()))?;
            Some(
                builder
                    .build()
                    .map_err(|e| WatchError::InvalidPattern(e.to_string()))?,
            )
        };

        Ok(Self {
            matcher,
            include_subdirectories,
        })
    }
}

impl EntryFilter for PatternFilter {
    fn should_include(&self, entry: &EntryInfo<'_>) -> bool {
        if entry.is_directory {
            return false;
        }
        match &self.matcher {
            Some(matcher) => matcher.matched(Path::new(entry.name), false).is_whitelist(),
            None => true,
        }
    }

    fn should_recurse(&self, _entry: &EntryInfo<'_>) -> bool {
        self.include_subdirectories
    }
}

/// Walks `root` (excluding the root itself), calling `visit` once per
/// included entry in discovery order. Returns the number of entries
/// visited.
///
/// Siblings are visited in file-name order so repeated walks of an
/// unchanged tree produce the same sequence.
pub fn enumerate<F>(
    root: &Path,
    follow_symlinks: bool,
    filter: &dyn EntryFilter,
    mut visit: F,
) -> Result<usize>
where
    F: FnMut(&EntryInfo<'_>) -> Result<()>,
{
    let mut walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(follow_symlinks)
        .sort_by_file_name()
        .into_iter();
    let mut visited = 0;

    while let Some(next) = walker.next() {
        let entry = match next {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        // Lossy conversion would fold distinct names onto one key.
        let (Some(parent), Some(name)) = (
            entry.path().parent().and_then(Path::to_str),
            entry.file_name().to_str(),
        ) else {
            warn!("Skipping non UTF-8 path: {}", entry.path().display());
            if entry.file_type().is_dir() {
                walker.skip_current_dir();
            }
            continue;
        };
        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("Failed to stat {}: {}", entry.path().display(), e);
                continue;
            }
        };

        let is_directory = metadata.is_dir();
        let info = EntryInfo {
            parent,
            name,
            is_directory,
            last_write: metadata.modified().unwrap_or(UNIX_EPOCH),
            len: if is_directory { 0 } else { metadata.len() },
        };

        if filter.should_include(&info) {
            visit(&info)?;
            visited += 1;
        }
        if is_directory && !filter.should_recurse(&info) {
            walker.skip_current_dir();
        }
    }

    Ok(visited)
}
