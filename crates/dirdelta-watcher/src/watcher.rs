//! Polling directory watcher.
//!
//! Ties the enumerator to the change detector. `attach` takes a baseline
//! scan and throws its diff away; every `get_changes` call afterwards runs
//! exactly one scan and returns what changed since the previous one.

use dirdelta_core::{DefaultHashBuilder, StorageOptions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::hash::BuildHasher;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

use crate::detector::{ChangeDetector, FileChange};
use crate::enumerator::{enumerate, EntryFilter, PatternFilter};
use crate::error::{Result, WatchError};

/// Options for a [`DirectoryWatcher`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherOptions {
    /// Glob matched against entry names. `*` reports everything.
    pub filter: String,

    /// Walk into subdirectories.
    pub include_subdirectories: bool,

    /// Follow symbolic links when walking directories.
    pub follow_symlinks: bool,

    /// Sizing of the in-memory index.
    pub storage: StorageOptions,
}

impl Default for WatcherOptions {
    fn default() -> Self {
        Self {
            filter: "*".to_string(),
            include_subdirectories: true,
            follow_symlinks: false,
            storage: StorageOptions::default(),
        }
    }
}

/// Size of the in-memory index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WatcherStats {
    /// Entries tracked after the last scan.
    pub entries: usize,
    /// Distinct path prefixes stored.
    pub paths: usize,
    /// Distinct path segments stored.
    pub segments: usize,
    /// Bytes of interned segment text.
    pub text_bytes: usize,
}

/// Reports changes under a directory by rescanning it on demand.
///
/// `S` is the hash-function factory used by the in-memory index.
pub struct DirectoryWatcher<S = DefaultHashBuilder> {
    root: PathBuf,
    options: WatcherOptions,
    filter: Box<dyn EntryFilter + Send>,
    detector: ChangeDetector<S>,
    attached: bool,
}

impl<S: BuildHasher> std::fmt::Debug for DirectoryWatcher<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryWatcher")
            .field("root", &self.root)
            .field("options", &self.options)
            .field("attached", &self.attached)
            .field("tracked", &self.detector.tracked())
            .finish()
    }
}

impl DirectoryWatcher {
    /// Creates a watcher whose filter is built from `options`.
    pub fn new(root: impl Into<PathBuf>, options: WatcherOptions) -> Result<Self> {
        let root = root.into();
        let filter = PatternFilter::new(&root, &options.filter, options.include_subdirectories)?;
        Self::with_filter(root, options, Box::new(filter))
    }

    /// Creates a watcher with a caller-supplied filter. The `filter` and
    /// `include_subdirectories` options are ignored.
    pub fn with_filter(
        root: impl Into<PathBuf>,
        options: WatcherOptions,
        filter: Box<dyn EntryFilter + Send>,
    ) -> Result<Self> {
        Self::with_hasher(root, options, filter, DefaultHashBuilder::default())
    }
}

impl<S: BuildHasher + Clone> DirectoryWatcher<S> {
    /// Creates a watcher whose index hashes with `hasher`.
    pub fn with_hasher(
        root: impl Into<PathBuf>,
        options: WatcherOptions,
        filter: Box<dyn EntryFilter + Send>,
        hasher: S,
    ) -> Result<Self> {
        let detector = ChangeDetector::with_hasher(&options.storage, hasher)?;
        Ok(Self {
            root: root.into(),
            options,
            filter,
            detector,
            attached: false,
        })
    }
}

impl<S: BuildHasher> DirectoryWatcher<S> {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Takes the baseline scan. Returns the number of entries tracked.
    pub fn attach(&mut self) -> Result<usize> {
        let start = Instant::now();
        self.scan()?;
        self.attached = true;

        let tracked = self.detector.tracked();
        info!(
            "Attached to {} ({} entries) in {:?}",
            self.root.display(),
            tracked,
            start.elapsed()
        );
        Ok(tracked)
    }

    /// Runs one scan and returns the changes since the previous one.
    pub fn get_changes(&mut self) -> Result<Vec<FileChange>> {
        if !self.attached {
            return Err(WatchError::NotAttached);
        }
        let start = Instant::now();
        let changes = self.scan()?;
        debug!(
            "Scanned {} with {} changes in {:?}",
            self.root.display(),
            changes.len(),
            start.elapsed()
        );
        Ok(changes)
    }

    pub fn stats(&self) -> WatcherStats {
        let paths = self.detector.paths();
        WatcherStats {
            entries: self.detector.tracked(),
            paths: paths.len(),
            segments: paths.segment_count(),
            text_bytes: paths.text_len(),
        }
    }

    fn scan(&mut self) -> Result<Vec<FileChange>> {
        match fs::metadata(&self.root) {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(WatchError::PathNotFound(self.root.clone()));
            }
            Err(e) => return Err(WatchError::io(&self.root, e)),
        }

        let detector = &mut self.detector;
        enumerate(
            &self.root,
            self.options.follow_symlinks,
            self.filter.as_ref(),
            |entry| detector.mark(entry),
        )?;
        detector.finish_cycle()
    }
}
