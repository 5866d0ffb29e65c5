//! Change detection over repeated scans.
//!
//! Each cycle the enumerator reports every entry it finds through
//! [`ChangeDetector::mark`]. Marking interns the entry's directory and name,
//! then creates or updates its [`FileState`]. [`ChangeDetector::finish_cycle`]
//! then sorts the tracked states into created, changed and removed, pairs
//! up renames, soft-deletes what was not seen and clears the flags of
//! everything that was.
//!
//! Rename pairing joins creates against removals twice: once on
//! `(signature, directory)` and once on `(signature, name)`. A pair is only
//! reported when its join group holds exactly one create and one removal.
//! An entry that is both renamed and moved in the same cycle matches
//! neither join and is reported as a delete plus a create.

use dirdelta_core::{DefaultHashBuilder, PathStorage, ReferenceSet, StorageOptions};
use fnv::FnvHashMap;
use serde::Serialize;
use std::fmt;
use std::hash::BuildHasher;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::enumerator::EntryInfo;
use crate::error::Result;
use crate::state::{signature, FileState, StateFlags};

/// Kind of change reported for an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Created,
    Changed,
    Deleted,
    Renamed,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Changed => "changed",
            Self::Deleted => "deleted",
            Self::Renamed => "renamed",
        };
        write!(f, "{}", s)
    }
}

/// One reported change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileChange {
    pub directory: String,
    pub name: String,
    pub change_type: ChangeType,
    /// Previous location, set for renames only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_directory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_name: Option<String>,
}

impl FileChange {
    fn new(directory: String, name: String, change_type: ChangeType) -> Self {
        Self {
            directory,
            name,
            change_type,
            old_directory: None,
            old_name: None,
        }
    }

    /// Full path of the entry after the change.
    pub fn path(&self) -> PathBuf {
        Path::new(&self.directory).join(&self.name)
    }

    /// Full path before a rename.
    pub fn old_path(&self) -> Option<PathBuf> {
        match (&self.old_directory, &self.old_name) {
            (Some(dir), Some(name)) => Some(Path::new(dir).join(name)),
            _ => None,
        }
    }
}

/// Where the detector is within a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Scanning,
}

/// Tracks file states across scans and computes per-cycle diffs.
#[derive(Debug)]
pub struct ChangeDetector<S = DefaultHashBuilder> {
    paths: PathStorage<S>,
    files: ReferenceSet<FileState, S>,
    phase: Phase,
}

impl ChangeDetector {
    pub fn new(options: &StorageOptions) -> dirdelta_core::Result<Self> {
        Self::with_hasher(options, DefaultHashBuilder::default())
    }
}

impl<S: BuildHasher + Clone> ChangeDetector<S> {
    pub fn with_hasher(options: &StorageOptions, hasher: S) -> dirdelta_core::Result<Self> {
        Ok(Self {
            paths: PathStorage::with_hasher(options, hasher.clone())?,
            files: ReferenceSet::with_hasher(options, hasher)?,
            phase: Phase::Idle,
        })
    }
}

impl<S: BuildHasher> ChangeDetector<S> {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Entries tracked after the last completed cycle.
    pub fn tracked(&self) -> usize {
        self.files.len()
    }

    /// Interned path storage shared by directories and names.
    pub fn paths(&self) -> &PathStorage<S> {
        &self.paths
    }

    /// Records one entry reported by the enumerator.
    pub fn mark(&mut self, entry: &EntryInfo<'_>) -> Result<()> {
        self.phase = Phase::Scanning;

        let directory = self.paths.store(entry.parent)?;
        let name = self.paths.store(entry.name)?;
        let signature = signature(entry.last_write, entry.len);

        match self.files.get_mut(&(directory, name)) {
            Some(state) => state.observe(signature),
            None => {
                self.files
                    .add(FileState::created(directory, name, signature))?;
            }
        }
        Ok(())
    }

    /// Computes the diff for the cycle and prepares for the next one.
    pub fn finish_cycle(&mut self) -> Result<Vec<FileChange>> {
        let changes = self.diff()?;
        self.sweep()?;
        self.phase = Phase::Idle;
        Ok(changes)
    }

    fn diff(&self) -> Result<Vec<FileChange>> {
        let mut created = Vec::new();
        let mut changed = Vec::new();
        let mut removed = Vec::new();

        for (_, state) in self.files.iter() {
            if !state.is_seen() {
                removed.push(*state);
            } else if state.flags.contains(StateFlags::CREATED) {
                created.push(*state);
            } else if state.flags.contains(StateFlags::CHANGED) {
                changed.push(*state);
            }
        }

        let renames = match_renames(&created, &removed);
        let mut renamed_created = vec![false; created.len()];
        let mut renamed_removed = vec![false; removed.len()];
        let mut changes = Vec::with_capacity(created.len() + changed.len() + removed.len());

        for &(c, r) in &renames {
            renamed_created[c] = true;
            renamed_removed[r] = true;
            let mut change = self.change_for(&created[c], ChangeType::Renamed)?;
            change.old_directory = Some(self.paths.create_string(removed[r].directory)?);
            change.old_name = Some(self.paths.create_string(removed[r].name)?);
            changes.push(change);
        }
        for (state, _) in created.iter().zip(&renamed_created).filter(|(_, r)| !**r) {
            changes.push(self.change_for(state, ChangeType::Created)?);
        }
        for state in &changed {
            changes.push(self.change_for(state, ChangeType::Changed)?);
        }
        for (state, _) in removed.iter().zip(&renamed_removed).filter(|(_, r)| !**r) {
            changes.push(self.change_for(state, ChangeType::Deleted)?);
        }

        debug!(
            created = created.len() - renames.len(),
            changed = changed.len(),
            deleted = removed.len() - renames.len(),
            renamed = renames.len(),
            "Scan cycle diffed"
        );
        Ok(changes)
    }

    fn change_for(&self, state: &FileState, change_type: ChangeType) -> Result<FileChange> {
        Ok(FileChange::new(
            self.paths.create_string(state.directory)?,
            self.paths.create_string(state.name)?,
            change_type,
        ))
    }

    /// Soft-deletes every state not seen this cycle and resets the flags
    /// of the rest.
    fn sweep(&mut self) -> Result<()> {
        for slot in self.files.slots() {
            let state = self.files.entry_mut(slot)?;
            if state.is_seen() {
                state.flags = StateFlags::empty();
            } else {
                self.files.delete_at(slot)?;
            }
        }
        Ok(())
    }
}

/// Pairs creates with removals. Returns `(created_index, removed_index)`
/// pairs, directory join first, then name join over what is left.
fn match_renames(created: &[FileState], removed: &[FileState]) -> Vec<(usize, usize)> {
    if created.is_empty() || removed.is_empty() {
        return Vec::new();
    }

    let mut used_created = vec![false; created.len()];
    let mut used_removed = vec![false; removed.len()];
    let mut pairs = Vec::new();

    let by_directory = unambiguous_pairs(created, removed, |s| (s.signature, s.directory));
    let by_name = unambiguous_pairs(created, removed, |s| (s.signature, s.name));

    for (c, r) in by_directory.into_iter().chain(by_name) {
        if used_created[c] || used_removed[r] {
            continue;
        }
        used_created[c] = true;
        used_removed[r] = true;
        pairs.push((c, r));
    }
    pairs
}

/// Inner join of creates and removals on `key`, keeping groups with
/// exactly one entry on each side.
fn unambiguous_pairs<K>(
    created: &[FileState],
    removed: &[FileState],
    key: K,
) -> Vec<(usize, usize)>
where
    K: Fn(&FileState) -> (u32, u32),
{
    let mut groups: FnvHashMap<(u32, u32), (Vec<usize>, Vec<usize>)> = FnvHashMap::default();
    for (i, state) in created.iter().enumerate() {
        groups.entry(key(state)).or_default().0.push(i);
    }
    for (i, state) in removed.iter().enumerate() {
        if let Some(group) = groups.get_mut(&key(state)) {
            group.1.push(i);
        }
    }

    let mut pairs: Vec<_> = groups
        .into_values()
        .filter(|(c, r)| c.len() == 1 && r.len() == 1)
        .map(|(c, r)| (c[0], r[0]))
        .collect();
    pairs.sort_unstable();
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    const DIR: &str = "/data";

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn entry<'a>(parent: &'a str, name: &'a str, time: SystemTime, len: u64) -> EntryInfo<'a> {
        EntryInfo {
            parent,
            name,
            is_directory: false,
            last_write: time,
            len,
        }
    }

    fn detector() -> ChangeDetector {
        let options = StorageOptions {
            capacity: 8,
            chunk_size: 4,
            min_capacity: 4,
            ..Default::default()
        };
        ChangeDetector::new(&options).unwrap()
    }

    fn cycle(detector: &mut ChangeDetector, entries: &[EntryInfo<'_>]) -> Vec<FileChange> {
        for e in entries {
            detector.mark(e).unwrap();
        }
        detector.finish_cycle().unwrap()
    }

    fn kinds(changes: &[FileChange]) -> Vec<(ChangeType, &str)> {
        changes
            .iter()
            .map(|c| (c.change_type, c.name.as_str()))
            .collect()
    }

    #[test]
    fn test_first_cycle_reports_creates() {
        let mut d = detector();
        let changes = cycle(&mut d, &[entry(DIR, "a.txt", at(1), 1)]);
        assert_eq!(kinds(&changes), vec![(ChangeType::Created, "a.txt")]);
        assert_eq!(changes[0].directory, DIR);
        assert_eq!(d.phase(), Phase::Idle);
    }

    #[test]
    fn test_unchanged_cycle_is_empty() {
        let mut d = detector();
        let entries = [entry(DIR, "a.txt", at(1), 1), entry(DIR, "b.txt", at(2), 2)];
        cycle(&mut d, &entries);
        assert!(cycle(&mut d, &entries).is_empty());
        assert_eq!(d.tracked(), 2);
    }

    #[test]
    fn test_changed_signature() {
        let mut d = detector();
        cycle(&mut d, &[entry(DIR, "a.txt", at(1), 6)]);
        let changes = cycle(&mut d, &[entry(DIR, "a.txt", at(2), 9)]);
        assert_eq!(kinds(&changes), vec![(ChangeType::Changed, "a.txt")]);

        // Flags are cleared, so the same signature next time is quiet.
        assert!(cycle(&mut d, &[entry(DIR, "a.txt", at(2), 9)]).is_empty());
    }

    #[test]
    fn test_deleted_entry_is_swept() {
        let mut d = detector();
        cycle(
            &mut d,
            &[entry(DIR, "a.txt", at(1), 1), entry(DIR, "b.txt", at(5), 2)],
        );
        let changes = cycle(&mut d, &[entry(DIR, "a.txt", at(1), 1)]);
        assert_eq!(kinds(&changes), vec![(ChangeType::Deleted, "b.txt")]);
        assert_eq!(d.tracked(), 1);

        assert!(cycle(&mut d, &[entry(DIR, "a.txt", at(1), 1)]).is_empty());
    }

    #[test]
    fn test_rename_in_same_directory() {
        let mut d = detector();
        cycle(&mut d, &[entry(DIR, "a.txt", at(7), 3)]);
        let changes = cycle(&mut d, &[entry(DIR, "b.txt", at(7), 3)]);

        assert_eq!(changes.len(), 1);
        let change = &changes[0];
        assert_eq!(change.change_type, ChangeType::Renamed);
        assert_eq!(change.name, "b.txt");
        assert_eq!(change.old_name.as_deref(), Some("a.txt"));
        assert_eq!(change.old_directory.as_deref(), Some(DIR));
    }

    #[test]
    fn test_move_to_other_directory_keeps_name() {
        let mut d = detector();
        cycle(&mut d, &[entry("/src", "lib.rs", at(3), 40)]);
        let changes = cycle(&mut d, &[entry("/dst", "lib.rs", at(3), 40)]);

        assert_eq!(kinds(&changes), vec![(ChangeType::Renamed, "lib.rs")]);
        assert_eq!(changes[0].directory, "/dst");
        assert_eq!(changes[0].old_directory.as_deref(), Some("/src"));
    }

    #[test]
    fn test_ambiguous_rename_not_inferred() {
        let mut d = detector();
        cycle(
            &mut d,
            &[entry(DIR, "a.txt", at(7), 3), entry(DIR, "c.txt", at(7), 3)],
        );
        let changes = cycle(&mut d, &[entry(DIR, "b.txt", at(7), 3)]);

        let mut found = kinds(&changes);
        found.sort_by_key(|(_, name)| name.to_string());
        assert_eq!(
            found,
            vec![
                (ChangeType::Deleted, "a.txt"),
                (ChangeType::Created, "b.txt"),
                (ChangeType::Deleted, "c.txt"),
            ]
        );
    }

    #[test]
    fn test_rename_and_move_reported_separately() {
        let mut d = detector();
        cycle(&mut d, &[entry("/src", "old.rs", at(3), 40)]);
        let changes = cycle(&mut d, &[entry("/dst", "new.rs", at(3), 40)]);

        assert_eq!(
            kinds(&changes),
            vec![
                (ChangeType::Created, "new.rs"),
                (ChangeType::Deleted, "old.rs"),
            ]
        );
    }

    #[test]
    fn test_different_signature_is_not_rename() {
        let mut d = detector();
        cycle(&mut d, &[entry(DIR, "a.txt", at(7), 3)]);
        let changes = cycle(&mut d, &[entry(DIR, "b.txt", at(8), 3)]);
        assert_eq!(
            kinds(&changes),
            vec![
                (ChangeType::Created, "b.txt"),
                (ChangeType::Deleted, "a.txt"),
            ]
        );
    }

    #[test]
    fn test_many_entries_survive_growth() {
        let mut d = detector();
        let names: Vec<String> = (0..500).map(|i| format!("f{i}.txt")).collect();
        let entries: Vec<_> = names
            .iter()
            .map(|n| entry("/bulk", n.as_str(), at(1), 1))
            .collect();

        assert_eq!(cycle(&mut d, &entries).len(), 500);
        assert!(cycle(&mut d, &entries).is_empty());
        assert_eq!(d.tracked(), 500);
    }

    #[test]
    fn test_recreated_after_delete() {
        let mut d = detector();
        cycle(&mut d, &[entry(DIR, "a.txt", at(1), 1)]);
        cycle(&mut d, &[]);
        let changes = cycle(&mut d, &[entry(DIR, "a.txt", at(1), 1)]);
        assert_eq!(kinds(&changes), vec![(ChangeType::Created, "a.txt")]);
    }

    #[test]
    fn test_change_paths() {
        let change = FileChange {
            directory: "/a".into(),
            name: "b".into(),
            change_type: ChangeType::Renamed,
            old_directory: Some("/c".into()),
            old_name: Some("d".into()),
        };
        assert_eq!(change.path(), PathBuf::from("/a/b"));
        assert_eq!(change.old_path(), Some(PathBuf::from("/c/d")));
    }

    #[test]
    fn test_change_serializes_without_empty_fields() {
        let change = FileChange::new("/a".into(), "b".into(), ChangeType::Created);
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["change_type"], "created");
        assert!(json.get("old_name").is_none());
    }
}
