//! Per-file scan state.

use bitflags::bitflags;
use dirdelta_core::{hash32, SetEntry};
use std::time::{SystemTime, UNIX_EPOCH};

bitflags! {
    /// What happened to an entry during the current cycle.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StateFlags: u8 {
        /// Reported by the enumerator this cycle.
        const SEEN = 1;
        /// First reported this cycle.
        const CREATED = 1 << 1;
        /// Signature differs from the previous cycle.
        const CHANGED = 1 << 2;
    }
}

/// Tracked state of one directory entry, keyed by its interned directory
/// and file name references.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FileState {
    pub directory: u32,
    pub name: u32,
    pub signature: u32,
    pub flags: StateFlags,
}

impl FileState {
    /// A state first seen in the current cycle.
    pub fn created(directory: u32, name: u32, signature: u32) -> Self {
        Self {
            directory,
            name,
            signature,
            flags: StateFlags::SEEN | StateFlags::CREATED,
        }
    }

    pub fn is_seen(&self) -> bool {
        self.flags.contains(StateFlags::SEEN)
    }

    /// Records a sighting in the current cycle, flagging a change when
    /// the signature moved.
    pub fn observe(&mut self, signature: u32) {
        if self.signature != signature {
            self.signature = signature;
            self.flags |= StateFlags::CHANGED;
        }
        self.flags |= StateFlags::SEEN;
    }
}

impl SetEntry for FileState {
    type Key = (u32, u32);

    fn key(&self) -> (u32, u32) {
        (self.directory, self.name)
    }

    fn matches(&self, key: &(u32, u32)) -> bool {
        self.directory == key.0 && self.name == key.1
    }
}

/// Cheap change indicator derived from modification time and length.
///
/// This is not a content hash: a rewrite that keeps both the timestamp
/// and the length, or a hash collision, goes unnoticed.
pub fn signature(last_write: SystemTime, len: u64) -> u32 {
    let nanos: i128 = match last_write.duration_since(UNIX_EPOCH) {
        Ok(after) => after.as_nanos() as i128,
        Err(before) => -(before.duration().as_nanos() as i128),
    };
    hash32(&fnv::FnvBuildHasher::default(), &(nanos, len))
}
