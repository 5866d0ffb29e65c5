//! Hierarchical path interning.
//!
//! A stored path is a chain of entries from leaf to root. Each entry
//! holds the interned text of its last segment, separator included, and
//! the index of the entry for everything before it. `"/a/b/c"` becomes
//! `"/c" -> "/b" -> "/a" -> root`, and `"/a/b/d"` reuses the `"/b"` and
//! `"/a"` entries. Directory trees share long prefixes, so storage grows
//! with the number of distinct segments rather than total path length.
//!
//! Lookup hashes the whole path and verifies each candidate by walking
//! its chain, comparing segments against the tail of the candidate string.

use std::hash::BuildHasher;
use std::path::is_separator;

use tracing::debug;

use crate::char_buffer::HashedCharBuffer;
use crate::error::{CoreError, Result};
use crate::hash::{hash32, DefaultHashBuilder};
use crate::hash_bucket::HashBucket;
use crate::options::StorageOptions;
use crate::size_policy::SizePolicy;

#[derive(Debug, Clone, Copy)]
struct PathEntry {
    text_ref: u32,
    parent: Option<u32>,
}

/// Deduplicating store of path strings, addressed by `u32` references.
#[derive(Debug)]
pub struct PathStorage<S = DefaultHashBuilder> {
    text: HashedCharBuffer<S>,
    entries: Vec<PathEntry>,
    lookup: HashBucket<u32>,
    policy: SizePolicy,
    hasher: S,
}

impl PathStorage {
    pub fn new(options: &StorageOptions) -> Result<Self> {
        Self::with_hasher(options, DefaultHashBuilder::default())
    }
}

impl<S: BuildHasher + Clone> PathStorage<S> {
    pub fn with_hasher(options: &StorageOptions, hasher: S) -> Result<Self> {
        Ok(Self {
            text: HashedCharBuffer::with_hasher(options, hasher.clone())?,
            entries: Vec::new(),
            lookup: HashBucket::new(options.initial_capacity(), options.chunk_size)?,
            policy: options.validate()?,
            hasher,
        })
    }
}

impl<S: BuildHasher> PathStorage<S> {
    /// Number of stored chain entries (distinct path prefixes).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct segment strings held by the text buffer.
    pub fn segment_count(&self) -> usize {
        self.text.len()
    }

    /// Bytes of interned segment text.
    pub fn text_len(&self) -> usize {
        self.text.text_len()
    }

    /// Reference of `path` if it was stored before.
    pub fn find(&self, path: &str) -> Option<u32> {
        self.find_hashed(path, hash32(&self.hasher, path))
    }

    fn find_hashed(&self, path: &str, hash: u32) -> Option<u32> {
        self.lookup
            .retrieve(hash)
            .map(|(_, index)| *index)
            .find(|&index| self.chain_matches(index, path))
    }

    /// Walks the chain at `index`, peeling segments off the end of
    /// `candidate`. Matches only if both run out together.
    fn chain_matches(&self, mut index: u32, candidate: &str) -> bool {
        let mut rest = candidate;
        loop {
            let entry = self.entries[index as usize];
            let Some(segment) = self.text.get(entry.text_ref) else {
                return false;
            };
            match rest.strip_suffix(segment) {
                Some(prefix) => rest = prefix,
                None => return false,
            }
            match entry.parent {
                Some(parent) => index = parent,
                None => return rest.is_empty(),
            }
        }
    }

    /// Stores `path` and returns its reference. Storing the same string
    /// again returns the same reference.
    pub fn store(&mut self, path: &str) -> Result<u32> {
        if path.is_empty() {
            return Err(CoreError::InvalidParameter(
                "cannot store an empty path".into(),
            ));
        }

        // Walk towards the root until a stored prefix is found, remembering
        // every missing level, then create the missing levels top-down.
        let mut pending: Vec<(&str, u32)> = Vec::new();
        let mut current = path;
        let mut parent = loop {
            let hash = hash32(&self.hasher, current);
            if let Some(index) = self.find_hashed(current, hash) {
                break Some(index);
            }
            pending.push((current, hash));
            match split_last_segment(current) {
                Some((prefix, _)) if !prefix.is_empty() => current = prefix,
                _ => break None,
            }
        };

        while let Some((prefix, hash)) = pending.pop() {
            let segment = split_last_segment(prefix).map_or(prefix, |(_, segment)| segment);
            parent = Some(self.push_entry(segment, parent, hash)?);
        }

        parent.ok_or(CoreError::NotFound)
    }

    fn push_entry(&mut self, segment: &str, parent: Option<u32>, hash: u32) -> Result<u32> {
        let index = u32::try_from(self.entries.len())
            .map_err(|_| CoreError::InvalidParameter("too many stored paths".into()))?;
        let text_ref = self.text.intern(segment)?;
        self.entries.push(PathEntry { text_ref, parent });

        if let Some(capacity) = self
            .policy
            .must_resize(self.lookup.usage() + 1, self.lookup.capacity())
        {
            self.rebuild_lookup(capacity)?;
        }
        if self.lookup.try_store(hash, index).is_err() {
            self.rebuild_lookup(self.lookup.capacity().max(1) * 2)?;
            self.lookup
                .try_store(hash, index)
                .map_err(|_| CoreError::CapacityExhausted {
                    capacity: self.lookup.capacity(),
                })?;
        }
        Ok(index)
    }

    /// Re-hashes every placed entry into a table of `capacity` slots.
    /// Full path strings are not kept, so each one is rebuilt first.
    fn rebuild_lookup(&mut self, capacity: usize) -> Result<()> {
        let placed = self.lookup.usage();
        let capacity = capacity.max(placed + 1);
        let hashes = (0..placed as u32)
            .map(|index| {
                self.create_string(index)
                    .map(|path| hash32(&self.hasher, path.as_str()))
            })
            .collect::<Result<Vec<_>>>()?;

        self.lookup.reset(capacity);
        for (index, hash) in hashes.into_iter().enumerate() {
            self.lookup
                .try_store(hash, index as u32)
                .map_err(|_| CoreError::CapacityExhausted { capacity })?;
        }
        debug!(capacity, paths = placed, "Rebuilt path lookup table");
        Ok(())
    }

    /// Rebuilds the full path string for a reference.
    pub fn create_string(&self, index: u32) -> Result<String> {
        let mut segments = Vec::new();
        let mut total = 0;
        let mut current = Some(index);
        while let Some(i) = current {
            let entry = self
                .entries
                .get(i as usize)
                .ok_or_else(|| CoreError::out_of_range(i as usize, self.entries.len()))?;
            let segment = self.text.get(entry.text_ref).ok_or(CoreError::NotFound)?;
            total += segment.len();
            segments.push(segment);
            current = entry.parent;
        }

        let mut path = String::with_capacity(total);
        for segment in segments.iter().rev() {
            path.push_str(segment);
        }
        Ok(path)
    }

    /// Reference of the parent path, if `index` has one.
    pub fn parent_of(&self, index: u32) -> Option<u32> {
        self.entries.get(index as usize)?.parent
    }
}

/// Splits at the last separator. The segment keeps the separator.
fn split_last_segment(path: &str) -> Option<(&str, &str)> {
    let position = path.rfind(is_separator)?;
    Some(path.split_at(position))
}
