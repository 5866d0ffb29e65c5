//! Typed keyed set over [`HashBucket`].
//!
//! Values carry their own key. The set hashes keys with its hash-function
//! factory, re-checks every lookup candidate with [`SetEntry::matches`],
//! and rebuilds the underlying table whenever the size policy asks for it.
//!
//! Slot handles ([`SlotRef`]) are tagged with the table generation. Any
//! rebuild moves values to new slots and bumps the generation, so a handle
//! kept across an insert is rejected instead of silently pointing at
//! another value.

use std::hash::{BuildHasher, Hash};

use tracing::debug;

use crate::error::{CoreError, Result};
use crate::hash::{hash32, DefaultHashBuilder};
use crate::hash_bucket::HashBucket;
use crate::options::StorageOptions;
use crate::size_policy::{SizeLimits, SizePolicy};

/// A value that can live in a [`ReferenceSet`].
pub trait SetEntry: Default {
    type Key: Hash;

    /// Extracts the key this value is stored under.
    fn key(&self) -> Self::Key;

    /// Whether this value is the one stored under `key`.
    fn matches(&self, key: &Self::Key) -> bool;
}

/// Handle to a slot, valid until the owning set is rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotRef {
    index: usize,
    generation: u32,
}

impl SlotRef {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// Hash set of self-keyed values with automatic resizing.
#[derive(Debug)]
pub struct ReferenceSet<V, S = DefaultHashBuilder> {
    bucket: HashBucket<V>,
    /// Previous table, kept so the next rebuild can reuse its allocation.
    spare: Option<HashBucket<V>>,
    policy: SizePolicy,
    limits: SizeLimits,
    hasher: S,
    generation: u32,
}

impl<V: SetEntry> ReferenceSet<V> {
    /// Creates a set with the default hash-function factory.
    pub fn new(options: &StorageOptions) -> Result<Self> {
        Self::with_hasher(options, DefaultHashBuilder::default())
    }
}

impl<V: SetEntry, S: BuildHasher> ReferenceSet<V, S> {
    /// Creates a set that hashes keys with `hasher`.
    pub fn with_hasher(options: &StorageOptions, hasher: S) -> Result<Self> {
        let policy = options.validate()?;
        let capacity = options.initial_capacity();
        Ok(Self {
            bucket: HashBucket::new(capacity, options.chunk_size)?,
            spare: None,
            policy,
            limits: SizeLimits::for_capacity(&policy, capacity),
            hasher,
            generation: 0,
        })
    }

    /// Number of live values.
    pub fn len(&self) -> usize {
        self.bucket.usage()
    }

    pub fn is_empty(&self) -> bool {
        self.bucket.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.bucket.capacity()
    }

    /// Bumped on every rebuild.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    fn hash_key(&self, key: &V::Key) -> u32 {
        hash32(&self.hasher, key)
    }

    fn handle(&self, index: usize) -> SlotRef {
        SlotRef {
            index,
            generation: self.generation,
        }
    }

    fn check(&self, slot: SlotRef) -> Result<usize> {
        if slot.generation != self.generation {
            return Err(CoreError::StaleHandle {
                handle: slot.generation,
                current: self.generation,
            });
        }
        if slot.index >= self.capacity() {
            return Err(CoreError::out_of_range(slot.index, self.capacity()));
        }
        Ok(slot.index)
    }

    /// Finds the slot holding `key`.
    pub fn index_of(&self, key: &V::Key) -> Option<SlotRef> {
        let hash = self.hash_key(key);
        self.bucket
            .retrieve(hash)
            .find(|(_, value)| value.matches(key))
            .map(|(index, _)| self.handle(index))
    }

    pub fn contains_key(&self, key: &V::Key) -> bool {
        self.index_of(key).is_some()
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &V::Key) -> Option<&V> {
        let slot = self.index_of(key)?;
        self.bucket.at(slot.index)
    }

    pub fn get_mut(&mut self, key: &V::Key) -> Option<&mut V> {
        let slot = self.index_of(key)?;
        self.bucket.at_mut(slot.index)
    }

    /// Returns the value behind a handle.
    pub fn entry(&self, slot: SlotRef) -> Result<&V> {
        let index = self.check(slot)?;
        self.bucket.at(index).ok_or(CoreError::NotFound)
    }

    pub fn entry_mut(&mut self, slot: SlotRef) -> Result<&mut V> {
        let index = self.check(slot)?;
        self.bucket.at_mut(index).ok_or(CoreError::NotFound)
    }

    /// Soft-deletes the value behind a handle.
    pub fn delete_at(&mut self, slot: SlotRef) -> Result<()> {
        let index = self.check(slot)?;
        self.bucket.delete_at(index)
    }

    /// Soft-deletes the value stored under `key`.
    pub fn remove(&mut self, key: &V::Key) -> Result<()> {
        let slot = self.index_of(key).ok_or(CoreError::NotFound)?;
        self.delete_at(slot)
    }

    /// Inserts `value` under its own key.
    ///
    /// Fails with [`CoreError::DuplicateKey`] if the key is already stored.
    /// May rebuild the table first, which invalidates earlier handles.
    pub fn add(&mut self, value: V) -> Result<SlotRef> {
        let key = value.key();
        if self.contains_key(&key) {
            return Err(CoreError::DuplicateKey);
        }

        let usage = self.len() + 1;
        if !self.limits.contains(usage) {
            if let Some(capacity) = self.policy.must_resize(usage, self.capacity()) {
                if capacity != self.capacity() {
                    self.resize(capacity)?;
                }
            }
        }

        let hash = self.hash_key(&key);
        match self.bucket.try_store(hash, value) {
            Ok(index) => Ok(self.handle(index)),
            Err(value) => {
                self.resize(self.policy.grown(self.capacity()))?;
                let capacity = self.capacity();
                self.bucket
                    .try_store(hash, value)
                    .map(|index| self.handle(index))
                    .map_err(|_| CoreError::CapacityExhausted { capacity })
            }
        }
    }

    /// Rebuilds the table at `new_capacity`, re-placing every live value.
    ///
    /// Soft-deleted slots are purged here and nowhere else.
    pub fn resize(&mut self, new_capacity: usize) -> Result<()> {
        if new_capacity < self.len() {
            return Err(CoreError::InvalidParameter(format!(
                "cannot resize to {new_capacity} slots with {} live entries",
                self.len()
            )));
        }

        let old_capacity = self.capacity();
        let mut target = match self.spare.take() {
            Some(mut spare) => {
                spare.reset(new_capacity);
                spare
            }
            None => HashBucket::new(new_capacity, self.bucket.chunk_size())?,
        };

        let values = self.bucket.take_live();
        let live = values.len();
        for value in values {
            let hash = self.hash_key(&value.key());
            target
                .try_store(hash, value)
                .map_err(|_| CoreError::CapacityExhausted {
                    capacity: new_capacity,
                })?;
        }

        self.spare = Some(std::mem::replace(&mut self.bucket, target));
        self.limits = SizeLimits::for_capacity(&self.policy, new_capacity);
        self.generation = self.generation.wrapping_add(1);

        debug!(
            old_capacity,
            new_capacity,
            live,
            generation = self.generation,
            "Rebuilt reference set"
        );
        Ok(())
    }

    /// Live values with their handles, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotRef, &V)> + '_ {
        self.bucket
            .iter()
            .map(move |(index, value)| (self.handle(index), value))
    }

    /// Snapshot of live handles, for loops that mutate or delete.
    pub fn slots(&self) -> Vec<SlotRef> {
        self.bucket
            .live_indices()
            .map(|index| self.handle(index))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Item {
        id: u32,
        payload: String,
    }

    impl Item {
        fn new(id: u32, payload: &str) -> Self {
            Self {
                id,
                payload: payload.to_string(),
            }
        }
    }

    impl SetEntry for Item {
        type Key = u32;

        fn key(&self) -> u32 {
            self.id
        }

        fn matches(&self, key: &u32) -> bool {
            self.id == *key
        }
    }

    fn small_options() -> StorageOptions {
        StorageOptions {
            capacity: 8,
            chunk_size: 4,
            min_capacity: 4,
            ..Default::default()
        }
    }

    #[test]
    fn test_add_and_get() {
        let mut set = ReferenceSet::new(&small_options()).unwrap();
        set.add(Item::new(1, "one")).unwrap();
        set.add(Item::new(2, "two")).unwrap();

        assert_eq!(set.get(&1).map(|i| i.payload.as_str()), Some("one"));
        assert_eq!(set.get(&2).map(|i| i.payload.as_str()), Some("two"));
        assert!(set.get(&3).is_none());
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let mut set = ReferenceSet::new(&small_options()).unwrap();
        set.add(Item::new(1, "one")).unwrap();
        assert_eq!(
            set.add(Item::new(1, "again")).unwrap_err(),
            CoreError::DuplicateKey
        );
    }

    #[test]
    fn test_grows_past_fill_factor() {
        let mut set = ReferenceSet::new(&small_options()).unwrap();
        for id in 0..1000 {
            set.add(Item::new(id, "x")).unwrap();
        }

        assert_eq!(set.len(), 1000);
        assert!(set.capacity() * 70 / 100 >= 1000);
        assert!(set.generation() > 0);
        for id in 0..1000 {
            assert!(set.contains_key(&id), "lost {id}");
        }
    }

    #[test]
    fn test_stale_handle_rejected_after_resize() {
        let mut set = ReferenceSet::new(&small_options()).unwrap();
        let handle = set.add(Item::new(7, "seven")).unwrap();
        assert_eq!(set.entry(handle).unwrap().payload, "seven");

        set.resize(64).unwrap();
        assert!(matches!(
            set.entry(handle),
            Err(CoreError::StaleHandle { .. })
        ));

        let fresh = set.index_of(&7).unwrap();
        assert_eq!(set.entry(fresh).unwrap().payload, "seven");
    }

    #[test]
    fn test_delete_and_readd() {
        let mut set = ReferenceSet::new(&small_options()).unwrap();
        let handle = set.add(Item::new(3, "three")).unwrap();
        set.delete_at(handle).unwrap();

        assert!(!set.contains_key(&3));
        assert_eq!(set.entry(handle), Err(CoreError::NotFound));
        assert_eq!(set.remove(&3), Err(CoreError::NotFound));

        set.add(Item::new(3, "back")).unwrap();
        assert_eq!(set.get(&3).unwrap().payload, "back");
    }

    #[test]
    fn test_resize_purges_soft_deleted() {
        let mut set = ReferenceSet::new(&small_options()).unwrap();
        for id in 0..5 {
            set.add(Item::new(id, "x")).unwrap();
        }
        set.remove(&0).unwrap();
        set.remove(&1).unwrap();

        set.resize(32).unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.bucket.occupancy(), 3);
    }

    #[test]
    fn test_resize_below_usage_rejected() {
        let mut set = ReferenceSet::new(&small_options()).unwrap();
        for id in 0..5 {
            set.add(Item::new(id, "x")).unwrap();
        }
        assert!(matches!(
            set.resize(4),
            Err(CoreError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_get_mut_updates_in_place() {
        let mut set = ReferenceSet::new(&small_options()).unwrap();
        set.add(Item::new(9, "old")).unwrap();
        set.get_mut(&9).unwrap().payload = "new".into();
        assert_eq!(set.get(&9).unwrap().payload, "new");
    }

    #[test]
    fn test_shrinks_when_sparse() {
        let options = StorageOptions {
            capacity: 1000,
            chunk_size: 16,
            min_capacity: 4,
            min_fill_factor: 30,
            ..Default::default()
        };
        let mut set = ReferenceSet::new(&options).unwrap();
        for id in 0..10 {
            set.add(Item::new(id, "x")).unwrap();
        }
        assert!(set.capacity() < 1000);
        assert_eq!(set.len(), 10);
    }

    #[test]
    fn test_iter_visits_every_live_value() {
        let mut set = ReferenceSet::new(&small_options()).unwrap();
        for id in 0..20 {
            set.add(Item::new(id, "x")).unwrap();
        }
        set.remove(&5).unwrap();

        let mut ids: Vec<_> = set.iter().map(|(_, item)| item.id).collect();
        ids.sort_unstable();
        let expected: Vec<_> = (0..20).filter(|id| *id != 5).collect();
        assert_eq!(ids, expected);
        assert_eq!(set.slots().len(), 19);
    }
}
