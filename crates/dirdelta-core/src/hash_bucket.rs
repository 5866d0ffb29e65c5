//! Fixed-capacity open-addressing slot table.
//!
//! A value hashed to `h` has two probe starts: the primary slot
//! `h % capacity` and the secondary slot `permute(h) % capacity`. Placement
//! walks a [`DualCursor`] over both chains and takes the first slot that
//! is either never used or soft-deleted.
//!
//! Slots are grouped into chunks. For each chunk the table remembers the
//! longest walk ever needed to place a value whose primary slot falls in
//! that chunk. Lookups replay the same walk but stop at that depth, so a
//! miss costs at most the worst placement seen nearby rather than a scan
//! of the whole table.
//!
//! Deletion is soft: the slot keeps its value and its in-use bit, and is
//! only reclaimed by a later placement or by rebuilding the table. A slot
//! that has been used once stays used until the rebuild, which is what
//! lets lookups stop a chain at the first never-used slot.

use crate::bit_vector::BitVector;
use crate::cursor::DualCursor;
use crate::error::{CoreError, Result};
use crate::hash::permute;

/// Open-addressing table of `T` with soft deletion.
#[derive(Debug, Clone)]
pub struct HashBucket<T> {
    slots: Vec<T>,
    in_use: BitVector,
    soft_deleted: BitVector,
    probe_depth: Vec<u32>,
    chunk_size: usize,
    usage: usize,
    occupancy: usize,
}

impl<T: Default> HashBucket<T> {
    /// Creates an empty table with `capacity` slots grouped into chunks of
    /// `chunk_size`.
    pub fn new(capacity: usize, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(CoreError::InvalidParameter(
                "chunk_size must be at least 1".into(),
            ));
        }
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, T::default);

        Ok(Self {
            slots,
            in_use: BitVector::new(capacity),
            soft_deleted: BitVector::new(capacity),
            probe_depth: vec![0; capacity.div_ceil(chunk_size)],
            chunk_size,
            usage: 0,
            occupancy: 0,
        })
    }

    /// Empties the table and gives it a new capacity, reusing the existing
    /// allocations. Residual values are dropped and replaced by defaults.
    pub fn reset(&mut self, capacity: usize) {
        self.slots.clear();
        self.slots.resize_with(capacity, T::default);
        self.in_use.reset(capacity);
        self.soft_deleted.reset(capacity);
        self.probe_depth.clear();
        self.probe_depth.resize(capacity.div_ceil(self.chunk_size), 0);
        self.usage = 0;
        self.occupancy = 0;
    }

    /// Places `value` for `hash`, returning its slot index.
    ///
    /// Gives the value back when no slot is free; the caller is expected
    /// to rebuild at a larger capacity and retry.
    pub fn try_store(&mut self, hash: u32, value: T) -> std::result::Result<usize, T> {
        let capacity = self.capacity();
        if capacity == 0 || self.usage >= capacity {
            return Err(value);
        }

        let (primary, secondary) = self.starts(hash);
        let mut probe = DualCursor::probe(capacity, primary, secondary);
        while let Some((index, _)) = probe.next() {
            let reusable = self.soft_deleted.get(index);
            if self.in_use.get(index) && !reusable {
                continue;
            }

            if reusable {
                self.soft_deleted.set(index, false);
            } else {
                self.in_use.set(index, true);
                self.occupancy += 1;
            }
            self.usage += 1;
            self.slots[index] = value;

            let chunk = primary / self.chunk_size;
            let depth = u32::try_from(probe.move_count()).unwrap_or(u32::MAX);
            if depth > self.probe_depth[chunk] {
                self.probe_depth[chunk] = depth;
            }
            return Ok(index);
        }

        Err(value)
    }

    /// Moves every live value out, leaving the table empty at its current
    /// capacity. Used when rebuilding into a differently sized table.
    pub fn take_live(&mut self) -> Vec<T> {
        let live: Vec<usize> = self.live_indices().collect();
        let values = live
            .into_iter()
            .map(|index| std::mem::take(&mut self.slots[index]))
            .collect();
        let capacity = self.capacity();
        self.reset(capacity);
        values
    }
}

impl<T> HashBucket<T> {
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Live (in use, not soft-deleted) slots.
    pub fn usage(&self) -> usize {
        self.usage
    }

    /// Slots ever used since the last rebuild, soft-deleted ones included.
    pub fn occupancy(&self) -> usize {
        self.occupancy
    }

    pub fn is_empty(&self) -> bool {
        self.usage == 0
    }

    /// Deepest placement walk recorded for `chunk`.
    pub fn probe_depth(&self, chunk: usize) -> usize {
        self.probe_depth.get(chunk).copied().unwrap_or(0) as usize
    }

    /// Whether `index` holds a live value.
    pub fn is_live(&self, index: usize) -> bool {
        self.in_use.get(index) && !self.soft_deleted.get(index)
    }

    /// Returns the live value at `index`.
    pub fn at(&self, index: usize) -> Option<&T> {
        self.is_live(index).then(|| &self.slots[index])
    }

    pub fn at_mut(&mut self, index: usize) -> Option<&mut T> {
        if self.is_live(index) {
            Some(&mut self.slots[index])
        } else {
            None
        }
    }

    /// Soft-deletes the value at `index`. The value stays in place until
    /// the slot is reused or the table is rebuilt.
    pub fn delete_at(&mut self, index: usize) -> Result<()> {
        if index >= self.capacity() {
            return Err(CoreError::out_of_range(index, self.capacity()));
        }
        if !self.is_live(index) {
            return Err(CoreError::NotFound);
        }
        self.soft_deleted.set(index, true);
        self.usage -= 1;
        Ok(())
    }

    /// Live values that may have been stored under `hash`.
    ///
    /// The sequence can include values stored under other hashes; callers
    /// must check each candidate against their key.
    pub fn retrieve(&self, hash: u32) -> Candidates<'_, T> {
        let capacity = self.capacity();
        if capacity == 0 {
            return Candidates {
                bucket: self,
                probe: DualCursor::probe(0, 0, 0),
                remaining: 0,
            };
        }
        let (primary, secondary) = self.starts(hash);
        Candidates {
            bucket: self,
            probe: DualCursor::probe(capacity, primary, secondary),
            remaining: self.probe_depth(primary / self.chunk_size),
        }
    }

    /// Slot indices of live values in ascending order.
    pub fn live_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.in_use
            .iter_ones()
            .filter(move |&index| !self.soft_deleted.get(index))
    }

    /// Live values with their slot indices, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        self.live_indices().map(move |index| (index, &self.slots[index]))
    }

    fn starts(&self, hash: u32) -> (usize, usize) {
        let capacity = self.capacity();
        (
            hash as usize % capacity,
            permute(hash) as usize % capacity,
        )
    }
}

/// Iterator over lookup candidates for one hash.
pub struct Candidates<'a, T> {
    bucket: &'a HashBucket<T>,
    probe: DualCursor,
    remaining: usize,
}

impl<'a, T> Iterator for Candidates<'a, T> {
    type Item = (usize, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        while self.remaining > 0 {
            let (index, chain) = self.probe.next()?;
            self.remaining -= 1;

            if !self.bucket.in_use.get(index) {
                // Nothing placed on this chain ever walked past here.
                self.probe.end_chain(chain);
                continue;
            }
            if self.bucket.soft_deleted.get(index) {
                continue;
            }
            return Some((index, &self.bucket.slots[index]));
        }
        None
    }
}
