//! Construction options shared by the tables.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::size_policy::SizePolicy;

/// Flat numeric options consumed when a storage structure is built.
///
/// The hash function is not part of this struct; it is chosen through
/// the `BuildHasher` type parameter of each table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageOptions {
    /// Initial slot count of each table.
    pub capacity: usize,
    /// Slots sharing one recorded probe depth.
    pub chunk_size: usize,
    /// Percent of capacity that may be live before growing.
    pub fill_factor: u32,
    /// Tables never shrink below this many slots.
    pub min_capacity: usize,
    /// Percent of capacity below which a table shrinks.
    pub min_fill_factor: u32,
    /// Percent added to the capacity on each growth step.
    pub growth_factor: u32,
    /// Fill percent a shrunk table is sized for.
    pub shrink_to_fill_factor: u32,
    /// Initial byte capacity of the interned text buffer.
    pub initial_char_capacity: usize,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            capacity: 1024,
            chunk_size: 64,
            fill_factor: 70,
            min_capacity: 16,
            min_fill_factor: 20,
            growth_factor: 100,
            shrink_to_fill_factor: 60,
            initial_char_capacity: 4096,
        }
    }
}

impl StorageOptions {
    /// Validates the thresholds and builds the shared size policy.
    pub fn size_policy(&self) -> Result<SizePolicy> {
        SizePolicy::new(
            self.fill_factor,
            self.min_fill_factor,
            self.growth_factor,
            self.shrink_to_fill_factor,
            self.min_capacity,
        )
    }

    /// Checks every option, not just the size policy.
    pub fn validate(&self) -> Result<SizePolicy> {
        if self.chunk_size == 0 {
            return Err(CoreError::InvalidConfig(
                "chunk_size must be at least 1".into(),
            ));
        }
        self.size_policy()
    }

    /// Initial capacity, lifted to the policy minimum.
    pub fn initial_capacity(&self) -> usize {
        self.capacity.max(self.min_capacity)
    }
}
