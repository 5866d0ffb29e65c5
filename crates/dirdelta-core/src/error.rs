//! Error types for the storage engine.
//!
//! Capacity exhaustion is normally recovered inside the tables by
//! resizing, so most callers only ever see configuration, parameter,
//! and lookup errors.

use thiserror::Error;

/// Convenience type for fallible storage operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Things that can go wrong inside the storage engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A size policy or options value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A caller passed an argument the operation cannot accept.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Slot index beyond the table's capacity.
    #[error("index {index} out of range for capacity {capacity}")]
    IndexOutOfRange { index: usize, capacity: usize },

    /// The key or slot is absent. Soft-deleted slots report this too.
    #[error("entry not found")]
    NotFound,

    /// `add` was called with a key that is already stored.
    #[error("key already present")]
    DuplicateKey,

    /// The handle was issued before the table was last rebuilt.
    #[error("stale handle: generation {handle} but table is at {current}")]
    StaleHandle { handle: u32, current: u32 },

    /// Text would push the character buffer past 32-bit offsets.
    #[error("text of {len} bytes does not fit in the character buffer")]
    TextTooLong { len: usize },

    /// A store failed even after the table was rebuilt. This means the
    /// size policy left no headroom and is an internal fault.
    #[error("table exhausted at capacity {capacity} after resize")]
    CapacityExhausted { capacity: usize },
}

impl CoreError {
    /// Creates an out-of-range error for `index`.
    pub fn out_of_range(index: usize, capacity: usize) -> Self {
        Self::IndexOutOfRange { index, capacity }
    }
}
