//! Dirdelta Core - in-memory storage for incremental directory scans
//!
//! This crate holds the data structures the change detector is built on:
//! - [`HashBucket`]: open-addressing slot table with dual-start probing,
//!   per-chunk probe depth ceilings and soft deletion
//! - [`ReferenceSet`]: typed keyed set over it that resizes on demand
//! - [`SizePolicy`]: the fill-factor rule every growable table follows
//! - [`PathStorage`]: parent-pointer tree that interns path segments
//!
//! Everything is single-writer. References handed out by a table are
//! only good until that table is rebuilt.
//!
//! # Example
//!
//! ```
//! use dirdelta_core::{PathStorage, StorageOptions};
//!
//! let mut paths = PathStorage::new(&StorageOptions::default()).unwrap();
//! let id = paths.store("/srv/data/report.csv").unwrap();
//! assert_eq!(paths.store("/srv/data/report.csv").unwrap(), id);
//! assert_eq!(paths.create_string(id).unwrap(), "/srv/data/report.csv");
//! ```

pub mod bit_vector;
pub mod char_buffer;
pub mod cursor;
pub mod error;
pub mod hash;
pub mod hash_bucket;
pub mod options;
pub mod path_storage;
pub mod reference_set;
pub mod size_policy;

pub use bit_vector::BitVector;
pub use char_buffer::{CharBuffer, HashedCharBuffer, TextSpan};
pub use cursor::{Chain, Cursor, DualCursor};
pub use error::{CoreError, Result};
pub use hash::{hash32, permute, DefaultHashBuilder};
pub use hash_bucket::{Candidates, HashBucket};
pub use options::StorageOptions;
pub use path_storage::PathStorage;
pub use reference_set::{ReferenceSet, SetEntry, SlotRef};
pub use size_policy::{SizeLimits, SizePolicy};
