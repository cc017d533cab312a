#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod error;

/// A key-value map over a caller-owned slot buffer.
///
/// This module provides a `HashMap` that wraps the `HashTable` and hashes
/// byte-string keys with a configurable hasher.
pub mod hash_map;

/// A set of byte-string keys over a caller-owned slot buffer.
pub mod hash_set;

/// The Robin Hood table engine and its slot type.
pub mod hash_table;

pub mod hasher;

/// Tables of caller-defined records that carry their own key.
pub mod record;

#[cfg(test)]
mod hash_table_proptest;

pub use error::Error;
pub use hash_map::HashMap;
pub use hash_set::HashSet;
#[cfg(any(test, feature = "stats"))]
pub use hash_table::DebugStats;
pub use hash_table::Entry;
pub use hash_table::HashTable;
pub use hash_table::Slot;
pub use hasher::RotXorState;
pub use record::Record;
pub use record::RecordTable;
