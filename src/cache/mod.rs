//! Partitioned response cache.
//!
//! This module provides the store the offline worker caches into:
//! - Named partitions, each a key -> response snapshot map
//! - Atomic batch writes for install-time population
//! - Cross-partition lookup in partition creation order
//! - An in-memory store and a SQLite store behind the same trait

mod memory;
mod storage;
mod traits;

pub use memory::MemoryStore;
pub(crate) use storage::parse_datetime;
pub use storage::SqliteStore;
pub use traits::{CacheResult, CacheSource, CacheStore, CachedResponse, Partition};
