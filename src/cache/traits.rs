//! Core traits and types for the partitioned response cache.

use chrono::{DateTime, Utc};
use color_eyre::Result;

use crate::http::{RequestKey, ResponseSnapshot};

/// A stored response together with where and when it was stored.
#[derive(Debug, Clone)]
pub struct CachedResponse {
  /// Partition the entry was found in
  pub partition: String,
  pub response: ResponseSnapshot,
  pub cached_at: DateTime<Utc>,
}

/// Trait for cache storage backends.
///
/// A store holds named partitions, each mapping request keys to response
/// snapshots. Writing to a partition that does not exist creates it.
/// Implementations must tolerate concurrent reads and concurrent writes to
/// distinct keys.
pub trait CacheStore: Send + Sync {
  /// Create the partition if it does not exist yet.
  fn open(&self, partition: &str) -> Result<()>;

  /// Names of all partitions, in creation order.
  fn partitions(&self) -> Result<Vec<String>>;

  /// Delete a partition and all its entries. Returns false if it did not exist.
  fn delete(&self, partition: &str) -> Result<bool>;

  /// Store one entry, replacing any previous entry for the key.
  fn put(&self, partition: &str, key: &RequestKey, response: &ResponseSnapshot) -> Result<()>;

  /// Store several entries atomically: either all are written or none are.
  fn put_all(&self, partition: &str, entries: &[(RequestKey, ResponseSnapshot)]) -> Result<()>;

  /// Look up a key in one partition.
  fn lookup(&self, partition: &str, key: &RequestKey) -> Result<Option<CachedResponse>>;

  /// Look up a key across all partitions, oldest partition first.
  fn match_any(&self, key: &RequestKey) -> Result<Option<CachedResponse>>;

  /// Keys stored in a partition.
  fn keys(&self, partition: &str) -> Result<Vec<RequestKey>>;

  /// Handle scoped to a single partition.
  fn partition<'a>(&'a self, name: &'a str) -> Partition<'a, Self>
  where
    Self: Sized,
  {
    Partition { store: self, name }
  }
}

/// Borrowed handle to one named partition of a store.
pub struct Partition<'a, S: CacheStore> {
  store: &'a S,
  name: &'a str,
}

impl<S: CacheStore> Partition<'_, S> {
  pub fn name(&self) -> &str {
    self.name
  }

  pub fn put(&self, key: &RequestKey, response: &ResponseSnapshot) -> Result<()> {
    self.store.put(self.name, key, response)
  }

  pub fn put_all(&self, entries: &[(RequestKey, ResponseSnapshot)]) -> Result<()> {
    self.store.put_all(self.name, entries)
  }

  pub fn lookup(&self, key: &RequestKey) -> Result<Option<CachedResponse>> {
    self.store.lookup(self.name, key)
  }

  pub fn keys(&self) -> Result<Vec<RequestKey>> {
    self.store.keys(self.name)
  }
}

/// Result from a cache-aware fetch, including where the data came from.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was cached (if from cache)
  pub cached_at: Option<DateTime<Utc>>,
}

impl<T> CacheResult<T> {
  /// Fresh data from the network.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      cached_at: None,
    }
  }

  /// Data served from the cache without touching the network.
  pub fn from_cache(data: T, cached_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
      cached_at: Some(cached_at),
    }
  }

  /// Fallback data served because the network was unavailable.
  pub fn offline(data: T, cached_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::Offline,
      cached_at: Some(cached_at),
    }
  }
}

/// Indicates where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network
  Network,
  /// Cache hit
  Cache,
  /// Network unavailable, serving the offline fallback
  Offline,
}

impl CacheSource {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Network => "network",
      Self::Cache => "cache",
      Self::Offline => "offline",
    }
  }
}
