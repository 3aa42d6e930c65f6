//! In-memory cache store.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::traits::{CacheStore, CachedResponse};
use crate::http::{RequestKey, ResponseSnapshot};

struct MemoryPartition {
  name: String,
  entries: HashMap<RequestKey, (ResponseSnapshot, DateTime<Utc>)>,
}

/// Cache store that keeps everything in process memory.
///
/// Partitions are kept in creation order so `match_any` behaves like the
/// SQLite store.
#[derive(Default)]
pub struct MemoryStore {
  partitions: Mutex<Vec<MemoryPartition>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> Result<MutexGuard<'_, Vec<MemoryPartition>>> {
    self
      .partitions
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))
  }
}

fn find_or_create<'a>(
  partitions: &'a mut Vec<MemoryPartition>,
  name: &str,
) -> &'a mut MemoryPartition {
  let index = match partitions.iter().position(|p| p.name == name) {
    Some(index) => index,
    None => {
      partitions.push(MemoryPartition {
        name: name.to_string(),
        entries: HashMap::new(),
      });
      partitions.len() - 1
    }
  };
  &mut partitions[index]
}

fn to_cached(partition: &str, entry: &(ResponseSnapshot, DateTime<Utc>)) -> CachedResponse {
  CachedResponse {
    partition: partition.to_string(),
    response: entry.0.clone(),
    cached_at: entry.1,
  }
}

impl CacheStore for MemoryStore {
  fn open(&self, partition: &str) -> Result<()> {
    let mut partitions = self.lock()?;
    find_or_create(&mut partitions, partition);
    Ok(())
  }

  fn partitions(&self) -> Result<Vec<String>> {
    Ok(self.lock()?.iter().map(|p| p.name.clone()).collect())
  }

  fn delete(&self, partition: &str) -> Result<bool> {
    let mut partitions = self.lock()?;
    let before = partitions.len();
    partitions.retain(|p| p.name != partition);
    Ok(partitions.len() != before)
  }

  fn put(&self, partition: &str, key: &RequestKey, response: &ResponseSnapshot) -> Result<()> {
    let mut partitions = self.lock()?;
    find_or_create(&mut partitions, partition)
      .entries
      .insert(key.clone(), (response.clone(), Utc::now()));
    Ok(())
  }

  fn put_all(&self, partition: &str, entries: &[(RequestKey, ResponseSnapshot)]) -> Result<()> {
    // Single lock acquisition keeps the batch invisible until complete
    let mut partitions = self.lock()?;
    let target = find_or_create(&mut partitions, partition);
    let now = Utc::now();
    for (key, response) in entries {
      target
        .entries
        .insert(key.clone(), (response.clone(), now));
    }
    Ok(())
  }

  fn lookup(&self, partition: &str, key: &RequestKey) -> Result<Option<CachedResponse>> {
    let partitions = self.lock()?;
    Ok(
      partitions
        .iter()
        .find(|p| p.name == partition)
        .and_then(|p| p.entries.get(key).map(|e| to_cached(&p.name, e))),
    )
  }

  fn match_any(&self, key: &RequestKey) -> Result<Option<CachedResponse>> {
    let partitions = self.lock()?;
    Ok(
      partitions
        .iter()
        .find_map(|p| p.entries.get(key).map(|e| to_cached(&p.name, e))),
    )
  }

  fn keys(&self, partition: &str) -> Result<Vec<RequestKey>> {
    let partitions = self.lock()?;
    let mut keys: Vec<RequestKey> = partitions
      .iter()
      .find(|p| p.name == partition)
      .map(|p| p.entries.keys().cloned().collect())
      .unwrap_or_default();
    keys.sort();
    Ok(keys)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use reqwest::Method;
  use url::Url;

  fn key(path: &str) -> RequestKey {
    let url = Url::parse("https://shop.test").unwrap().join(path).unwrap();
    RequestKey::new(&Method::GET, &url)
  }

  #[test]
  fn test_put_creates_partition() {
    let store = MemoryStore::new();
    store
      .put("dynamic", &key("/a"), &ResponseSnapshot::new(200, "a"))
      .unwrap();
    assert_eq!(store.partitions().unwrap(), vec!["dynamic".to_string()]);
  }

  #[test]
  fn test_match_any_prefers_oldest_partition() {
    let store = MemoryStore::new();
    store.open("static").unwrap();
    store
      .put("dynamic", &key("/a"), &ResponseSnapshot::new(200, "dynamic"))
      .unwrap();
    store
      .put("static", &key("/a"), &ResponseSnapshot::new(200, "static"))
      .unwrap();

    let hit = store.match_any(&key("/a")).unwrap().unwrap();
    assert_eq!(hit.partition, "static");
    assert_eq!(&hit.response.body[..], b"static");
  }

  #[test]
  fn test_delete_removes_entries() {
    let store = MemoryStore::new();
    store
      .put("old", &key("/a"), &ResponseSnapshot::new(200, "a"))
      .unwrap();
    assert!(store.delete("old").unwrap());
    assert!(!store.delete("old").unwrap());
    assert!(store.match_any(&key("/a")).unwrap().is_none());
  }

  #[test]
  fn test_put_replaces_wholesale() {
    let store = MemoryStore::new();
    let partition = store.partition("dynamic");
    partition
      .put(&key("/a"), &ResponseSnapshot::new(200, "first"))
      .unwrap();
    partition
      .put(&key("/a"), &ResponseSnapshot::new(200, "second").with_header("etag", "2"))
      .unwrap();

    let hit = partition.lookup(&key("/a")).unwrap().unwrap();
    assert_eq!(&hit.response.body[..], b"second");
    assert_eq!(hit.response.header("etag"), Some("2"));
    assert_eq!(partition.keys().unwrap().len(), 1);
  }
}
