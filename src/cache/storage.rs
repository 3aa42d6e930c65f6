//! SQLite-backed cache store.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

use super::traits::{CacheStore, CachedResponse};
use crate::http::{RequestKey, ResponseKind, ResponseSnapshot};

/// SQLite-based cache storage implementation.
///
/// The same database also holds the background-sync queue, see
/// [`crate::worker::PendingStore`].
pub struct SqliteStore {
  conn: Mutex<Connection>,
}

impl SqliteStore {
  /// Open (or create) the database at `path`.
  pub fn open(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;

    Ok(storage)
  }

  /// Run a closure with exclusive access to the connection.
  pub(crate) fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
    let mut conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    f(&mut conn)
  }

  /// Run database migrations for cache tables.
  fn run_migrations(&self) -> Result<()> {
    self.with_conn(|conn| {
      conn
        .execute_batch(CACHE_SCHEMA)
        .map_err(|e| eyre!("Failed to run cache migrations: {}", e))
    })
  }
}

/// Schema for cache and sync tables.
const CACHE_SCHEMA: &str = r#"
-- Named partitions; seq preserves creation order for lookups
CREATE TABLE IF NOT EXISTS partitions (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Response snapshots keyed by partition and request key digest
CREATE TABLE IF NOT EXISTS entries (
    partition_name TEXT NOT NULL,
    key_digest TEXT NOT NULL,
    request_key TEXT NOT NULL,
    url TEXT NOT NULL,
    status INTEGER NOT NULL,
    kind TEXT NOT NULL,
    headers TEXT NOT NULL,
    body BLOB NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (partition_name, key_digest)
);

CREATE INDEX IF NOT EXISTS idx_entries_digest ON entries(key_digest);

-- Mutating requests waiting for background sync
CREATE TABLE IF NOT EXISTS pending_requests (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL,
    method TEXT NOT NULL,
    headers TEXT NOT NULL,
    body BLOB,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

/// Raw entry row, decoded outside the rusqlite closure.
type EntryRow = (String, String, u16, String, String, Vec<u8>, String);

const ENTRY_COLUMNS: &str = "e.partition_name, e.url, e.status, e.kind, e.headers, e.body, e.cached_at";

fn read_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<EntryRow> {
  Ok((
    row.get(0)?,
    row.get(1)?,
    row.get(2)?,
    row.get(3)?,
    row.get(4)?,
    row.get(5)?,
    row.get(6)?,
  ))
}

fn decode_entry(row: EntryRow) -> Result<CachedResponse> {
  let (partition, url, status, kind, headers, body, cached_at) = row;
  let headers: Vec<(String, String)> = serde_json::from_str(&headers)
    .map_err(|e| eyre!("Failed to deserialize headers: {}", e))?;

  Ok(CachedResponse {
    partition,
    response: ResponseSnapshot {
      url,
      status,
      headers,
      body: body.into(),
      kind: ResponseKind::parse(&kind)?,
    },
    cached_at: parse_datetime(&cached_at)?,
  })
}

fn ensure_partition(conn: &Connection, partition: &str) -> Result<()> {
  conn
    .execute(
      "INSERT OR IGNORE INTO partitions (name) VALUES (?)",
      params![partition],
    )
    .map_err(|e| eyre!("Failed to create partition {}: {}", partition, e))?;
  Ok(())
}

fn insert_entry(
  conn: &Connection,
  partition: &str,
  key: &RequestKey,
  response: &ResponseSnapshot,
) -> Result<()> {
  let headers = serde_json::to_string(&response.headers)
    .map_err(|e| eyre!("Failed to serialize headers: {}", e))?;

  conn
    .execute(
      "INSERT OR REPLACE INTO entries (partition_name, key_digest, request_key, url, status, kind, headers, body, cached_at)
       VALUES (?, ?, ?, ?, ?, ?, ?, ?, datetime('now'))",
      params![
        partition,
        key.digest(),
        key.as_str(),
        response.url,
        response.status,
        response.kind.as_str(),
        headers,
        &response.body[..],
      ],
    )
    .map_err(|e| eyre!("Failed to store entry {}: {}", key, e))?;
  Ok(())
}

impl CacheStore for SqliteStore {
  fn open(&self, partition: &str) -> Result<()> {
    self.with_conn(|conn| ensure_partition(conn, partition))
  }

  fn partitions(&self) -> Result<Vec<String>> {
    self.with_conn(|conn| {
      let mut stmt = conn
        .prepare("SELECT name FROM partitions ORDER BY seq")
        .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

      let names = stmt
        .query_map([], |row| row.get(0))
        .map_err(|e| eyre!("Failed to list partitions: {}", e))?
        .collect::<rusqlite::Result<Vec<String>>>()
        .map_err(|e| eyre!("Failed to read partition name: {}", e))?;

      Ok(names)
    })
  }

  fn delete(&self, partition: &str) -> Result<bool> {
    self.with_conn(|conn| {
      let tx = conn
        .transaction()
        .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

      tx.execute("DELETE FROM entries WHERE partition_name = ?", params![partition])
        .map_err(|e| eyre!("Failed to delete entries of {}: {}", partition, e))?;
      let removed = tx
        .execute("DELETE FROM partitions WHERE name = ?", params![partition])
        .map_err(|e| eyre!("Failed to delete partition {}: {}", partition, e))?;

      tx.commit()
        .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

      Ok(removed > 0)
    })
  }

  fn put(&self, partition: &str, key: &RequestKey, response: &ResponseSnapshot) -> Result<()> {
    self.put_all(partition, &[(key.clone(), response.clone())])
  }

  fn put_all(&self, partition: &str, entries: &[(RequestKey, ResponseSnapshot)]) -> Result<()> {
    self.with_conn(|conn| {
      // Dropping the transaction on error rolls back every row
      let tx = conn
        .transaction()
        .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

      ensure_partition(&tx, partition)?;
      for (key, response) in entries {
        insert_entry(&tx, partition, key, response)?;
      }

      tx.commit()
        .map_err(|e| eyre!("Failed to commit transaction: {}", e))
    })
  }

  fn lookup(&self, partition: &str, key: &RequestKey) -> Result<Option<CachedResponse>> {
    let row = self.with_conn(|conn| {
      conn
        .query_row(
          &format!(
            "SELECT {} FROM entries e WHERE e.partition_name = ? AND e.key_digest = ?",
            ENTRY_COLUMNS
          ),
          params![partition, key.digest()],
          read_entry,
        )
        .optional()
        .map_err(|e| eyre!("Failed to look up {}: {}", key, e))
    })?;

    row.map(decode_entry).transpose()
  }

  fn match_any(&self, key: &RequestKey) -> Result<Option<CachedResponse>> {
    let row = self.with_conn(|conn| {
      conn
        .query_row(
          &format!(
            "SELECT {} FROM entries e
             INNER JOIN partitions p ON p.name = e.partition_name
             WHERE e.key_digest = ?
             ORDER BY p.seq
             LIMIT 1",
            ENTRY_COLUMNS
          ),
          params![key.digest()],
          read_entry,
        )
        .optional()
        .map_err(|e| eyre!("Failed to match {}: {}", key, e))
    })?;

    row.map(decode_entry).transpose()
  }

  fn keys(&self, partition: &str) -> Result<Vec<RequestKey>> {
    self.with_conn(|conn| {
      let mut stmt = conn
        .prepare("SELECT request_key FROM entries WHERE partition_name = ? ORDER BY request_key")
        .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

      let keys = stmt
        .query_map(params![partition], |row| row.get::<_, String>(0))
        .map_err(|e| eyre!("Failed to list keys: {}", e))?
        .collect::<rusqlite::Result<Vec<String>>>()
        .map_err(|e| eyre!("Failed to read key: {}", e))?;

      Ok(keys.into_iter().map(RequestKey::from_stored).collect())
    })
  }
}

/// Parse a datetime string from SQLite format.
pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  // SQLite stores as "YYYY-MM-DD HH:MM:SS"
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}
