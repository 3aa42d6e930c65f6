//! Background sync: replay of mutating requests that failed while offline.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use reqwest::Method;
use rusqlite::params;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};
use url::Url;

use crate::cache::{parse_datetime, SqliteStore};
use crate::http::{Fetcher, Request};

/// Method, headers and body of a deferred request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOptions {
  pub method: Method,
  pub headers: Vec<(String, String)>,
  pub body: Option<Bytes>,
}

impl RequestOptions {
  pub fn new(method: Method) -> Self {
    Self {
      method,
      headers: Vec::new(),
      body: None,
    }
  }

  pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.headers.push((name.into(), value.into()));
    self
  }

  pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
    self.body = Some(body.into());
    self
  }
}

/// A request waiting for connectivity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
  pub id: i64,
  pub url: String,
  pub options: RequestOptions,
  pub created_at: DateTime<Utc>,
}

impl PendingRequest {
  pub fn to_request(&self) -> Result<Request> {
    let url =
      Url::parse(&self.url).map_err(|e| eyre!("Invalid pending URL '{}': {}", self.url, e))?;
    let mut request = Request::new(self.options.method.clone(), url);
    request.headers = self.options.headers.clone();
    request.body = self.options.body.clone();
    Ok(request)
  }
}

/// Durable storage for pending requests.
pub trait PendingStore: Send + Sync {
  /// Store a request and return its id.
  fn enqueue(&self, url: &str, options: &RequestOptions) -> Result<i64>;

  /// All pending requests, oldest first.
  fn list(&self) -> Result<Vec<PendingRequest>>;

  /// Remove a request. Returns false if it was not pending.
  fn remove(&self, id: i64) -> Result<bool>;
}

/// Pending store kept in process memory.
#[derive(Default)]
pub struct MemoryPendingStore {
  inner: Mutex<(i64, Vec<PendingRequest>)>,
}

impl MemoryPendingStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl PendingStore for MemoryPendingStore {
  fn enqueue(&self, url: &str, options: &RequestOptions) -> Result<i64> {
    let mut inner = self.inner.lock().map_err(|e| eyre!("Lock poisoned: {}", e))?;
    inner.0 += 1;
    let id = inner.0;
    inner.1.push(PendingRequest {
      id,
      url: url.to_string(),
      options: options.clone(),
      created_at: Utc::now(),
    });
    Ok(id)
  }

  fn list(&self) -> Result<Vec<PendingRequest>> {
    let inner = self.inner.lock().map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(inner.1.clone())
  }

  fn remove(&self, id: i64) -> Result<bool> {
    let mut inner = self.inner.lock().map_err(|e| eyre!("Lock poisoned: {}", e))?;
    let before = inner.1.len();
    inner.1.retain(|p| p.id != id);
    Ok(inner.1.len() != before)
  }
}

impl PendingStore for SqliteStore {
  fn enqueue(&self, url: &str, options: &RequestOptions) -> Result<i64> {
    let headers = serde_json::to_string(&options.headers)
      .map_err(|e| eyre!("Failed to serialize headers: {}", e))?;

    self.with_conn(|conn| {
      conn
        .execute(
          "INSERT INTO pending_requests (url, method, headers, body, created_at)
           VALUES (?, ?, ?, ?, datetime('now'))",
          params![
            url,
            options.method.as_str(),
            headers,
            options.body.as_deref(),
          ],
        )
        .map_err(|e| eyre!("Failed to enqueue request: {}", e))?;
      Ok(conn.last_insert_rowid())
    })
  }

  fn list(&self) -> Result<Vec<PendingRequest>> {
    type Row = (i64, String, String, String, Option<Vec<u8>>, String);

    let rows: Vec<Row> = self.with_conn(|conn| {
      let mut stmt = conn
        .prepare(
          "SELECT id, url, method, headers, body, created_at FROM pending_requests
           ORDER BY id",
        )
        .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

      let rows = stmt
        .query_map([], |row| {
          Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
          ))
        })
        .map_err(|e| eyre!("Failed to list pending requests: {}", e))?
        .collect::<rusqlite::Result<Vec<Row>>>()
        .map_err(|e| eyre!("Failed to read pending request: {}", e))?;

      Ok(rows)
    })?;

    rows
      .into_iter()
      .map(|(id, url, method, headers, body, created_at)| {
        let method = Method::from_bytes(method.as_bytes())
          .map_err(|e| eyre!("Invalid stored method '{}': {}", method, e))?;
        let headers: Vec<(String, String)> = serde_json::from_str(&headers)
          .map_err(|e| eyre!("Failed to deserialize headers: {}", e))?;

        Ok(PendingRequest {
          id,
          url,
          options: RequestOptions {
            method,
            headers,
            body: body.map(Bytes::from),
          },
          created_at: parse_datetime(&created_at)?,
        })
      })
      .collect()
  }

  fn remove(&self, id: i64) -> Result<bool> {
    self.with_conn(|conn| {
      let removed = conn
        .execute("DELETE FROM pending_requests WHERE id = ?", params![id])
        .map_err(|e| eyre!("Failed to remove pending request {}: {}", id, e))?;
      Ok(removed > 0)
    })
  }
}

/// Outcome of one sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
  /// Replayed and removed
  pub synced: Vec<i64>,
  /// Still pending for the next sync event
  pub retained: Vec<i64>,
}

/// Replays pending requests when the host signals restored connectivity.
pub struct SyncQueue<P: PendingStore, F: Fetcher> {
  store: Arc<P>,
  fetcher: Arc<F>,
  tag: String,
}

impl<P: PendingStore, F: Fetcher> SyncQueue<P, F> {
  pub fn new(store: Arc<P>, fetcher: Arc<F>, tag: impl Into<String>) -> Self {
    Self {
      store,
      fetcher,
      tag: tag.into(),
    }
  }

  pub fn enqueue(&self, url: &str, options: &RequestOptions) -> Result<i64> {
    let id = self.store.enqueue(url, options)?;
    info!(id, url, "Queued request for background sync");
    Ok(id)
  }

  /// Handle a sync event. Events with another tag are ignored (`None`).
  ///
  /// Each pending request is attempted once, in order. A request is removed
  /// only after it reached the server with a 2xx status; anything else
  /// leaves it for the next sync event.
  pub async fn on_sync(&self, tag: &str) -> Result<Option<SyncReport>> {
    if tag != self.tag {
      return Ok(None);
    }
    info!("Background sync triggered");

    let pending = self.store.list().map_err(|e| {
      error!(error = %e, "Background sync failed");
      e
    })?;

    let mut report = SyncReport::default();
    for request in pending {
      match self.replay(&request).await {
        Ok(()) => match self.store.remove(request.id) {
          Ok(_) => {
            info!(id = request.id, "Synced request");
            report.synced.push(request.id);
          }
          Err(e) => {
            warn!(id = request.id, error = %e, "Synced request could not be removed");
            report.retained.push(request.id);
          }
        },
        Err(e) => {
          warn!(id = request.id, error = %e, "Failed to sync request");
          report.retained.push(request.id);
        }
      }
    }

    Ok(Some(report))
  }

  async fn replay(&self, pending: &PendingRequest) -> Result<()> {
    let request = pending.to_request()?;
    let response = self.fetcher.fetch(&request).await?;
    if response.ok() {
      Ok(())
    } else {
      Err(eyre!("Server answered {}", response.status))
    }
  }
}
