//! Fakes shared by the worker tests.

use color_eyre::{eyre::eyre, Result};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

use super::host::WorkerHost;
use super::notify::Notification;
use super::sync::{PendingRequest, PendingStore, RequestOptions};
use crate::cache::{CacheStore, CachedResponse, MemoryStore};
use crate::http::{Fetcher, Request, RequestKey, ResponseSnapshot};

/// Fetcher answering from a fixed table; unknown URLs fail like a dead network.
#[derive(Default)]
pub struct ScriptedFetcher {
  responses: Mutex<HashMap<String, ResponseSnapshot>>,
  calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn respond(&self, url: &str, response: ResponseSnapshot) {
    self
      .responses
      .lock()
      .unwrap()
      .insert(url.to_string(), response);
  }

  pub fn go_offline(&self, url: &str) {
    self.responses.lock().unwrap().remove(url);
  }

  pub fn calls(&self) -> Vec<String> {
    self.calls.lock().unwrap().clone()
  }
}

impl Fetcher for ScriptedFetcher {
  fn fetch(&self, request: &Request) -> impl Future<Output = Result<ResponseSnapshot>> + Send {
    let url = request.url.to_string();
    self.calls.lock().unwrap().push(url.clone());
    let result = self
      .responses
      .lock()
      .unwrap()
      .get(&url)
      .cloned()
      .ok_or_else(|| eyre!("Network unreachable: {}", url));
    async move { result }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
  SkipWaiting,
  ClaimClients,
  Notification { title: String, body: String },
  CloseNotification,
  OpenWindow(String),
}

/// Host that records every call.
#[derive(Default)]
pub struct RecordingHost {
  calls: Mutex<Vec<HostCall>>,
  reject_notifications: bool,
}

impl RecordingHost {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn rejecting_notifications() -> Self {
    Self {
      reject_notifications: true,
      ..Self::default()
    }
  }

  pub fn calls(&self) -> Vec<HostCall> {
    self.calls.lock().unwrap().clone()
  }
}

impl WorkerHost for RecordingHost {
  fn skip_waiting(&self) -> Result<()> {
    self.calls.lock().unwrap().push(HostCall::SkipWaiting);
    Ok(())
  }

  fn claim_clients(&self) -> Result<()> {
    self.calls.lock().unwrap().push(HostCall::ClaimClients);
    Ok(())
  }

  fn show_notification(&self, title: &str, notification: &Notification) -> Result<()> {
    if self.reject_notifications {
      return Err(eyre!("Notification permission denied"));
    }
    self.calls.lock().unwrap().push(HostCall::Notification {
      title: title.to_string(),
      body: notification.body.clone(),
    });
    Ok(())
  }

  fn close_notification(&self) -> Result<()> {
    self.calls.lock().unwrap().push(HostCall::CloseNotification);
    Ok(())
  }

  fn open_window(&self, url: &str) -> Result<()> {
    self
      .calls
      .lock()
      .unwrap()
      .push(HostCall::OpenWindow(url.to_string()));
    Ok(())
  }
}

/// Cache store whose single-entry writes fail, as on a full disk.
/// Batch writes still succeed so a version can be installed.
#[derive(Default)]
pub struct ReadOnlyStore {
  inner: MemoryStore,
}

impl ReadOnlyStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl CacheStore for ReadOnlyStore {
  fn open(&self, partition: &str) -> Result<()> {
    self.inner.open(partition)
  }

  fn partitions(&self) -> Result<Vec<String>> {
    self.inner.partitions()
  }

  fn delete(&self, partition: &str) -> Result<bool> {
    self.inner.delete(partition)
  }

  fn put(&self, _partition: &str, _key: &RequestKey, _response: &ResponseSnapshot) -> Result<()> {
    Err(eyre!("disk full"))
  }

  fn put_all(&self, partition: &str, entries: &[(RequestKey, ResponseSnapshot)]) -> Result<()> {
    self.inner.put_all(partition, entries)
  }

  fn lookup(&self, partition: &str, key: &RequestKey) -> Result<Option<CachedResponse>> {
    self.inner.lookup(partition, key)
  }

  fn match_any(&self, key: &RequestKey) -> Result<Option<CachedResponse>> {
    self.inner.match_any(key)
  }

  fn keys(&self, partition: &str) -> Result<Vec<RequestKey>> {
    self.inner.keys(partition)
  }
}

/// Pending store whose backing storage cannot be read or written.
pub struct UnreadablePendingStore;

impl PendingStore for UnreadablePendingStore {
  fn enqueue(&self, _url: &str, _options: &RequestOptions) -> Result<i64> {
    Err(eyre!("database is locked"))
  }

  fn list(&self) -> Result<Vec<PendingRequest>> {
    Err(eyre!("database is locked"))
  }

  fn remove(&self, _id: i64) -> Result<bool> {
    Err(eyre!("database is locked"))
  }
}
