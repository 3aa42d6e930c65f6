//! Offline cache manager: install, activate and request interception.

use color_eyre::{eyre::eyre, Result};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use url::Url;

use super::host::WorkerHost;
use super::message::{ControlMessage, VersionReply};
use crate::cache::{CacheResult, CacheSource, CacheStore};
use crate::config::CacheConfig;
use crate::http::{Fetcher, Request, ResponseSnapshot};

/// Lifecycle state of one worker version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
  /// Constructed, install not started
  Parsed,
  Installing,
  /// Installed, waiting to activate
  Waiting,
  /// Controlling pages and intercepting requests
  Active,
  /// Install failed; the previous version keeps serving
  Redundant,
}

impl fmt::Display for WorkerState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      Self::Parsed => "parsed",
      Self::Installing => "installing",
      Self::Waiting => "waiting",
      Self::Active => "active",
      Self::Redundant => "redundant",
    };
    f.write_str(s)
  }
}

/// Result of intercepting a request.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
  /// Not handled by the worker; the request goes to the network untouched
  Passthrough,
  /// Answered from cache, network or the offline fallback
  Respond(CacheResult<ResponseSnapshot>),
  /// Network failed and there is nothing to fall back to
  Unavailable,
}

impl FetchOutcome {
  pub fn response(&self) -> Option<&ResponseSnapshot> {
    match self {
      Self::Respond(result) => Some(&result.data),
      _ => None,
    }
  }

  pub fn source(&self) -> Option<CacheSource> {
    match self {
      Self::Respond(result) => Some(result.source),
      _ => None,
    }
  }
}

/// Owns the partition lifecycle and the cache-first request policy.
///
/// `install` and `activate` take `&mut self`, so they can never overlap with
/// each other; `handle_fetch` takes `&self` and may run concurrently from
/// many tasks through an `Arc`.
pub struct CacheManager<S: CacheStore, F: Fetcher, H: WorkerHost> {
  config: CacheConfig,
  origin: Url,
  storage: Arc<S>,
  fetcher: Arc<F>,
  host: Arc<H>,
  state: WorkerState,
  skip_waiting: AtomicBool,
}

impl<S: CacheStore, F: Fetcher, H: WorkerHost> CacheManager<S, F, H> {
  pub fn new(
    origin: Url,
    config: CacheConfig,
    storage: Arc<S>,
    fetcher: Arc<F>,
    host: Arc<H>,
  ) -> Self {
    Self {
      config,
      origin,
      storage,
      fetcher,
      host,
      state: WorkerState::Parsed,
      skip_waiting: AtomicBool::new(false),
    }
  }

  /// Pick up a version installed by an earlier process, ready to activate.
  pub fn installed(self) -> Result<Self> {
    self.restore(WorkerState::Waiting)
  }

  /// Pick up a version installed and activated by an earlier process.
  pub fn resume(self) -> Result<Self> {
    self.restore(WorkerState::Active)
  }

  fn restore(mut self, state: WorkerState) -> Result<Self> {
    let partitions = self.storage.partitions()?;
    if partitions.contains(&self.config.static_partition) {
      self.state = state;
    } else {
      debug!(
        partition = %self.config.static_partition,
        "Static partition missing, worker not installed"
      );
    }
    Ok(self)
  }

  pub fn state(&self) -> WorkerState {
    self.state
  }

  /// Version string reported to pages.
  pub fn version(&self) -> &str {
    &self.config.version
  }

  /// Installed and allowed to activate without waiting for pages to close.
  pub fn ready_to_activate(&self) -> bool {
    self.state == WorkerState::Waiting && self.skip_waiting.load(Ordering::SeqCst)
  }

  fn resolve(&self, path: &str) -> Result<Url> {
    self
      .origin
      .join(path)
      .map_err(|e| eyre!("Failed to resolve '{}' against {}: {}", path, self.origin, e))
  }

  /// Populate the static partition from the network.
  ///
  /// Every asset must be fetched successfully before anything is written;
  /// on failure the partition is left as it was and the worker becomes
  /// redundant.
  pub async fn install(&mut self) -> Result<()> {
    info!(partition = %self.config.static_partition, "Installing");
    self.state = WorkerState::Installing;

    match self.precache().await {
      Ok(count) => {
        info!(count, "Static files cached successfully");
        self.state = WorkerState::Waiting;
        self.skip_waiting.store(true, Ordering::SeqCst);
        self.host.skip_waiting()?;
        Ok(())
      }
      Err(e) => {
        error!(error = %e, "Error caching static files");
        self.state = WorkerState::Redundant;
        Err(e)
      }
    }
  }

  async fn precache(&self) -> Result<usize> {
    let requests = self
      .config
      .static_assets
      .iter()
      .map(|path| self.resolve(path).map(Request::get))
      .collect::<Result<Vec<_>>>()?;

    let fetches = requests.iter().map(|request| async move {
      let response = self.fetcher.fetch(request).await?;
      if !response.ok() {
        return Err(eyre!(
          "Static asset {} returned status {}",
          request.url,
          response.status
        ));
      }
      Ok((request.cache_key(), response))
    });
    let entries = futures::future::try_join_all(fetches).await?;

    self
      .storage
      .partition(&self.config.static_partition)
      .put_all(&entries)?;

    Ok(entries.len())
  }

  /// Delete every partition that is not current and take control of pages.
  ///
  /// Returns the names of the deleted partitions.
  pub fn activate(&mut self) -> Result<Vec<String>> {
    if self.state != WorkerState::Waiting {
      return Err(eyre!("Cannot activate a worker in state {}", self.state));
    }
    info!("Activating");

    let mut deleted = Vec::new();
    for name in self.storage.partitions()? {
      if name != self.config.static_partition && name != self.config.dynamic_partition {
        info!(partition = %name, "Deleting old cache");
        self.storage.delete(&name)?;
        deleted.push(name);
      }
    }

    self.host.claim_clients()?;
    self.state = WorkerState::Active;
    info!("Activated successfully");

    Ok(deleted)
  }

  /// Intercept one request with the cache-first policy.
  pub async fn handle_fetch(&self, request: &Request) -> Result<FetchOutcome> {
    if self.state != WorkerState::Active
      || !request.is_retrieval()
      || !request.is_network_scheme()
    {
      return Ok(FetchOutcome::Passthrough);
    }

    let key = request.cache_key();
    if let Some(cached) = self.storage.match_any(&key)? {
      debug!(key = %key, partition = %cached.partition, "Serving from cache");
      return Ok(FetchOutcome::Respond(CacheResult::from_cache(
        cached.response,
        cached.cached_at,
      )));
    }

    match self.fetcher.fetch(request).await {
      Ok(response) => {
        if response.is_cacheable() {
          let copy = response.clone();
          if let Err(e) = self
            .storage
            .partition(&self.config.dynamic_partition)
            .put(&key, &copy)
          {
            warn!(key = %key, error = %e, "Failed to cache dynamic response");
          } else {
            debug!(key = %key, "Cached dynamic response");
          }
        }
        Ok(FetchOutcome::Respond(CacheResult::from_network(response)))
      }
      Err(e) => {
        debug!(key = %key, error = %e, "Network fetch failed");
        if request.is_navigation() {
          let fallback = Request::get(self.resolve(&self.config.fallback_document)?);
          if let Some(cached) = self
            .storage
            .partition(&self.config.static_partition)
            .lookup(&fallback.cache_key())?
          {
            return Ok(FetchOutcome::Respond(CacheResult::offline(
              cached.response,
              cached.cached_at,
            )));
          }
        }
        Ok(FetchOutcome::Unavailable)
      }
    }
  }

  /// Handle a control message from a page, returning the reply if any.
  pub fn handle_message(&self, message: ControlMessage) -> Result<Option<VersionReply>> {
    debug!(?message, "Message received");
    match message {
      ControlMessage::SkipWaiting => {
        self.skip_waiting.store(true, Ordering::SeqCst);
        self.host.skip_waiting()?;
        Ok(None)
      }
      ControlMessage::GetVersion => Ok(Some(VersionReply {
        version: self.config.version.clone(),
      })),
    }
  }
}
