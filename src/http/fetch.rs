//! Network fetcher trait and its reqwest implementation.

use color_eyre::{eyre::eyre, Result};
use reqwest::header::ACCESS_CONTROL_ALLOW_ORIGIN;
use std::future::Future;
use std::time::Duration;
use url::Url;

use super::request::Request;
use super::response::{ResponseKind, ResponseSnapshot};

/// Performs a request and yields a snapshot of the response.
///
/// An `Err` means the network could not be reached. HTTP error statuses are
/// returned as `Ok` snapshots, the same way `fetch()` resolves for them.
pub trait Fetcher: Send + Sync {
  fn fetch(&self, request: &Request) -> impl Future<Output = Result<ResponseSnapshot>> + Send;
}

/// Fetcher backed by a shared reqwest client.
#[derive(Clone)]
pub struct HttpFetcher {
  client: reqwest::Client,
  /// Responses from this origin are classified as `basic`
  origin: Url,
}

impl HttpFetcher {
  /// Create a fetcher for the given site origin.
  ///
  /// `timeout` bounds each request; `None` leaves requests unbounded.
  pub fn new(origin: Url, timeout: Option<Duration>) -> Result<Self> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = timeout {
      builder = builder.timeout(timeout);
    }
    let client = builder
      .build()
      .map_err(|e| eyre!("Failed to build HTTP client: {}", e))?;

    Ok(Self { client, origin })
  }

  fn classify(&self, url: &Url, headers: &reqwest::header::HeaderMap) -> ResponseKind {
    if url.origin() == self.origin.origin() {
      ResponseKind::Basic
    } else if headers.contains_key(ACCESS_CONTROL_ALLOW_ORIGIN) {
      ResponseKind::Cors
    } else {
      ResponseKind::Opaque
    }
  }
}

impl Fetcher for HttpFetcher {
  async fn fetch(&self, request: &Request) -> Result<ResponseSnapshot> {
    let mut builder = self
      .client
      .request(request.method.clone(), request.url.clone());
    for (name, value) in &request.headers {
      builder = builder.header(name.as_str(), value.as_str());
    }
    if let Some(body) = &request.body {
      builder = builder.body(body.clone());
    }

    let response = builder
      .send()
      .await
      .map_err(|e| eyre!("Failed to fetch {}: {}", request.url, e))?;

    let url = response.url().clone();
    let status = response.status().as_u16();
    let kind = self.classify(&url, response.headers());
    let headers = response
      .headers()
      .iter()
      .filter_map(|(name, value)| {
        value
          .to_str()
          .ok()
          .map(|v| (name.as_str().to_string(), v.to_string()))
      })
      .collect();

    let body = response
      .bytes()
      .await
      .map_err(|e| eyre!("Failed to read body of {}: {}", url, e))?;

    Ok(ResponseSnapshot {
      url: url.to_string(),
      status,
      headers,
      body,
      kind,
    })
  }
}
