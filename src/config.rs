use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  /// Site origin every root-relative path is resolved against
  pub origin: String,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub network: NetworkConfig,
  #[serde(default)]
  pub sync: SyncConfig,
  #[serde(default)]
  pub notifications: NotificationConfig,
  #[serde(default)]
  pub forms: FormsConfig,
  /// Database file (defaults to the data directory)
  pub database: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// Version string reported to pages
  pub version: String,
  pub static_partition: String,
  pub dynamic_partition: String,
  /// Root-relative paths cached at install time
  #[serde(deserialize_with = "deserialize_asset_paths")]
  pub static_assets: Vec<String>,
  /// Document served for navigations while offline
  pub fallback_document: String,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      version: "site-v1.0.0".to_string(),
      static_partition: "site-static-v1".to_string(),
      dynamic_partition: "site-dynamic-v1".to_string(),
      static_assets: ["/", "/index.html", "/styles.css", "/script.js", "/manifest.json"]
        .into_iter()
        .map(String::from)
        .collect(),
      fallback_document: "/index.html".to_string(),
    }
  }
}

fn deserialize_asset_paths<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
  D: serde::Deserializer<'de>,
{
  let v: Vec<String> = Vec::deserialize(deserializer)?;
  v.into_iter()
    .map(|p| p.trim().to_string())
    .map(|p| {
      if p.starts_with('/') {
        Ok(p)
      } else {
        Err(serde::de::Error::custom(format!(
          "static asset '{}' must be a root-relative path",
          p
        )))
      }
    })
    .collect()
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
  /// Per-request timeout; unset means requests may wait indefinitely
  pub timeout_ms: Option<u64>,
}

impl NetworkConfig {
  pub fn timeout(&self) -> Option<Duration> {
    self.timeout_ms.map(Duration::from_millis)
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
  /// Sync event tag that triggers a replay of pending requests
  pub tag: String,
}

impl Default for SyncConfig {
  fn default() -> Self {
    Self {
      tag: "background-sync".to_string(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
  pub title: String,
  /// Body used when a push arrives without payload
  pub default_body: String,
  pub icon: String,
  pub badge: String,
}

impl Default for NotificationConfig {
  fn default() -> Self {
    Self {
      title: "Sales Site".to_string(),
      default_body: "New update from Sales Site!".to_string(),
      icon: "/icon-192x192.png".to_string(),
      badge: "/icon-72x72.png".to_string(),
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FormsConfig {
  /// Root-relative or absolute endpoint forms are posted to
  pub endpoint: Option<String>,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./shopfront.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/shopfront/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/shopfront/config.yaml"
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("shopfront.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("shopfront").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  /// Parse and validate YAML configuration.
  pub fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents).map_err(|e| eyre!("{}", e))?;
    config.origin_url()?;

    if config.cache.static_partition == config.cache.dynamic_partition {
      return Err(eyre!(
        "Static and dynamic partitions must have different names (both are '{}')",
        config.cache.static_partition
      ));
    }

    // Offline navigations are answered from the static partition only
    if !config
      .cache
      .static_assets
      .contains(&config.cache.fallback_document)
    {
      return Err(eyre!(
        "Fallback document '{}' must be listed in cache.static_assets",
        config.cache.fallback_document
      ));
    }

    Ok(config)
  }

  pub fn origin_url(&self) -> Result<Url> {
    let url =
      Url::parse(&self.origin).map_err(|e| eyre!("Invalid origin '{}': {}", self.origin, e))?;
    match url.scheme() {
      "http" | "https" => Ok(url),
      other => Err(eyre!("Origin must be http or https, got '{}'", other)),
    }
  }

  /// Absolute URL forms are submitted to, if configured.
  pub fn form_endpoint(&self) -> Result<Option<Url>> {
    match &self.forms.endpoint {
      Some(endpoint) => {
        let url = self
          .origin_url()?
          .join(endpoint)
          .map_err(|e| eyre!("Invalid form endpoint '{}': {}", endpoint, e))?;
        Ok(Some(url))
      }
      None => Ok(None),
    }
  }

  pub fn database_path(&self) -> Result<PathBuf> {
    match &self.database {
      Some(path) => Ok(path.clone()),
      None => Ok(Self::data_dir()?.join("cache.db")),
    }
  }

  /// Per-user data directory for the database and logs.
  pub fn data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("shopfront"))
  }
}
