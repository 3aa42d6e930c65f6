use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use reqwest::Method;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use shopfront::cache::{CacheStore, SqliteStore};
use shopfront::config::Config;
use shopfront::http::{Destination, HttpFetcher, Request};
use shopfront::logging;
use shopfront::page::{HttpSubmitter, SubmitOutcome, Submitter};
use shopfront::worker::{
  CacheManager, ConsoleHost, ControlMessage, FetchOutcome, NotificationDispatcher, PendingStore,
  RequestOptions, SyncQueue,
};

#[derive(Parser, Debug)]
#[command(name = "shopfront")]
#[command(about = "Offline cache, background sync and push handling for a sales site")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/shopfront/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Site origin, overriding the config file
  #[arg(short, long)]
  origin: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Precache the static assets, then activate
  Install,
  /// Activate an installed version and evict stale partitions
  Activate,
  /// Intercept one request
  Fetch {
    url: String,
    #[arg(short, long, default_value = "GET")]
    method: String,
    /// Treat the request as a page navigation
    #[arg(long)]
    navigate: bool,
  },
  /// Queue a request for background sync
  Enqueue {
    url: String,
    #[arg(short, long, default_value = "POST")]
    method: String,
    #[arg(short, long)]
    body: Option<String>,
  },
  /// Fire a sync event
  Sync {
    #[arg(short, long)]
    tag: Option<String>,
  },
  /// Submit form fields (name=value) to the configured form endpoint
  Submit { fields: Vec<String> },
  /// Deliver a push message
  Push { payload: Option<String> },
  /// Click a notification action
  Click { action: Option<String> },
  /// Post a JSON control message to the worker
  Message { json: String },
  /// List cache partitions
  Partitions,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let mut config = Config::load(args.config.as_deref())?;

  // Override origin if specified on command line
  if let Some(origin) = args.origin {
    config.origin = origin;
    config.origin_url()?;
  }

  let _guard = logging::init(&Config::data_dir()?)?;
  info!(command = ?args.command, "Starting");

  run(config, args.command).await
}

async fn run(config: Config, command: Command) -> Result<()> {
  let origin = config.origin_url()?;
  let storage = Arc::new(SqliteStore::open(&config.database_path()?)?);
  let fetcher = Arc::new(HttpFetcher::new(origin.clone(), config.network.timeout())?);
  let host = Arc::new(ConsoleHost);

  let manager = CacheManager::new(
    origin.clone(),
    config.cache.clone(),
    Arc::clone(&storage),
    Arc::clone(&fetcher),
    Arc::clone(&host),
  );
  let queue = SyncQueue::new(
    Arc::clone(&storage),
    Arc::clone(&fetcher),
    config.sync.tag.clone(),
  );

  match command {
    Command::Install => {
      let mut manager = manager;
      manager.install().await?;
      println!("installed {}", manager.version());
      if manager.ready_to_activate() {
        for deleted in manager.activate()? {
          println!("deleted {}", deleted);
        }
      }
      println!("state {}", manager.state());
    }
    Command::Activate => {
      let mut manager = manager.installed()?;
      for deleted in manager.activate()? {
        println!("deleted {}", deleted);
      }
      println!("state {}", manager.state());
    }
    Command::Fetch {
      url,
      method,
      navigate,
    } => {
      let manager = manager.resume()?;
      let url = origin
        .join(&url)
        .map_err(|e| eyre!("Invalid URL '{}': {}", url, e))?;
      let mut request = Request::parse(&method, url.as_str())?;
      if navigate {
        request = request.with_destination(Destination::Document);
      }

      match manager.handle_fetch(&request).await? {
        FetchOutcome::Passthrough => println!("passthrough (worker {})", manager.state()),
        FetchOutcome::Unavailable => println!("unavailable"),
        FetchOutcome::Respond(result) => println!(
          "{} {} {} bytes",
          result.source.as_str(),
          result.data.status,
          result.data.body.len()
        ),
      }
    }
    Command::Enqueue { url, method, body } => {
      let url = origin
        .join(&url)
        .map_err(|e| eyre!("Invalid URL '{}': {}", url, e))?;
      let method = Method::from_bytes(method.to_uppercase().as_bytes())
        .map_err(|e| eyre!("Invalid method '{}': {}", method, e))?;
      let mut options = RequestOptions::new(method);
      if let Some(body) = body {
        options = options.with_body(body);
      }
      let id = queue.enqueue(url.as_str(), &options)?;
      println!("queued {}", id);
    }
    Command::Sync { tag } => {
      let tag = tag.unwrap_or_else(|| config.sync.tag.clone());
      match queue.on_sync(&tag).await? {
        Some(report) => {
          println!("synced {:?}", report.synced);
          println!("retained {:?}", report.retained);
        }
        None => println!("ignored sync tag '{}'", tag),
      }
    }
    Command::Submit { fields } => {
      let endpoint = config
        .form_endpoint()?
        .ok_or_else(|| eyre!("No form endpoint configured (forms.endpoint)"))?;
      let fields = fields
        .iter()
        .map(|field| {
          field
            .split_once('=')
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .ok_or_else(|| eyre!("Expected name=value, got '{}'", field))
        })
        .collect::<Result<Vec<_>>>()?;

      let submitter = HttpSubmitter::new(Arc::clone(&fetcher), Arc::clone(&storage), endpoint);
      match submitter.submit(&fields).await? {
        SubmitOutcome::Sent => println!("sent"),
        SubmitOutcome::Queued => println!("queued ({} pending)", storage.list()?.len()),
      }
    }
    Command::Push { payload } => {
      let dispatcher = NotificationDispatcher::new(config.notifications.clone(), host);
      dispatcher.on_push(payload.as_deref())?;
    }
    Command::Click { action } => {
      let dispatcher = NotificationDispatcher::new(config.notifications.clone(), host);
      let outcome = dispatcher.on_click(action.as_deref())?;
      println!("{:?}", outcome);
    }
    Command::Message { json } => {
      let manager = manager.installed()?;
      match ControlMessage::parse(&json)? {
        Some(message) => {
          if let Some(reply) = manager.handle_message(message)? {
            let rendered = serde_json::to_string(&reply)
              .map_err(|e| eyre!("Failed to render reply: {}", e))?;
            println!("{}", rendered);
          }
        }
        None => println!("ignored"),
      }
    }
    Command::Partitions => {
      for name in storage.partitions()? {
        println!("{}\t{}", name, storage.keys(&name)?.len());
      }
    }
  }

  Ok(())
}
