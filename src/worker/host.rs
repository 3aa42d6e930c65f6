//! Capabilities the hosting environment provides to the worker.

use color_eyre::{eyre::eyre, Result};
use tracing::info;

use super::notify::Notification;

/// Host-side operations the worker can request.
pub trait WorkerHost: Send + Sync {
  /// Let a freshly installed version skip the waiting state.
  fn skip_waiting(&self) -> Result<()>;

  /// Take control of all open pages without a reload.
  fn claim_clients(&self) -> Result<()>;

  /// Display a notification.
  fn show_notification(&self, title: &str, notification: &Notification) -> Result<()>;

  /// Close the notification that was just clicked.
  fn close_notification(&self) -> Result<()>;

  /// Open (or focus) a page at `url`.
  fn open_window(&self, url: &str) -> Result<()>;
}

/// Host used by the command line: logs lifecycle signals and prints
/// notifications as JSON on stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleHost;

impl WorkerHost for ConsoleHost {
  fn skip_waiting(&self) -> Result<()> {
    info!("Skip waiting requested");
    Ok(())
  }

  fn claim_clients(&self) -> Result<()> {
    info!("Claiming clients");
    Ok(())
  }

  fn show_notification(&self, title: &str, notification: &Notification) -> Result<()> {
    let json = serde_json::json!({
      "title": title,
      "options": notification,
    });
    let rendered = serde_json::to_string_pretty(&json)
      .map_err(|e| eyre!("Failed to render notification: {}", e))?;
    println!("{}", rendered);
    Ok(())
  }

  fn close_notification(&self) -> Result<()> {
    info!("Closing notification");
    Ok(())
  }

  fn open_window(&self, url: &str) -> Result<()> {
    println!("open {}", url);
    Ok(())
  }
}
