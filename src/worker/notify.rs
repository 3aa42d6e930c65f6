//! Push notification dispatch and click routing.

use chrono::Utc;
use color_eyre::Result;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use super::host::WorkerHost;
use crate::config::NotificationConfig;

/// Action that opens the site.
pub const EXPLORE_ACTION: &str = "explore";
/// Action that only dismisses.
pub const CLOSE_ACTION: &str = "close";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationAction {
  pub action: String,
  pub title: String,
  pub icon: String,
}

/// Metadata attached for the click handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
  /// Milliseconds since the Unix epoch
  pub date_of_arrival: i64,
  pub primary_key: u32,
}

/// Notification options handed to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
  pub body: String,
  pub icon: String,
  pub badge: String,
  pub vibrate: Vec<u32>,
  pub data: NotificationData,
  pub actions: Vec<NotificationAction>,
}

/// What a notification click resulted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
  /// The site root was opened
  Opened,
  Dismissed,
}

pub struct NotificationDispatcher<H: WorkerHost> {
  config: NotificationConfig,
  host: Arc<H>,
}

impl<H: WorkerHost> NotificationDispatcher<H> {
  pub fn new(config: NotificationConfig, host: Arc<H>) -> Self {
    Self { config, host }
  }

  /// Build the notification for a push payload.
  pub fn build(&self, payload: Option<&str>) -> Notification {
    let action = |action: &str, title: &str| NotificationAction {
      action: action.to_string(),
      title: title.to_string(),
      icon: self.config.icon.clone(),
    };

    Notification {
      body: payload
        .map(String::from)
        .unwrap_or_else(|| self.config.default_body.clone()),
      icon: self.config.icon.clone(),
      badge: self.config.badge.clone(),
      vibrate: vec![100, 50, 100],
      data: NotificationData {
        date_of_arrival: Utc::now().timestamp_millis(),
        primary_key: 1,
      },
      actions: vec![
        action(EXPLORE_ACTION, "Explore"),
        action(CLOSE_ACTION, "Close"),
      ],
    }
  }

  /// Show a notification for an incoming push. Host errors propagate.
  pub fn on_push(&self, payload: Option<&str>) -> Result<Notification> {
    info!("Push notification received");
    let notification = self.build(payload);
    self
      .host
      .show_notification(&self.config.title, &notification)?;
    Ok(notification)
  }

  /// Close the clicked notification, then route its action.
  pub fn on_click(&self, action: Option<&str>) -> Result<ClickOutcome> {
    info!(action = action.unwrap_or(""), "Notification clicked");
    self.host.close_notification()?;
    match action {
      Some(EXPLORE_ACTION) => {
        self.host.open_window("/")?;
        Ok(ClickOutcome::Opened)
      }
      _ => Ok(ClickOutcome::Dismissed),
    }
  }
}
