//! Control messages exchanged between pages and the worker.

use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Messages a page may post to the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
  /// Activate a waiting update immediately
  SkipWaiting,
  /// Ask for the active cache version
  GetVersion,
}

impl ControlMessage {
  /// Parse a JSON message.
  ///
  /// Returns `Ok(None)` for well-formed JSON that is not a known control
  /// message; those are ignored rather than treated as errors.
  pub fn parse(raw: &str) -> Result<Option<Self>> {
    let value: serde_json::Value =
      serde_json::from_str(raw).map_err(|e| eyre!("Invalid message JSON: {}", e))?;
    match serde_json::from_value(value) {
      Ok(message) => Ok(Some(message)),
      Err(e) => {
        debug!(error = %e, "Ignoring unknown control message");
        Ok(None)
      }
    }
  }
}

/// Reply to [`ControlMessage::GetVersion`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionReply {
  pub version: String,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_known_messages() {
    assert_eq!(
      ControlMessage::parse(r#"{"type":"SKIP_WAITING"}"#).unwrap(),
      Some(ControlMessage::SkipWaiting)
    );
    assert_eq!(
      ControlMessage::parse(r#"{"type":"GET_VERSION","extra":1}"#).unwrap(),
      Some(ControlMessage::GetVersion)
    );
  }

  #[test]
  fn test_unknown_message_is_ignored() {
    assert_eq!(ControlMessage::parse(r#"{"type":"PING"}"#).unwrap(), None);
    assert_eq!(ControlMessage::parse(r#""hello""#).unwrap(), None);
  }

  #[test]
  fn test_invalid_json_is_error() {
    assert!(ControlMessage::parse("{type:").is_err());
  }

  #[test]
  fn test_version_reply_shape() {
    let reply = VersionReply {
      version: "site-v1.0.0".to_string(),
    };
    assert_eq!(
      serde_json::to_string(&reply).unwrap(),
      r#"{"version":"site-v1.0.0"}"#
    );
  }
}
