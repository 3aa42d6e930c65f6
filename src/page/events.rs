use std::time::Instant;
use tokio::sync::mpsc;

use super::dom::Element;

/// Page events
#[derive(Debug, Clone)]
pub enum PageEvent {
  /// Document parsed; controllers apply their initial state
  DomReady,
  /// All resources loaded
  Load { at: Instant },
  /// Window scrolled to vertical offset `y`
  Scroll { y: i64, at: Instant },
  Click { target: Element },
  KeyDown { key: String },
  MouseDown,
  /// `target` entered the viewport with `ratio` of it visible
  Intersect { target: Element, ratio: f64 },
  /// Value of a form control changed
  Change { target: Element },
  /// Animation frame / timer tick
  Tick { at: Instant },
  Submit { form: Element },
}

impl PageEvent {
  pub fn key(key: &str) -> Self {
    Self::KeyDown {
      key: key.to_string(),
    }
  }

  pub fn click(target: &Element) -> Self {
    Self::Click {
      target: target.clone(),
    }
  }
}

/// Sending half of a page event queue.
pub type EventSender = mpsc::UnboundedSender<PageEvent>;

/// Receiving half of a page event queue.
///
/// Events carry element handles, so the queue lives on the page's thread.
pub struct EventHandler {
  rx: mpsc::UnboundedReceiver<PageEvent>,
}

impl EventHandler {
  /// Create a queue; events are delivered in send order.
  pub fn channel() -> (EventSender, Self) {
    let (tx, rx) = mpsc::unbounded_channel();
    (tx, Self { rx })
  }

  /// Receive the next event; `None` once every sender is dropped.
  pub async fn next(&mut self) -> Option<PageEvent> {
    self.rx.recv().await
  }
}
