use std::time::{Duration, Instant};

use super::dom::Element;
use super::events::PageEvent;
use super::utils::pad2;
use super::Controller;

/// Length of the offer window, counted from page construction.
pub const OFFER_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

const EXPIRED_MARKUP: &str = r#"<span class="timer-expired">Offer Expired</span>"#;

/// Urgency timer counting down to a deadline fixed when the page starts.
///
/// The deadline is not persisted; every page load starts a fresh window.
pub struct Countdown {
  timer: Element,
  deadline: Instant,
}

impl Countdown {
  /// Start the window at `now` and render the initial state.
  pub fn new(timer: Element, now: Instant) -> Self {
    let countdown = Self {
      timer,
      deadline: now + OFFER_WINDOW,
    };
    countdown.render(now);
    countdown
  }

  pub fn remaining(&self, now: Instant) -> Duration {
    self.deadline.saturating_duration_since(now)
  }

  fn render(&self, now: Instant) {
    let remaining = self.remaining(now);
    if remaining.is_zero() {
      self.timer.set_inner_html(EXPIRED_MARKUP);
      return;
    }

    let secs = remaining.as_secs();
    let units = [
      (secs / 3600, "Hours"),
      ((secs % 3600) / 60, "Minutes"),
      (secs % 60, "Seconds"),
    ];
    let html = units
      .iter()
      .map(|(value, label)| {
        format!(
          r#"<div class="timer-unit"><span class="timer-number">{}</span><span class="timer-label">{}</span></div>"#,
          pad2(*value),
          label
        )
      })
      .collect::<Vec<_>>()
      .join(r#"<div class="timer-separator">:</div>"#);
    self.timer.set_inner_html(&html);
  }
}

impl Controller for Countdown {
  fn handle(&mut self, event: &PageEvent) {
    if let PageEvent::Tick { at } = event {
      self.render(*at);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn numbers(html: &str) -> Vec<String> {
    html
      .split(r#"<span class="timer-number">"#)
      .skip(1)
      .filter_map(|part| part.split('<').next())
      .map(String::from)
      .collect()
  }

  #[test]
  fn test_initial_render_shows_full_window() {
    let timer = Element::new("div").with_class("urgency-timer");
    Countdown::new(timer.clone(), Instant::now());
    assert_eq!(numbers(&timer.inner_html()), vec!["24", "00", "00"]);
    assert!(timer.inner_html().contains(r#"<div class="timer-separator">:</div>"#));
  }

  #[test]
  fn test_tick_renders_remaining_time() {
    let timer = Element::new("div");
    let start = Instant::now();
    let mut countdown = Countdown::new(timer.clone(), start);

    countdown.handle(&PageEvent::Tick {
      at: start + Duration::from_secs(3600 + 2 * 60 + 5),
    });
    assert_eq!(numbers(&timer.inner_html()), vec!["22", "57", "55"]);
    assert!(timer.inner_html().contains("Minutes"));
  }

  #[test]
  fn test_expired_offer() {
    let timer = Element::new("div");
    let start = Instant::now();
    let mut countdown = Countdown::new(timer.clone(), start);

    countdown.handle(&PageEvent::Tick {
      at: start + OFFER_WINDOW,
    });
    assert_eq!(timer.inner_html(), EXPIRED_MARKUP);
    assert!(countdown.remaining(start + OFFER_WINDOW * 2).is_zero());
  }
}
