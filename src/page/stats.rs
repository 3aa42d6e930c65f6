use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::debug;

use super::dom::{Element, ElementId};
use super::events::PageEvent;
use super::utils::{ease_out_quart, format_thousands};
use super::Controller;

/// Visible fraction required to start a counter.
pub const STATS_THRESHOLD: f64 = 0.5;
pub const COUNT_DURATION: Duration = Duration::from_millis(2000);

struct Counter {
  element: Element,
  target: i64,
  prefix: String,
  suffix: String,
  /// Set by the first tick after the counter became visible
  started: Option<Instant>,
}

impl Counter {
  fn render(&self, value: i64) {
    self.element.set_text(&format!(
      "{}{}{}",
      self.prefix,
      format_thousands(value),
      self.suffix
    ));
  }

  /// Advance to `now`; returns true once the final value is rendered.
  fn step(&mut self, now: Instant) -> bool {
    let started = *self.started.get_or_insert(now);
    let elapsed = now.saturating_duration_since(started);
    let progress = (elapsed.as_secs_f64() / COUNT_DURATION.as_secs_f64()).min(1.0);
    let value = (self.target as f64 * ease_out_quart(progress)).floor() as i64;
    self.render(value);
    progress >= 1.0
  }
}

/// Counts `data-count` elements up from zero the first time they scroll into
/// view.
pub struct StatsAnimator {
  stats: Vec<Element>,
  animated: HashSet<ElementId>,
  running: Vec<Counter>,
}

impl StatsAnimator {
  pub fn new(stats: Vec<Element>) -> Self {
    Self {
      stats,
      animated: HashSet::new(),
      running: Vec::new(),
    }
  }

  pub fn is_animating(&self) -> bool {
    !self.running.is_empty()
  }

  fn start(&mut self, target: &Element) {
    let Some(element) = self.stats.iter().find(|s| s.same(target)) else {
      return;
    };
    if !self.animated.insert(element.id()) {
      return;
    }

    let raw = element.data("count").unwrap_or_default();
    let Ok(count) = raw.trim().parse::<i64>() else {
      debug!(value = %raw, "Skipping counter with invalid data-count");
      return;
    };

    self.running.push(Counter {
      element: element.clone(),
      target: count,
      prefix: element.data("prefix").unwrap_or_default(),
      suffix: element.data("suffix").unwrap_or_default(),
      started: None,
    });
  }
}

impl Controller for StatsAnimator {
  fn handle(&mut self, event: &PageEvent) {
    match event {
      PageEvent::Intersect { target, ratio } if *ratio >= STATS_THRESHOLD => self.start(target),
      PageEvent::Tick { at } => self.running.retain_mut(|c| !c.step(*at)),
      _ => {}
    }
  }
}
