use std::time::{Duration, Instant};

/// Scroll handlers run at most once per frame.
pub const FRAME: Duration = Duration::from_millis(16);

/// Leading-edge throttle: the first call passes, calls inside the window are
/// dropped.
#[derive(Debug, Clone)]
pub struct Throttle {
  interval: Duration,
  last: Option<Instant>,
}

impl Throttle {
  pub fn new(interval: Duration) -> Self {
    Self {
      interval,
      last: None,
    }
  }

  pub fn ready(&mut self, now: Instant) -> bool {
    match self.last {
      Some(last) if now.saturating_duration_since(last) < self.interval => false,
      _ => {
        self.last = Some(now);
        true
      }
    }
  }
}

impl Default for Throttle {
  fn default() -> Self {
    Self::new(FRAME)
  }
}

/// Ease-out quartic curve over `progress` in `[0, 1]`.
pub fn ease_out_quart(progress: f64) -> f64 {
  let p = progress.clamp(0.0, 1.0);
  1.0 - (1.0 - p).powi(4)
}

/// Render an integer with `,` thousands separators.
pub fn format_thousands(value: i64) -> String {
  let digits = value.unsigned_abs().to_string();
  let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
  if value < 0 {
    out.push('-');
  }
  for (i, ch) in digits.chars().enumerate() {
    if i > 0 && (digits.len() - i) % 3 == 0 {
      out.push(',');
    }
    out.push(ch);
  }
  out
}

/// Zero-pad to two digits.
pub fn pad2(value: u64) -> String {
  format!("{:02}", value)
}
