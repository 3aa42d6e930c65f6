use std::time::{Duration, Instant};

use super::dom::Element;
use super::events::PageEvent;
use super::Controller;

const SPINNER_AFTER_LOAD: Duration = Duration::from_millis(500);
const SPINNER_FALLBACK: Duration = Duration::from_secs(3);
const SPINNER_FADE: Duration = Duration::from_millis(300);

/// Visible fraction at which a section is revealed.
pub const REVEAL_THRESHOLD: f64 = 0.1;

/// Hides the loading spinner shortly after load, or after a fallback delay
/// if load never fires.
pub struct LoadingSpinner {
  spinner: Element,
  hide_at: Instant,
  faded: bool,
  removed: bool,
}

impl LoadingSpinner {
  pub fn new(spinner: Element, now: Instant) -> Self {
    Self {
      spinner,
      hide_at: now + SPINNER_FALLBACK,
      faded: false,
      removed: false,
    }
  }

  fn tick(&mut self, now: Instant) {
    if !self.faded && now >= self.hide_at {
      self.spinner.set_style("opacity", "0");
      self.faded = true;
    }
    if self.faded && !self.removed && now >= self.hide_at + SPINNER_FADE {
      self.spinner.set_style("display", "none");
      self.removed = true;
    }
  }
}

impl Controller for LoadingSpinner {
  fn handle(&mut self, event: &PageEvent) {
    match event {
      PageEvent::Load { at } if !self.faded => {
        self.hide_at = self.hide_at.min(*at + SPINNER_AFTER_LOAD);
      }
      PageEvent::Tick { at } => self.tick(*at),
      _ => {}
    }
  }
}

/// Fades sections in as they scroll into view and marks the body loaded.
pub struct SectionReveal {
  body: Element,
  sections: Vec<Element>,
}

impl SectionReveal {
  pub fn new(body: Element, sections: Vec<Element>) -> Self {
    Self { body, sections }
  }
}

impl Controller for SectionReveal {
  fn handle(&mut self, event: &PageEvent) {
    match event {
      PageEvent::DomReady => {
        for section in &self.sections {
          section.add_class("section-hidden");
        }
      }
      PageEvent::Intersect { target, ratio } if *ratio >= REVEAL_THRESHOLD => {
        if let Some(section) = self.sections.iter().find(|s| s.same(target)) {
          section.add_class("section-visible");
        }
      }
      PageEvent::Load { .. } => self.body.add_class("loaded"),
      _ => {}
    }
  }
}

/// Staggers the hero particle animations.
pub struct Particles {
  particles: Vec<Element>,
}

impl Particles {
  pub fn new(particles: Vec<Element>) -> Self {
    Self { particles }
  }
}

impl Controller for Particles {
  fn handle(&mut self, event: &PageEvent) {
    if let PageEvent::DomReady = event {
      for (i, particle) in self.particles.iter().enumerate() {
        let i = i as u64;
        particle.set_style("animation-duration", &format!("{}ms", 3000 + i * 500));
        particle.set_style("animation-delay", &format!("{}ms", i * 200));
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn tick(at: Instant) -> PageEvent {
    PageEvent::Tick { at }
  }

  #[test]
  fn test_spinner_hides_after_load() {
    let spinner = Element::new("div");
    let start = Instant::now();
    let mut loading = LoadingSpinner::new(spinner.clone(), start);

    loading.handle(&PageEvent::Load {
      at: start + Duration::from_millis(1000),
    });
    loading.handle(&tick(start + Duration::from_millis(1400)));
    assert_eq!(spinner.style("opacity"), None);

    loading.handle(&tick(start + Duration::from_millis(1500)));
    assert_eq!(spinner.style("opacity").as_deref(), Some("0"));
    assert_eq!(spinner.style("display"), None);

    loading.handle(&tick(start + Duration::from_millis(1800)));
    assert_eq!(spinner.style("display").as_deref(), Some("none"));
  }

  #[test]
  fn test_spinner_fallback_without_load() {
    let spinner = Element::new("div");
    let start = Instant::now();
    let mut loading = LoadingSpinner::new(spinner.clone(), start);

    loading.handle(&tick(start + Duration::from_millis(2999)));
    assert_eq!(spinner.style("opacity"), None);
    loading.handle(&tick(start + SPINNER_FALLBACK));
    assert_eq!(spinner.style("opacity").as_deref(), Some("0"));
  }

  #[test]
  fn test_late_load_does_not_delay_fallback() {
    let spinner = Element::new("div");
    let start = Instant::now();
    let mut loading = LoadingSpinner::new(spinner.clone(), start);

    loading.handle(&PageEvent::Load {
      at: start + Duration::from_millis(2900),
    });
    loading.handle(&tick(start + SPINNER_FALLBACK));
    assert_eq!(spinner.style("opacity").as_deref(), Some("0"));
  }

  #[test]
  fn test_sections_reveal_on_intersect() {
    let body = Element::new("body");
    let sections = vec![Element::new("section"), Element::new("section")];
    let mut reveal = SectionReveal::new(body.clone(), sections.clone());

    reveal.handle(&PageEvent::DomReady);
    assert!(sections.iter().all(|s| s.has_class("section-hidden")));

    reveal.handle(&PageEvent::Intersect {
      target: sections[1].clone(),
      ratio: 0.05,
    });
    assert!(!sections[1].has_class("section-visible"));

    reveal.handle(&PageEvent::Intersect {
      target: sections[1].clone(),
      ratio: 0.1,
    });
    assert!(sections[1].has_class("section-visible"));
    assert!(!sections[0].has_class("section-visible"));

    reveal.handle(&PageEvent::Load { at: Instant::now() });
    assert!(body.has_class("loaded"));
  }

  #[test]
  fn test_particle_timings() {
    let particles: Vec<Element> = (0..3).map(|_| Element::new("div")).collect();
    let mut effect = Particles::new(particles.clone());
    effect.handle(&PageEvent::DomReady);

    assert_eq!(particles[0].style("animation-duration").as_deref(), Some("3000ms"));
    assert_eq!(particles[0].style("animation-delay").as_deref(), Some("0ms"));
    assert_eq!(particles[2].style("animation-duration").as_deref(), Some("4000ms"));
    assert_eq!(particles[2].style("animation-delay").as_deref(), Some("400ms"));
  }
}
