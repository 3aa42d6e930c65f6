use std::rc::Rc;
use std::time::Instant;

use super::dom::Element;
use super::events::PageEvent;
use super::utils::Throttle;
use super::{Controller, Window};

/// Navbar gets `scrolled` once the page is scrolled past this offset.
const SCROLLED_OFFSET: i64 = 100;
/// Height of the fixed navbar; in-page jumps land this far above the section.
const NAV_HEIGHT: i64 = 80;
/// A section becomes current when scrolled within this distance of its top.
const ACTIVE_OFFSET: i64 = 100;

/// Mobile menu, sticky navbar styling, in-page links and active link tracking.
pub struct NavigationController {
  navbar: Element,
  hamburger: Element,
  menu: Element,
  body: Element,
  links: Vec<Element>,
  sections: Vec<Element>,
  window: Rc<dyn Window>,
  throttle: Throttle,
}

impl NavigationController {
  /// `sections` are the page sections carrying an `id`, in document order.
  pub fn new(
    navbar: Element,
    hamburger: Element,
    menu: Element,
    body: Element,
    links: Vec<Element>,
    sections: Vec<Element>,
    window: Rc<dyn Window>,
  ) -> Self {
    Self {
      navbar,
      hamburger,
      menu,
      body,
      links,
      sections,
      window,
      throttle: Throttle::default(),
    }
  }

  pub fn is_open(&self) -> bool {
    self.menu.has_class("active")
  }

  fn toggle_menu(&self) {
    self.hamburger.toggle_class("active");
    let open = self.menu.toggle_class("active");
    self.body.toggle_class("menu-open");
    self
      .hamburger
      .set_attr("aria-expanded", if open { "true" } else { "false" });
  }

  fn close_menu(&self) {
    self.hamburger.remove_class("active");
    self.menu.remove_class("active");
    self.body.remove_class("menu-open");
    self.hamburger.set_attr("aria-expanded", "false");
  }

  fn section_for(&self, href: &str) -> Option<&Element> {
    let id = href.strip_prefix('#')?;
    self
      .sections
      .iter()
      .find(|s| s.attr("id").as_deref() == Some(id))
  }

  fn follow_link(&self, link: &Element) {
    let Some(href) = link.attr("href") else {
      return;
    };
    if !href.starts_with('#') {
      return;
    }
    if let Some(section) = self.section_for(&href) {
      self.window.scroll_to(section.offset_top() - NAV_HEIGHT);
      self.close_menu();
    }
  }

  fn on_click(&self, target: &Element) {
    if self.hamburger.contains(target) {
      self.toggle_menu();
    } else if let Some(link) = self.links.iter().find(|l| l.contains(target)) {
      self.follow_link(link);
    }

    if !self.navbar.contains(target) && self.is_open() {
      self.close_menu();
    }
  }

  fn on_scroll(&mut self, y: i64, at: Instant) {
    if !self.throttle.ready(at) {
      return;
    }

    if y > SCROLLED_OFFSET {
      self.navbar.add_class("scrolled");
    } else {
      self.navbar.remove_class("scrolled");
    }

    let current = self
      .sections
      .iter()
      .rev()
      .find(|s| y >= s.offset_top() - ACTIVE_OFFSET)
      .and_then(|s| s.attr("id"));

    for link in &self.links {
      let is_current = match (&current, link.attr("href")) {
        (Some(id), Some(href)) => href.strip_prefix('#') == Some(id.as_str()),
        _ => false,
      };
      if is_current {
        link.add_class("active");
      } else {
        link.remove_class("active");
      }
    }
  }
}

impl Controller for NavigationController {
  fn handle(&mut self, event: &PageEvent) {
    match event {
      PageEvent::Click { target } => self.on_click(target),
      PageEvent::KeyDown { key } if key == "Escape" && self.is_open() => self.close_menu(),
      PageEvent::Scroll { y, at } => self.on_scroll(*y, *at),
      _ => {}
    }
  }
}
