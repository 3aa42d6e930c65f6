use std::rc::Rc;

use super::dom::Element;
use super::events::PageEvent;
use super::{Controller, Window};

/// Skip link, Escape handling, keyboard focus styling and reduced motion.
pub struct AccessibilityController {
  body: Element,
  main: Option<Element>,
  skip_link: Option<Element>,
  /// Elements that may carry `active` (menus, dialogs)
  dismissable: Vec<Element>,
  window: Rc<dyn Window>,
}

impl AccessibilityController {
  pub fn new(
    body: Element,
    main: Option<Element>,
    skip_link: Option<Element>,
    dismissable: Vec<Element>,
    window: Rc<dyn Window>,
  ) -> Self {
    Self {
      body,
      main,
      skip_link,
      dismissable,
      window,
    }
  }

  fn skip_to_main(&self) {
    if let Some(main) = &self.main {
      main.focus();
      self.window.scroll_into_view(main);
    }
  }
}

impl Controller for AccessibilityController {
  fn handle(&mut self, event: &PageEvent) {
    match event {
      PageEvent::DomReady => {
        if self.window.prefers_reduced_motion() {
          self.body.add_class("reduced-motion");
        }
      }
      PageEvent::Click { target } => {
        if self.skip_link.as_ref().is_some_and(|l| l.contains(target)) {
          self.skip_to_main();
        }
      }
      PageEvent::KeyDown { key } => match key.as_str() {
        "Escape" => {
          for el in &self.dismissable {
            el.remove_class("active");
          }
        }
        "Tab" => self.body.add_class("keyboard-user"),
        _ => {}
      },
      PageEvent::MouseDown => self.body.remove_class("keyboard-user"),
      _ => {}
    }
  }
}
