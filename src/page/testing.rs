//! Window double shared by the page tests.

use std::cell::RefCell;

use super::dom::{Element, ElementId};
use super::form::FormMessage;
use super::Window;

#[derive(Default)]
pub struct RecordingWindow {
  reduced_motion: bool,
  scrolls: RefCell<Vec<i64>>,
  scrolled_into: RefCell<Vec<ElementId>>,
  messages: RefCell<Vec<FormMessage>>,
}

impl RecordingWindow {
  pub fn reduced_motion() -> Self {
    Self {
      reduced_motion: true,
      ..Self::default()
    }
  }

  pub fn scrolls(&self) -> Vec<i64> {
    self.scrolls.borrow().clone()
  }

  pub fn scrolled_into(&self) -> Vec<ElementId> {
    self.scrolled_into.borrow().clone()
  }

  pub fn messages(&self) -> Vec<FormMessage> {
    self.messages.borrow().clone()
  }
}

impl Window for RecordingWindow {
  fn scroll_to(&self, top: i64) {
    self.scrolls.borrow_mut().push(top);
  }

  fn scroll_into_view(&self, element: &Element) {
    self.scrolled_into.borrow_mut().push(element.id());
  }

  fn show_message(&self, message: &FormMessage) {
    self.messages.borrow_mut().push(message.clone());
  }

  fn prefers_reduced_motion(&self) -> bool {
    self.reduced_motion
  }
}
