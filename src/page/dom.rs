//! Minimal element tree the page controllers operate on.
//!
//! Elements are shared handles (`Rc<RefCell<_>>`); cloning an [`Element`]
//! clones the handle, not the node. Controllers hold the handles they were
//! built with and never search a global document.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_ID: AtomicUsize = AtomicUsize::new(1);

/// Identity of an element, stable for its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(usize);

#[derive(Debug)]
struct Node {
  id: ElementId,
  tag: String,
  classes: Vec<String>,
  attrs: BTreeMap<String, String>,
  style: BTreeMap<String, String>,
  text: String,
  inner_html: String,
  value: String,
  checked: bool,
  disabled: bool,
  focused: bool,
  offset_top: i64,
  children: Vec<Element>,
}

#[derive(Debug, Clone)]
pub struct Element(Rc<RefCell<Node>>);

impl Element {
  pub fn new(tag: &str) -> Self {
    Self(Rc::new(RefCell::new(Node {
      id: ElementId(NEXT_ID.fetch_add(1, Ordering::Relaxed)),
      tag: tag.to_string(),
      classes: Vec::new(),
      attrs: BTreeMap::new(),
      style: BTreeMap::new(),
      text: String::new(),
      inner_html: String::new(),
      value: String::new(),
      checked: false,
      disabled: false,
      focused: false,
      offset_top: 0,
      children: Vec::new(),
    })))
  }

  // Builders

  pub fn with_class(self, class: &str) -> Self {
    self.add_class(class);
    self
  }

  pub fn with_attr(self, name: &str, value: &str) -> Self {
    self.set_attr(name, value);
    self
  }

  pub fn with_text(self, text: &str) -> Self {
    self.set_text(text);
    self
  }

  pub fn with_offset_top(self, offset_top: i64) -> Self {
    self.0.borrow_mut().offset_top = offset_top;
    self
  }

  pub fn with_child(self, child: Element) -> Self {
    self.append(child);
    self
  }

  pub fn append(&self, child: Element) {
    self.0.borrow_mut().children.push(child);
  }

  // Identity and structure

  pub fn id(&self) -> ElementId {
    self.0.borrow().id
  }

  pub fn tag(&self) -> String {
    self.0.borrow().tag.clone()
  }

  pub fn same(&self, other: &Element) -> bool {
    Rc::ptr_eq(&self.0, &other.0)
  }

  /// True if `other` is this element or one of its descendants.
  pub fn contains(&self, other: &Element) -> bool {
    if self.same(other) {
      return true;
    }
    self.0.borrow().children.iter().any(|c| c.contains(other))
  }

  /// All descendants in document order, excluding `self`.
  pub fn descendants(&self) -> Vec<Element> {
    let mut out = Vec::new();
    for child in &self.0.borrow().children {
      out.push(child.clone());
      out.extend(child.descendants());
    }
    out
  }

  pub fn offset_top(&self) -> i64 {
    self.0.borrow().offset_top
  }

  // Classes

  pub fn has_class(&self, class: &str) -> bool {
    self.0.borrow().classes.iter().any(|c| c == class)
  }

  pub fn add_class(&self, class: &str) {
    if !self.has_class(class) {
      self.0.borrow_mut().classes.push(class.to_string());
    }
  }

  pub fn remove_class(&self, class: &str) {
    self.0.borrow_mut().classes.retain(|c| c != class);
  }

  /// Toggle `class`; returns whether it is now present.
  pub fn toggle_class(&self, class: &str) -> bool {
    if self.has_class(class) {
      self.remove_class(class);
      false
    } else {
      self.add_class(class);
      true
    }
  }

  // Attributes and style

  pub fn attr(&self, name: &str) -> Option<String> {
    self.0.borrow().attrs.get(name).cloned()
  }

  pub fn set_attr(&self, name: &str, value: &str) {
    self
      .0
      .borrow_mut()
      .attrs
      .insert(name.to_string(), value.to_string());
  }

  /// `data-*` attribute lookup.
  pub fn data(&self, name: &str) -> Option<String> {
    self.attr(&format!("data-{}", name))
  }

  pub fn style(&self, property: &str) -> Option<String> {
    self.0.borrow().style.get(property).cloned()
  }

  pub fn set_style(&self, property: &str, value: &str) {
    self
      .0
      .borrow_mut()
      .style
      .insert(property.to_string(), value.to_string());
  }

  // Content

  pub fn text(&self) -> String {
    self.0.borrow().text.clone()
  }

  pub fn set_text(&self, text: &str) {
    self.0.borrow_mut().text = text.to_string();
  }

  pub fn inner_html(&self) -> String {
    self.0.borrow().inner_html.clone()
  }

  pub fn set_inner_html(&self, html: &str) {
    self.0.borrow_mut().inner_html = html.to_string();
  }

  // Form state

  pub fn value(&self) -> String {
    self.0.borrow().value.clone()
  }

  pub fn set_value(&self, value: &str) {
    self.0.borrow_mut().value = value.to_string();
  }

  pub fn checked(&self) -> bool {
    self.0.borrow().checked
  }

  pub fn set_checked(&self, checked: bool) {
    self.0.borrow_mut().checked = checked;
  }

  pub fn disabled(&self) -> bool {
    self.0.borrow().disabled
  }

  pub fn set_disabled(&self, disabled: bool) {
    self.0.borrow_mut().disabled = disabled;
  }

  pub fn is_focused(&self) -> bool {
    self.0.borrow().focused
  }

  pub fn focus(&self) {
    self.0.borrow_mut().focused = true;
  }
}
