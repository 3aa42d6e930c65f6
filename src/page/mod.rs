//! Page behavior controllers.
//!
//! Each controller is built with the element handles it drives and a
//! [`Window`] for the few effects that reach outside the document. A
//! [`Page`] owns the controllers and feeds them [`PageEvent`]s in
//! registration order; form submission is the only async step.

mod accessibility;
mod countdown;
pub mod dom;
mod effects;
mod events;
mod form;
mod navigation;
mod pricing;
mod stats;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use accessibility::AccessibilityController;
pub use countdown::{Countdown, OFFER_WINDOW};
pub use effects::{LoadingSpinner, Particles, SectionReveal};
pub use events::{EventHandler, EventSender, PageEvent};
pub use form::{
  encode_fields, BoxFuture, FormController, FormMessage, HttpSubmitter, MessageKind,
  SubmitOutcome, Submitter,
};
pub use navigation::NavigationController;
pub use pricing::PricingToggle;
pub use stats::StatsAnimator;

use dom::Element;

/// Browser capabilities controllers may use.
pub trait Window {
  /// Smooth-scroll the viewport to `top`.
  fn scroll_to(&self, top: i64);

  fn scroll_into_view(&self, element: &Element);

  /// Display a transient form message.
  fn show_message(&self, message: &FormMessage);

  /// `(prefers-reduced-motion: reduce)`
  fn prefers_reduced_motion(&self) -> bool;
}

/// Synchronous reaction to page events.
pub trait Controller {
  fn handle(&mut self, event: &PageEvent);
}

/// Controllers of one page.
#[derive(Default)]
pub struct Page {
  controllers: Vec<Box<dyn Controller>>,
  forms: Vec<FormController>,
}

impl Page {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn register(&mut self, controller: impl Controller + 'static) -> &mut Self {
    self.controllers.push(Box::new(controller));
    self
  }

  pub fn register_form(&mut self, form: FormController) -> &mut Self {
    self.forms.push(form);
    self
  }

  /// Deliver one event. A submit event resolves once the matching form's
  /// submission has finished; its message is returned.
  pub async fn dispatch(&mut self, event: &PageEvent) -> Option<FormMessage> {
    for controller in &mut self.controllers {
      controller.handle(event);
    }

    if let PageEvent::Submit { form } = event {
      if let Some(controller) = self.forms.iter().find(|f| f.form().same(form)) {
        return Some(controller.submit().await);
      }
    }
    None
  }

  /// Process events until every sender is dropped.
  pub async fn run(&mut self, events: &mut EventHandler) {
    while let Some(event) = events.next().await {
      self.dispatch(&event).await;
    }
  }
}
