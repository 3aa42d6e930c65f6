//! Form submission with offline queueing.

use color_eyre::{eyre::eyre, Result};
use reqwest::Method;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;
use tracing::{info, warn};
use url::{form_urlencoded, Url};

use super::dom::Element;
use super::Window;
use crate::http::{Fetcher, Request};
use crate::worker::{PendingStore, RequestOptions};

pub const SUCCESS_MESSAGE: &str = "Thank you! We'll be in touch soon.";
pub const QUEUED_MESSAGE: &str =
  "You're offline. Your message will be sent when the connection is back.";
pub const ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

const SUBMITTING_LABEL: &str = "Submitting...";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Boxed future returned by [`Submitter`]
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// How a submission was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
  /// Delivered to the server
  Sent,
  /// Stored for background sync
  Queued,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
  Success,
  Error,
  Info,
}

impl MessageKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Success => "success",
      Self::Error => "error",
      Self::Info => "info",
    }
  }
}

/// Toast shown after a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormMessage {
  pub text: String,
  pub kind: MessageKind,
}

impl FormMessage {
  pub fn new(text: &str, kind: MessageKind) -> Self {
    Self {
      text: text.to_string(),
      kind,
    }
  }

  pub fn class_name(&self) -> String {
    format!("form-message form-message--{}", self.kind.as_str())
  }
}

/// Delivers form fields somewhere.
pub trait Submitter {
  fn submit<'a>(&'a self, fields: &'a [(String, String)]) -> BoxFuture<'a, SubmitOutcome>;
}

/// Posts forms to an HTTP endpoint and queues them for background sync when
/// the network is unreachable.
pub struct HttpSubmitter<F: Fetcher, P: PendingStore> {
  fetcher: Arc<F>,
  pending: Arc<P>,
  endpoint: Url,
}

impl<F: Fetcher, P: PendingStore> HttpSubmitter<F, P> {
  pub fn new(fetcher: Arc<F>, pending: Arc<P>, endpoint: Url) -> Self {
    Self {
      fetcher,
      pending,
      endpoint,
    }
  }
}

/// Encode fields as `application/x-www-form-urlencoded`.
pub fn encode_fields(fields: &[(String, String)]) -> String {
  form_urlencoded::Serializer::new(String::new())
    .extend_pairs(fields)
    .finish()
}

impl<F: Fetcher, P: PendingStore> Submitter for HttpSubmitter<F, P> {
  fn submit<'a>(&'a self, fields: &'a [(String, String)]) -> BoxFuture<'a, SubmitOutcome> {
    Box::pin(async move {
      let body = encode_fields(fields);
      let request = Request::new(Method::POST, self.endpoint.clone())
        .with_header("content-type", FORM_CONTENT_TYPE)
        .with_body(body.clone());

      match self.fetcher.fetch(&request).await {
        Ok(response) if response.ok() => Ok(SubmitOutcome::Sent),
        Ok(response) => Err(eyre!(
          "Form endpoint answered {} for {}",
          response.status,
          self.endpoint
        )),
        Err(e) => {
          warn!(error = %e, "Form submission failed, queueing for background sync");
          let options = RequestOptions::new(Method::POST)
            .with_header("content-type", FORM_CONTENT_TYPE)
            .with_body(body);
          self.pending.enqueue(self.endpoint.as_str(), &options)?;
          Ok(SubmitOutcome::Queued)
        }
      }
    })
  }
}

/// Initial state of a form control, restored on reset.
struct ControlDefault {
  control: Element,
  value: String,
  checked: bool,
}

/// Drives one form: loading state, submission and the result toast.
pub struct FormController {
  form: Element,
  defaults: Vec<ControlDefault>,
  submitter: Box<dyn Submitter>,
  window: Rc<dyn Window>,
}

/// Named controls of `form` in document order.
fn named_controls(form: &Element) -> Vec<Element> {
  form
    .descendants()
    .into_iter()
    .filter(|el| el.tag() != "button" && el.attr("name").is_some())
    .collect()
}

impl FormController {
  /// The controls' current values and checked states become the defaults
  /// the form is reset to after a submission.
  pub fn new(form: Element, submitter: Box<dyn Submitter>, window: Rc<dyn Window>) -> Self {
    let defaults = named_controls(&form)
      .into_iter()
      .map(|control| ControlDefault {
        value: control.value(),
        checked: control.checked(),
        control,
      })
      .collect();

    Self {
      form,
      defaults,
      submitter,
      window,
    }
  }

  pub fn form(&self) -> &Element {
    &self.form
  }

  fn submit_button(&self) -> Option<Element> {
    self
      .form
      .descendants()
      .into_iter()
      .find(|el| el.tag() == "button" && el.attr("type").as_deref() == Some("submit"))
  }

  /// Named field values in document order.
  pub fn fields(&self) -> Vec<(String, String)> {
    named_controls(&self.form)
      .into_iter()
      .filter_map(|el| el.attr("name").map(|name| (name, el.value())))
      .collect()
  }

  fn reset(&self) {
    for default in &self.defaults {
      default.control.set_value(&default.value);
      default.control.set_checked(default.checked);
    }
  }

  /// Submit the form and show the result. The button is always restored.
  pub async fn submit(&self) -> FormMessage {
    let button = self.submit_button();
    let original = button.as_ref().map(Element::text);
    if let Some(button) = &button {
      button.set_text(SUBMITTING_LABEL);
      button.set_disabled(true);
    }

    let fields = self.fields();
    let message = match self.submitter.submit(&fields).await {
      Ok(SubmitOutcome::Sent) => {
        info!("Form submitted");
        self.reset();
        FormMessage::new(SUCCESS_MESSAGE, MessageKind::Success)
      }
      Ok(SubmitOutcome::Queued) => {
        self.reset();
        FormMessage::new(QUEUED_MESSAGE, MessageKind::Info)
      }
      Err(e) => {
        warn!(error = %e, "Form submission failed");
        FormMessage::new(ERROR_MESSAGE, MessageKind::Error)
      }
    };

    if let (Some(button), Some(original)) = (&button, original) {
      button.set_text(&original);
      button.set_disabled(false);
    }
    self.window.show_message(&message);
    message
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::http::HttpFetcher;
  use crate::page::testing::RecordingWindow;
  use crate::worker::MemoryPendingStore;
  use std::cell::RefCell;
  use wiremock::matchers::{body_string, header, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  /// Returns a fixed outcome and records the button state seen mid-submit.
  struct FakeSubmitter {
    outcome: fn() -> Result<SubmitOutcome>,
    button: Element,
    seen: Rc<RefCell<Vec<(String, bool, Vec<(String, String)>)>>>,
  }

  impl Submitter for FakeSubmitter {
    fn submit<'a>(&'a self, fields: &'a [(String, String)]) -> BoxFuture<'a, SubmitOutcome> {
      self
        .seen
        .borrow_mut()
        .push((self.button.text(), self.button.disabled(), fields.to_vec()));
      let outcome = (self.outcome)();
      Box::pin(async move { outcome })
    }
  }

  struct Fixture {
    controller: FormController,
    window: Rc<RecordingWindow>,
    button: Element,
    email: Element,
    seen: Rc<RefCell<Vec<(String, bool, Vec<(String, String)>)>>>,
  }

  fn fixture(outcome: fn() -> Result<SubmitOutcome>) -> Fixture {
    let email = Element::new("input").with_attr("name", "email");
    let button = Element::new("button")
      .with_attr("type", "submit")
      .with_text("Get Started");
    let form = Element::new("form")
      .with_child(email.clone())
      .with_child(Element::new("label").with_text("Email"))
      .with_child(button.clone());
    let seen = Rc::new(RefCell::new(Vec::new()));
    let window = Rc::new(RecordingWindow::default());
    let submitter = FakeSubmitter {
      outcome,
      button: button.clone(),
      seen: Rc::clone(&seen),
    };

    let controller = FormController::new(form, Box::new(submitter), window.clone());
    email.set_value("ada@example.com");

    Fixture {
      controller,
      window,
      button,
      email,
      seen,
    }
  }

  #[tokio::test]
  async fn test_successful_submit() {
    let f = fixture(|| Ok(SubmitOutcome::Sent));
    let message = f.controller.submit().await;

    assert_eq!(message.text, SUCCESS_MESSAGE);
    assert_eq!(message.class_name(), "form-message form-message--success");
    assert_eq!(
      f.seen.borrow()[0],
      (
        "Submitting...".to_string(),
        true,
        vec![("email".to_string(), "ada@example.com".to_string())]
      )
    );
    assert_eq!(f.button.text(), "Get Started");
    assert!(!f.button.disabled());
    assert_eq!(f.email.value(), "");
    assert_eq!(f.window.messages(), vec![message]);
  }

  #[tokio::test]
  async fn test_reset_restores_initial_values() {
    let source = Element::new("input")
      .with_attr("type", "hidden")
      .with_attr("name", "source");
    source.set_value("pricing-page");
    let updates = Element::new("input")
      .with_attr("type", "checkbox")
      .with_attr("name", "updates");
    updates.set_value("yes");
    updates.set_checked(true);
    let message = Element::new("textarea").with_attr("name", "message");
    let form = Element::new("form")
      .with_child(source.clone())
      .with_child(updates.clone())
      .with_child(message.clone());

    let window = Rc::new(RecordingWindow::default());
    let controller = FormController::new(
      form,
      Box::new(FakeSubmitter {
        outcome: || Ok(SubmitOutcome::Sent),
        button: Element::new("button"),
        seen: Rc::new(RefCell::new(Vec::new())),
      }),
      window,
    );

    message.set_value("Call me back");
    updates.set_checked(false);
    controller.submit().await;

    assert_eq!(source.value(), "pricing-page");
    assert!(updates.checked());
    assert_eq!(updates.value(), "yes");
    assert_eq!(message.value(), "");
  }

  #[tokio::test]
  async fn test_failed_submit_keeps_fields_and_restores_button() {
    let f = fixture(|| Err(eyre!("boom")));
    let message = f.controller.submit().await;

    assert_eq!(message, FormMessage::new(ERROR_MESSAGE, MessageKind::Error));
    assert_eq!(f.button.text(), "Get Started");
    assert!(!f.button.disabled());
    assert_eq!(f.email.value(), "ada@example.com");
  }

  #[tokio::test]
  async fn test_queued_submit_shows_info() {
    let f = fixture(|| Ok(SubmitOutcome::Queued));
    let message = f.controller.submit().await;
    assert_eq!(message.kind, MessageKind::Info);
    assert_eq!(message.class_name(), "form-message form-message--info");
  }

  fn fields() -> Vec<(String, String)> {
    vec![
      ("name".to_string(), "Ada Lovelace".to_string()),
      ("email".to_string(), "ada@example.com".to_string()),
    ]
  }

  #[test]
  fn test_encode_fields() {
    assert_eq!(
      encode_fields(&fields()),
      "name=Ada+Lovelace&email=ada%40example.com"
    );
  }

  #[tokio::test]
  async fn test_http_submitter_posts_form() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/api/contact"))
      .and(header("content-type", FORM_CONTENT_TYPE))
      .and(body_string("name=Ada+Lovelace&email=ada%40example.com"))
      .respond_with(ResponseTemplate::new(200))
      .expect(1)
      .mount(&server)
      .await;

    let origin = Url::parse(&server.uri()).unwrap();
    let fetcher = Arc::new(HttpFetcher::new(origin.clone(), None).unwrap());
    let pending = Arc::new(MemoryPendingStore::new());
    let submitter = HttpSubmitter::new(
      fetcher,
      Arc::clone(&pending),
      origin.join("/api/contact").unwrap(),
    );

    let fields = fields();
    assert_eq!(submitter.submit(&fields).await.unwrap(), SubmitOutcome::Sent);
    assert!(pending.list().unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_http_submitter_rejects_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(500))
      .mount(&server)
      .await;

    let origin = Url::parse(&server.uri()).unwrap();
    let fetcher = Arc::new(HttpFetcher::new(origin.clone(), None).unwrap());
    let pending = Arc::new(MemoryPendingStore::new());
    let submitter = HttpSubmitter::new(fetcher, Arc::clone(&pending), origin);

    let fields = fields();
    assert!(submitter.submit(&fields).await.is_err());
    assert!(pending.list().unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_http_submitter_queues_when_offline() {
    let endpoint = Url::parse("http://127.0.0.1:1/api/contact").unwrap();
    let fetcher = Arc::new(HttpFetcher::new(endpoint.clone(), None).unwrap());
    let pending = Arc::new(MemoryPendingStore::new());
    let submitter = HttpSubmitter::new(fetcher, Arc::clone(&pending), endpoint);

    let fields = fields();
    assert_eq!(
      submitter.submit(&fields).await.unwrap(),
      SubmitOutcome::Queued
    );

    let queued = pending.list().unwrap();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].url, "http://127.0.0.1:1/api/contact");
    assert_eq!(queued[0].options.method, Method::POST);
    assert_eq!(
      queued[0].options.body.as_deref(),
      Some(&b"name=Ada+Lovelace&email=ada%40example.com"[..])
    );
  }
}
