use super::dom::Element;
use super::events::PageEvent;
use super::Controller;

/// Switches price labels between monthly and annual billing.
pub struct PricingToggle {
  toggle: Element,
  monthly: Vec<Element>,
  annual: Vec<Element>,
}

impl PricingToggle {
  pub fn new(toggle: Element, monthly: Vec<Element>, annual: Vec<Element>) -> Self {
    Self {
      toggle,
      monthly,
      annual,
    }
  }

  fn update(&self) {
    let annual = self.toggle.checked();
    let (shown, hidden) = if annual {
      (&self.annual, &self.monthly)
    } else {
      (&self.monthly, &self.annual)
    };
    for price in shown {
      price.set_style("display", "block");
    }
    for price in hidden {
      price.set_style("display", "none");
    }
  }
}

impl Controller for PricingToggle {
  fn handle(&mut self, event: &PageEvent) {
    if let PageEvent::Change { target } = event {
      if self.toggle.same(target) {
        self.update();
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_toggle_switches_price_sets() {
    let toggle = Element::new("input").with_class("pricing-toggle");
    let monthly = vec![Element::new("span").with_attr("data-monthly", "29")];
    let annual = vec![Element::new("span").with_attr("data-annual", "290")];
    let mut pricing = PricingToggle::new(toggle.clone(), monthly.clone(), annual.clone());

    toggle.set_checked(true);
    pricing.handle(&PageEvent::Change {
      target: toggle.clone(),
    });
    assert_eq!(monthly[0].style("display").as_deref(), Some("none"));
    assert_eq!(annual[0].style("display").as_deref(), Some("block"));

    toggle.set_checked(false);
    pricing.handle(&PageEvent::Change {
      target: toggle.clone(),
    });
    assert_eq!(monthly[0].style("display").as_deref(), Some("block"));
    assert_eq!(annual[0].style("display").as_deref(), Some("none"));
  }

  #[test]
  fn test_other_changes_are_ignored() {
    let toggle = Element::new("input");
    let monthly = vec![Element::new("span")];
    let mut pricing = PricingToggle::new(toggle, monthly.clone(), Vec::new());

    pricing.handle(&PageEvent::Change {
      target: Element::new("select"),
    });
    assert_eq!(monthly[0].style("display"), None);
  }
}
