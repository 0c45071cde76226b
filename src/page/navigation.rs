use tracing::{debug, warn};

use crate::dom::{Dom, ElementId};

const ACTIVE: &str = "active";

/// Mobile menu toggled by `.nav-toggle`.
#[derive(Debug, Clone)]
pub struct Navigation {
    toggle: ElementId,
    menu: ElementId,
}

impl Navigation {
    pub fn attach<D: Dom>(dom: &mut D) -> Option<Self> {
        let toggle = dom.query(".nav-toggle").ok().flatten();
        let menu = dom.query(".nav-menu").ok().flatten();
        let (Some(toggle), Some(menu)) = (toggle, menu) else {
            warn!("navigation elements not found");
            return None;
        };
        debug!("navigation wired");
        Some(Self { toggle, menu })
    }

    pub fn is_open<D: Dom>(&self, dom: &D) -> bool {
        dom.has_class(self.menu, ACTIVE)
    }

    pub fn on_click<D: Dom>(&self, dom: &mut D, target: ElementId) {
        if dom.contains(self.toggle, target) {
            self.toggle(dom);
        } else if !dom.contains(self.menu, target) {
            self.close(dom);
        }
    }

    pub fn on_key<D: Dom>(&self, dom: &mut D, key: &str) {
        if key == "Escape" && self.is_open(dom) {
            self.close(dom);
            dom.focus(self.toggle);
        }
    }

    fn toggle<D: Dom>(&self, dom: &mut D) {
        let expanded = dom.attribute(self.toggle, "aria-expanded").as_deref() == Some("true");
        dom.set_attribute(self.toggle, "aria-expanded", if expanded { "false" } else { "true" });
        let open = dom.toggle_class(self.menu, ACTIVE);
        let body = dom.body();
        dom.set_style(body, "overflow", if open { "hidden" } else { "" });
    }

    fn close<D: Dom>(&self, dom: &mut D) {
        dom.set_attribute(self.toggle, "aria-expanded", "false");
        dom.remove_class(self.menu, ACTIVE);
        let body = dom.body();
        dom.set_style(body, "overflow", "");
    }
}
