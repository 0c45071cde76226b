use tracing::{debug, warn};

use super::observer::{ObserverKind, ObserverOptions, ObserverRegistry};
use crate::config::PageTimings;
use crate::dom::{Dom, ElementId};
use crate::timeline::reveal_transition;

pub const BASE_SELECTORS: [&str; 4] = [".bio-paragraph", ".timeline-item", ".work-card", ".fact-item"];

/// Scroll-triggered one-shot fade-in.
#[derive(Debug, Clone, Default)]
pub struct RevealAnimations {
    revealed: Vec<ElementId>,
    tracked: usize,
}

impl RevealAnimations {
    pub fn options() -> ObserverOptions {
        ObserverOptions {
            threshold: PageTimings::SCROLL_THRESHOLD,
            root_margin: PageTimings::SCROLL_MARGIN,
        }
    }

    /// Hides every eligible element and starts observing it.
    pub fn attach<D: Dom>(
        dom: &mut D,
        observers: &mut ObserverRegistry,
        extra_selectors: &[String],
    ) -> Self {
        let selector = BASE_SELECTORS
            .iter()
            .copied()
            .chain(extra_selectors.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(", ");
        let elements = match dom.query_all(&selector) {
            Ok(elements) => elements,
            Err(err) => {
                warn!(%selector, error = %err, "reveal selectors rejected");
                Vec::new()
            }
        };

        for (index, el) in elements.iter().enumerate() {
            dom.set_style(*el, "opacity", "0");
            dom.set_style(*el, "transform", "translateY(30px)");
            dom.set_style(*el, "transition", &reveal_transition(index));
            observers.observe(*el, ObserverKind::Reveal, Self::options());
        }
        debug!(elements = elements.len(), "reveal animations wired");
        Self {
            revealed: Vec::new(),
            tracked: elements.len(),
        }
    }

    pub fn reveal<D: Dom>(&mut self, dom: &mut D, el: ElementId) {
        dom.set_style(el, "opacity", "1");
        dom.set_style(el, "transform", "translateY(0)");
        self.revealed.push(el);
    }

    pub fn revealed(&self) -> &[ElementId] {
        &self.revealed
    }

    pub fn tracked(&self) -> usize {
        self.tracked
    }
}
