use tracing::debug;

use crate::dom::{Dom, ElementId};

/// In-page `#fragment` links scroll smoothly instead of jumping.
#[derive(Debug, Clone)]
pub struct SmoothScroll {
    anchors: Vec<ElementId>,
}

impl SmoothScroll {
    pub fn attach<D: Dom>(dom: &D) -> Self {
        let anchors = dom.query_all(r##"a[href^="#"]"##).unwrap_or_default();
        debug!(anchors = anchors.len(), "smooth scroll wired");
        Self { anchors }
    }

    /// Returns true when the default jump was cancelled.
    pub fn on_click<D: Dom>(&self, dom: &mut D, target: ElementId) -> bool {
        let Some(anchor) = self.anchors.iter().copied().find(|a| dom.contains(*a, target)) else {
            return false;
        };
        let Some(href) = dom.attribute(anchor, "href") else {
            return false;
        };
        if href == "#" {
            return false;
        }
        match dom.query(&href) {
            Ok(Some(section)) => {
                dom.scroll_into_view(section);
                true
            }
            _ => false,
        }
    }

    pub fn anchor_count(&self) -> usize {
        self.anchors.len()
    }
}

#[cfg(test)]
mod tests {
    use super::SmoothScroll;
    use crate::dom::{Dom, MemoryDom};

    #[test]
    fn scrolls_to_present_target_only() {
        let mut dom = MemoryDom::new();
        let body = dom.body();
        let to_bio = dom.add_with_attrs(body, "a", "", &[("href", "#bio")]);
        let label = dom.add(to_bio, "span", "");
        let bare = dom.add_with_attrs(body, "a", "", &[("href", "#")]);
        let missing = dom.add_with_attrs(body, "a", "", &[("href", "#works")]);
        let external = dom.add_with_attrs(body, "a", "", &[("href", "https://example.org")]);
        let bio = dom.add_with_attrs(body, "section", "", &[("id", "bio")]);

        let scroll = SmoothScroll::attach(&dom);
        assert_eq!(scroll.anchor_count(), 3);

        assert!(scroll.on_click(&mut dom, label));
        assert_eq!(dom.scrolled_to(), &[bio]);

        assert!(!scroll.on_click(&mut dom, bare));
        assert!(!scroll.on_click(&mut dom, missing));
        assert!(!scroll.on_click(&mut dom, external));
        assert_eq!(dom.scrolled_to().len(), 1);
    }
}
