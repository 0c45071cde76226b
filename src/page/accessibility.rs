use tracing::{debug, warn};

use crate::dom::{Dom, ElementId};

pub const DEFAULT_ALT_TEXT: &str = "Зображення";
const KEYBOARD_NAVIGATION: &str = "keyboard-navigation";
const EXTERNAL_ICON: &str = "external-link-icon";

/// Keyboard focus styling, touch detection, alt-text backfill and external
/// link hardening.
#[derive(Debug, Clone, Default)]
pub struct Accessibility {
    keyboard_navigation: bool,
    backfilled_alts: usize,
    external_links: usize,
}

impl Accessibility {
    pub fn attach<D: Dom>(dom: &mut D, touch: bool, hostname: &str) -> Self {
        let mut a11y = Self::default();
        let body = dom.body();
        if touch {
            dom.add_class(body, "touch-device");
        }

        for img in dom.query_all("img").unwrap_or_default() {
            let alt = dom.attribute(img, "alt").unwrap_or_default();
            if alt.trim().is_empty() {
                let src = dom.attribute(img, "src").unwrap_or_default();
                warn!(%src, "image without alt text");
                dom.set_attribute(img, "alt", DEFAULT_ALT_TEXT);
                a11y.backfilled_alts += 1;
            }
        }

        for link in dom.query_all(r#"a[href^="http"]"#).unwrap_or_default() {
            let href = dom.attribute(link, "href").unwrap_or_default();
            // An empty hostname (file:// pages) matches every link.
            if href.contains(hostname) {
                continue;
            }
            a11y.mark_external(dom, link);
        }

        debug!(
            backfilled_alts = a11y.backfilled_alts,
            external_links = a11y.external_links,
            "accessibility wired"
        );
        a11y
    }

    fn mark_external<D: Dom>(&mut self, dom: &mut D, link: ElementId) {
        if dom.attribute(link, "target").is_none() {
            dom.set_attribute(link, "target", "_blank");
            dom.set_attribute(link, "rel", "noopener noreferrer");
        }
        let has_icon = dom
            .query_within(link, &format!(".{EXTERNAL_ICON}"))
            .ok()
            .flatten()
            .is_some();
        if !has_icon {
            let icon = dom.create_element("span");
            dom.add_class(icon, EXTERNAL_ICON);
            dom.set_attribute(icon, "aria-hidden", "true");
            dom.set_text(icon, " ↗");
            dom.append_child(link, icon);
        }
        self.external_links += 1;
    }

    pub fn on_key<D: Dom>(&mut self, dom: &mut D, key: &str) {
        if key == "Tab" {
            self.keyboard_navigation = true;
            let body = dom.body();
            dom.add_class(body, KEYBOARD_NAVIGATION);
        }
    }

    pub fn on_mouse_down<D: Dom>(&mut self, dom: &mut D) {
        self.keyboard_navigation = false;
        let body = dom.body();
        dom.remove_class(body, KEYBOARD_NAVIGATION);
    }

    pub fn keyboard_navigation(&self) -> bool {
        self.keyboard_navigation
    }
}

#[cfg(test)]
mod tests {
    use super::{Accessibility, DEFAULT_ALT_TEXT};
    use crate::dom::{Dom, MemoryDom};

    #[test]
    fn backfills_blank_alt_text_only() {
        let mut dom = MemoryDom::new();
        let body = dom.body();
        let blank = dom.add_with_attrs(body, "img", "", &[("src", "a.jpg"), ("alt", "  ")]);
        let missing = dom.add_with_attrs(body, "img", "", &[("src", "b.jpg")]);
        let described = dom.add_with_attrs(body, "img", "", &[("alt", "Микола Куліш")]);

        let logs = crate::logging::capture(|| {
            Accessibility::attach(&mut dom, false, "example.org");
        });
        assert_eq!(logs.matches("image without alt text").count(), 2);
        assert!(logs.contains("a.jpg"));
        assert_eq!(dom.attribute(blank, "alt").as_deref(), Some(DEFAULT_ALT_TEXT));
        assert_eq!(dom.attribute(missing, "alt").as_deref(), Some(DEFAULT_ALT_TEXT));
        assert_eq!(dom.attribute(described, "alt").as_deref(), Some("Микола Куліш"));
    }

    #[test]
    fn external_links_open_in_new_tab_with_single_icon() {
        let mut dom = MemoryDom::new();
        let body = dom.body();
        let external = dom.add_with_attrs(body, "a", "", &[("href", "https://uk.wikipedia.org")]);
        let own = dom.add_with_attrs(body, "a", "", &[("href", "https://example.org/bio")]);
        let targeted = dom.add_with_attrs(
            body,
            "a",
            "",
            &[("href", "http://archive.org"), ("target", "_self")],
        );

        Accessibility::attach(&mut dom, false, "example.org");
        Accessibility::attach(&mut dom, false, "example.org");

        assert_eq!(dom.attribute(external, "target").as_deref(), Some("_blank"));
        assert_eq!(dom.attribute(external, "rel").as_deref(), Some("noopener noreferrer"));
        assert_eq!(dom.children(external).len(), 1);
        assert_eq!(dom.attribute(targeted, "target").as_deref(), Some("_self"));
        assert_eq!(dom.attribute(targeted, "rel"), None);
        assert_eq!(dom.attribute(own, "target"), None);
        assert!(dom.children(own).is_empty());
    }

    #[test]
    fn links_stay_untouched_without_hostname() {
        let mut dom = MemoryDom::new();
        let body = dom.body();
        let link = dom.add_with_attrs(body, "a", "", &[("href", "https://uk.wikipedia.org")]);

        let a11y = Accessibility::attach(&mut dom, false, "");
        assert_eq!(dom.attribute(link, "target"), None);
        assert!(dom.children(link).is_empty());
        assert_eq!(a11y.external_links, 0);
    }

    #[test]
    fn keyboard_mode_follows_input_device() {
        let mut dom = MemoryDom::new();
        let mut a11y = Accessibility::attach(&mut dom, true, "");
        let body = dom.body();
        assert!(dom.has_class(body, "touch-device"));

        a11y.on_key(&mut dom, "Tab");
        assert!(dom.has_class(body, "keyboard-navigation"));
        a11y.on_mouse_down(&mut dom);
        assert!(!dom.has_class(body, "keyboard-navigation"));
        assert!(!a11y.keyboard_navigation());
    }
}
