use tracing::debug;

use crate::config::StorageKeys;
use crate::dom::{Dom, ElementId};
use crate::storage::{Storage, StorageBackend};

const HIGH_CONTRAST: &str = "high-contrast";
const CONTRAST_ON_LABEL: &str = "Увімкнути висококонтрастний режим";
const CONTRAST_OFF_LABEL: &str = "Вимкнути висококонтрастний режим";

const TEXT_SIZE_CLASSES: [&str; 3] = ["text-size-normal", "text-size-medium", "text-size-large"];
const TEXT_SIZE_LABELS: [&str; 3] = [
    "Нормальний розмір тексту",
    "Середній розмір тексту",
    "Великий розмір тексту",
];
const TEXT_SIZE_ICONS: [&str; 3] = ["A", "A+", "A++"];

/// Contrast and text-size buttons whose state survives reloads.
#[derive(Debug, Clone)]
pub struct PreferenceControls {
    contrast_toggle: ElementId,
    text_size_toggle: ElementId,
    text_size_level: usize,
}

impl PreferenceControls {
    pub fn attach<D: Dom, B: StorageBackend>(dom: &mut D, storage: &mut Storage<B>) -> Self {
        let body = dom.body();

        let contrast_toggle = dom.create_element("button");
        dom.add_class(contrast_toggle, "contrast-toggle");
        dom.set_text(contrast_toggle, "◐");
        let contrast = storage.get::<bool>(StorageKeys::HIGH_CONTRAST).unwrap_or(false);
        if contrast {
            dom.add_class(body, HIGH_CONTRAST);
        }
        dom.set_attribute(contrast_toggle, "aria-label", contrast_label(contrast));
        dom.append_child(body, contrast_toggle);

        let text_size_level = storage
            .get::<usize>(StorageKeys::TEXT_SIZE)
            .filter(|level| *level < TEXT_SIZE_CLASSES.len())
            .unwrap_or(0);
        let text_size_toggle = dom.create_element("button");
        dom.add_class(text_size_toggle, "text-size-toggle");
        dom.append_child(body, text_size_toggle);

        let controls = Self {
            contrast_toggle,
            text_size_toggle,
            text_size_level,
        };
        controls.apply_text_size(dom, storage);
        debug!(contrast, text_size_level, "preference controls wired");
        controls
    }

    pub fn on_click<D: Dom, B: StorageBackend>(
        &mut self,
        dom: &mut D,
        storage: &mut Storage<B>,
        target: ElementId,
    ) -> bool {
        if dom.contains(self.contrast_toggle, target) {
            let body = dom.body();
            let enabled = dom.toggle_class(body, HIGH_CONTRAST);
            dom.set_attribute(self.contrast_toggle, "aria-label", contrast_label(enabled));
            storage.set(StorageKeys::HIGH_CONTRAST, &enabled);
            true
        } else if dom.contains(self.text_size_toggle, target) {
            self.text_size_level = (self.text_size_level + 1) % TEXT_SIZE_CLASSES.len();
            self.apply_text_size(dom, storage);
            true
        } else {
            false
        }
    }

    fn apply_text_size<D: Dom, B: StorageBackend>(&self, dom: &mut D, storage: &mut Storage<B>) {
        let body = dom.body();
        for class in TEXT_SIZE_CLASSES {
            dom.remove_class(body, class);
        }
        let level = self.text_size_level;
        dom.add_class(body, TEXT_SIZE_CLASSES[level]);
        dom.set_text(self.text_size_toggle, TEXT_SIZE_ICONS[level]);
        dom.set_attribute(self.text_size_toggle, "aria-label", TEXT_SIZE_LABELS[level]);
        storage.set(StorageKeys::TEXT_SIZE, &level);
    }

    pub fn text_size_level(&self) -> usize {
        self.text_size_level
    }
}

fn contrast_label(enabled: bool) -> &'static str {
    if enabled {
        CONTRAST_OFF_LABEL
    } else {
        CONTRAST_ON_LABEL
    }
}
