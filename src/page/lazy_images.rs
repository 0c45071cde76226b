use tracing::{debug, warn};

use super::observer::{ObserverKind, ObserverOptions, ObserverRegistry};
use crate::config::PageTimings;
use crate::dom::{Dom, ElementId};

const LAZY_IMAGES: &str = r#"img[loading="lazy"]"#;

/// Lazy image fallback for browsers without native `loading="lazy"`.
#[derive(Debug, Clone, Default)]
pub struct LazyImages {
    loaded: usize,
}

impl LazyImages {
    /// `None` when the browser handles lazy loading itself.
    pub fn attach<D: Dom>(
        dom: &mut D,
        observers: &mut ObserverRegistry,
        native_lazy_loading: bool,
        intersection_observer: bool,
    ) -> Option<Self> {
        if native_lazy_loading {
            return None;
        }
        let images = dom.query_all(LAZY_IMAGES).unwrap_or_default();
        let mut lazy = Self::default();
        if !intersection_observer {
            for img in &images {
                lazy.swap_source(dom, *img);
            }
            debug!(images = images.len(), "lazy images loaded eagerly");
            return Some(lazy);
        }
        for img in &images {
            observers.observe(*img, ObserverKind::LazyImage, ObserverOptions::default());
        }
        debug!(images = images.len(), "lazy images observed");
        Some(lazy)
    }

    pub fn load<D: Dom>(&mut self, dom: &mut D, img: ElementId) {
        self.swap_source(dom, img);
        dom.add_class(img, "loaded");
    }

    fn swap_source<D: Dom>(&mut self, dom: &mut D, img: ElementId) {
        let source = dom
            .attribute(img, "data-src")
            .or_else(|| dom.attribute(img, "src"));
        if let Some(source) = source {
            dom.set_attribute(img, "src", &source);
        }
        self.loaded += 1;
    }

    pub fn loaded(&self) -> usize {
        self.loaded
    }
}

/// An off-document fetch the host must start; it answers with
/// `PageEvent::ImageLoaded` or `PageEvent::ImageFailed` for `image`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub image: ElementId,
    pub source: String,
}

/// Lazy images fetched ahead of the viewport. The visible `src` only changes
/// once the fetch succeeded.
#[derive(Debug, Clone, Default)]
pub struct ImagePreloader {
    outgoing: Vec<ImageRequest>,
    in_flight: Vec<ImageRequest>,
    loaded: usize,
    failed: usize,
}

impl ImagePreloader {
    pub fn options() -> ObserverOptions {
        ObserverOptions {
            threshold: PageTimings::PRELOAD_THRESHOLD,
            root_margin: PageTimings::PRELOAD_MARGIN,
        }
    }

    /// `None` when the page has no lazy images.
    pub fn attach<D: Dom>(
        dom: &D,
        observers: &mut ObserverRegistry,
        intersection_observer: bool,
    ) -> Option<Self> {
        let images = dom.query_all(LAZY_IMAGES).unwrap_or_default();
        if images.is_empty() {
            return None;
        }
        let mut preloader = Self::default();
        for img in &images {
            if intersection_observer {
                observers.observe(*img, ObserverKind::PreloadImage, Self::options());
            } else {
                preloader.request(dom, *img);
            }
        }
        debug!(images = images.len(), intersection_observer, "image preloader wired");
        Some(preloader)
    }

    /// Queue a fetch of the image's `data-src` (else `src`).
    pub fn request<D: Dom>(&mut self, dom: &D, img: ElementId) {
        let source = dom
            .attribute(img, "data-src")
            .filter(|s| !s.is_empty())
            .or_else(|| dom.attribute(img, "src"))
            .unwrap_or_default();
        if source.is_empty() {
            return;
        }
        self.outgoing.push(ImageRequest { image: img, source });
    }

    /// Fetches queued since the last call.
    pub fn take_requests(&mut self) -> Vec<ImageRequest> {
        let requests = std::mem::take(&mut self.outgoing);
        self.in_flight.extend(requests.iter().cloned());
        requests
    }

    fn settle(&mut self, img: ElementId) -> Option<ImageRequest> {
        let index = self.in_flight.iter().position(|r| r.image == img)?;
        Some(self.in_flight.remove(index))
    }

    pub fn on_loaded<D: Dom>(&mut self, dom: &mut D, img: ElementId) {
        let Some(request) = self.settle(img) else {
            return;
        };
        dom.set_attribute(img, "src", &request.source);
        dom.add_class(img, "lazy-loaded");
        self.loaded += 1;
    }

    pub fn on_failed(&mut self, img: ElementId) {
        let Some(request) = self.settle(img) else {
            return;
        };
        warn!(source = %request.source, "failed to load image");
        self.failed += 1;
    }

    pub fn loaded(&self) -> usize {
        self.loaded
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}
