use crate::config::RootMargin;
use crate::dom::{Dom, ElementId, Rect};

/// Which feature owns an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverKind {
    Reveal,
    Counter,
    LazyImage,
    PreloadImage,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObserverOptions {
    /// Visible fraction required; `0.0` means any overlap.
    pub threshold: f32,
    pub root_margin: RootMargin,
}

impl Default for ObserverOptions {
    fn default() -> Self {
        Self {
            threshold: 0.0,
            root_margin: RootMargin::ZERO,
        }
    }
}

impl ObserverOptions {
    pub fn root(&self, viewport: Rect) -> Rect {
        let m = self.root_margin;
        Rect::new(
            viewport.x - m.left,
            viewport.y - m.top,
            viewport.width + m.left + m.right,
            viewport.height + m.top + m.bottom,
        )
    }

    pub fn is_intersecting(&self, target: Rect, viewport: Rect) -> bool {
        let Some(visible) = target.intersection(&self.root(viewport)) else {
            return false;
        };
        let area = target.area();
        let ratio = if area <= 0.0 { 1.0 } else { visible.area() / area };
        if self.threshold <= 0.0 {
            return true;
        }
        ratio >= self.threshold
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Observation {
    element: ElementId,
    kind: ObserverKind,
    options: ObserverOptions,
}

/// One-shot intersection observation evaluated against host layout.
///
/// A hit removes the observation before it is reported, so no element is
/// reported twice.
#[derive(Debug, Clone, Default)]
pub struct ObserverRegistry {
    observations: Vec<Observation>,
}

impl ObserverRegistry {
    pub fn observe(&mut self, element: ElementId, kind: ObserverKind, options: ObserverOptions) {
        let duplicate = self
            .observations
            .iter()
            .any(|o| o.element == element && o.kind == kind);
        if !duplicate {
            self.observations.push(Observation {
                element,
                kind,
                options,
            });
        }
    }

    pub fn is_observed(&self, element: ElementId, kind: ObserverKind) -> bool {
        self.observations
            .iter()
            .any(|o| o.element == element && o.kind == kind)
    }

    pub fn observed(&self, kind: ObserverKind) -> usize {
        self.observations.iter().filter(|o| o.kind == kind).count()
    }

    /// Report and drop every observation currently intersecting.
    pub fn take_intersecting<D: Dom + ?Sized>(
        &mut self,
        dom: &D,
        viewport: Rect,
    ) -> Vec<(ObserverKind, ElementId)> {
        let mut hits = Vec::new();
        self.observations.retain(|o| {
            let hit = dom
                .bounding_rect(o.element)
                .is_some_and(|rect| o.options.is_intersecting(rect, viewport));
            if hit {
                hits.push((o.kind, o.element));
            }
            !hit
        });
        hits
    }

    pub fn clear(&mut self) {
        self.observations.clear();
    }
}
