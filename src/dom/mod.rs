pub mod memory;
pub mod selector;

pub use memory::MemoryDom;
pub use selector::{Matchable, SelectorList};

use crate::error::SelectorError;

/// Handle to an element owned by a [`Dom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub usize);

/// Client rectangle in CSS pixels, viewport-relative.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Overlap of two rectangles; edge contact counts as a zero-area overlap.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let left = self.left().max(other.left());
        let top = self.top().max(other.top());
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right < left || bottom < top {
            return None;
        }
        Some(Rect::new(left, top, right - left, bottom - top))
    }
}

/// The slice of the document API the page features rely on.
///
/// Every lookup is presence-checked by the caller: features treat a missing
/// element as "this feature is not on this page".
pub trait Dom {
    fn body(&self) -> ElementId;

    /// All matches in document order.
    fn query_all(&self, selector: &str) -> Result<Vec<ElementId>, SelectorError>;

    fn query(&self, selector: &str) -> Result<Option<ElementId>, SelectorError> {
        Ok(self.query_all(selector)?.into_iter().next())
    }

    /// First descendant of `root` matching `selector`.
    fn query_within(
        &self,
        root: ElementId,
        selector: &str,
    ) -> Result<Option<ElementId>, SelectorError>;

    /// True when `node` is `ancestor` or one of its descendants.
    fn contains(&self, ancestor: ElementId, node: ElementId) -> bool;

    fn has_class(&self, el: ElementId, class: &str) -> bool;
    fn add_class(&mut self, el: ElementId, class: &str);
    fn remove_class(&mut self, el: ElementId, class: &str);

    /// Returns whether the class is present afterwards.
    fn toggle_class(&mut self, el: ElementId, class: &str) -> bool {
        if self.has_class(el, class) {
            self.remove_class(el, class);
            false
        } else {
            self.add_class(el, class);
            true
        }
    }

    fn attribute(&self, el: ElementId, name: &str) -> Option<String>;
    fn set_attribute(&mut self, el: ElementId, name: &str, value: &str);

    fn style(&self, el: ElementId, property: &str) -> Option<String>;
    /// An empty value clears the property.
    fn set_style(&mut self, el: ElementId, property: &str, value: &str);

    fn text(&self, el: ElementId) -> String;
    fn set_text(&mut self, el: ElementId, text: &str);

    fn create_element(&mut self, tag: &str) -> ElementId;
    fn append_child(&mut self, parent: ElementId, child: ElementId);
    fn remove(&mut self, el: ElementId);

    fn bounding_rect(&self, el: ElementId) -> Option<Rect>;

    fn focus(&mut self, el: ElementId);
    fn scroll_into_view(&mut self, el: ElementId);
}
