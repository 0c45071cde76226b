use std::collections::BTreeMap;

use super::selector::{Matchable, SelectorList};
use super::{Dom, ElementId, Rect};
use crate::error::SelectorError;

#[derive(Debug, Clone, Default, PartialEq)]
struct Node {
    tag: String,
    classes: Vec<String>,
    attrs: BTreeMap<String, String>,
    style: BTreeMap<String, String>,
    text: String,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    rect: Option<Rect>,
    attached: bool,
}

impl Matchable for Node {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }
}

/// Arena-backed document used by tests and the headless smoke run.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryDom {
    nodes: Vec<Node>,
    focused: Option<ElementId>,
    scrolled_to: Vec<ElementId>,
}

impl Default for MemoryDom {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDom {
    pub fn new() -> Self {
        let body = Node {
            tag: "body".to_string(),
            attached: true,
            ..Node::default()
        };
        Self {
            nodes: vec![body],
            focused: None,
            scrolled_to: Vec::new(),
        }
    }

    /// Append `<tag class="...">` under `parent`.
    pub fn add(&mut self, parent: ElementId, tag: &str, classes: &str) -> ElementId {
        let el = self.create_element(tag);
        for class in classes.split_whitespace() {
            self.add_class(el, class);
        }
        self.append_child(parent, el);
        el
    }

    pub fn add_with_attrs(
        &mut self,
        parent: ElementId,
        tag: &str,
        classes: &str,
        attrs: &[(&str, &str)],
    ) -> ElementId {
        let el = self.add(parent, tag, classes);
        for (name, value) in attrs {
            self.set_attribute(el, name, value);
        }
        el
    }

    pub fn set_rect(&mut self, el: ElementId, rect: Rect) {
        if let Some(node) = self.nodes.get_mut(el.0) {
            node.rect = Some(rect);
        }
    }

    pub fn children(&self, el: ElementId) -> Vec<ElementId> {
        self.nodes
            .get(el.0)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    pub fn tag(&self, el: ElementId) -> Option<&str> {
        self.nodes.get(el.0).map(|n| n.tag.as_str())
    }

    pub fn focused(&self) -> Option<ElementId> {
        self.focused
    }

    pub fn scrolled_to(&self) -> &[ElementId] {
        &self.scrolled_to
    }

    pub fn is_attached(&self, el: ElementId) -> bool {
        self.nodes.get(el.0).is_some_and(|n| n.attached)
    }

    fn node(&self, el: ElementId) -> Option<&Node> {
        self.nodes.get(el.0)
    }

    fn node_mut(&mut self, el: ElementId) -> Option<&mut Node> {
        self.nodes.get_mut(el.0)
    }

    fn set_attached(&mut self, el: ElementId, attached: bool) {
        let mut stack = vec![el];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(current.0) {
                node.attached = attached;
                stack.extend(node.children.iter().copied());
            }
        }
    }

    fn descendants(&self, root: ElementId, out: &mut Vec<ElementId>) {
        if let Some(node) = self.node(root) {
            for child in &node.children {
                out.push(*child);
                self.descendants(*child, out);
            }
        }
    }
}

impl Dom for MemoryDom {
    fn body(&self) -> ElementId {
        ElementId(0)
    }

    fn query_all(&self, selector: &str) -> Result<Vec<ElementId>, SelectorError> {
        let list = SelectorList::parse(selector)?;
        let mut order = Vec::new();
        self.descendants(self.body(), &mut order);
        Ok(order
            .into_iter()
            .filter(|el| self.node(*el).is_some_and(|n| list.matches(n)))
            .collect())
    }

    fn query_within(
        &self,
        root: ElementId,
        selector: &str,
    ) -> Result<Option<ElementId>, SelectorError> {
        let list = SelectorList::parse(selector)?;
        let mut order = Vec::new();
        self.descendants(root, &mut order);
        Ok(order
            .into_iter()
            .find(|el| self.node(*el).is_some_and(|n| list.matches(n))))
    }

    fn contains(&self, ancestor: ElementId, node: ElementId) -> bool {
        let mut current = Some(node);
        while let Some(el) = current {
            if el == ancestor {
                return true;
            }
            current = self.node(el).and_then(|n| n.parent);
        }
        false
    }

    fn has_class(&self, el: ElementId, class: &str) -> bool {
        self.node(el).is_some_and(|n| Matchable::has_class(n, class))
    }

    fn add_class(&mut self, el: ElementId, class: &str) {
        if let Some(node) = self.node_mut(el) {
            if !node.classes.iter().any(|c| c == class) {
                node.classes.push(class.to_string());
            }
        }
    }

    fn remove_class(&mut self, el: ElementId, class: &str) {
        if let Some(node) = self.node_mut(el) {
            node.classes.retain(|c| c != class);
        }
    }

    fn attribute(&self, el: ElementId, name: &str) -> Option<String> {
        if name == "class" {
            return self.node(el).map(|n| n.classes.join(" "));
        }
        self.node(el).and_then(|n| n.attrs.get(name).cloned())
    }

    fn set_attribute(&mut self, el: ElementId, name: &str, value: &str) {
        let Some(node) = self.node_mut(el) else {
            return;
        };
        if name == "class" {
            node.classes = value.split_whitespace().map(str::to_string).collect();
        } else {
            node.attrs.insert(name.to_string(), value.to_string());
        }
    }

    fn style(&self, el: ElementId, property: &str) -> Option<String> {
        self.node(el).and_then(|n| n.style.get(property).cloned())
    }

    fn set_style(&mut self, el: ElementId, property: &str, value: &str) {
        if let Some(node) = self.node_mut(el) {
            if value.is_empty() {
                node.style.remove(property);
            } else {
                node.style.insert(property.to_string(), value.to_string());
            }
        }
    }

    fn text(&self, el: ElementId) -> String {
        let mut out = self.node(el).map(|n| n.text.clone()).unwrap_or_default();
        for child in self.children(el) {
            out.push_str(&self.text(child));
        }
        out
    }

    fn set_text(&mut self, el: ElementId, text: &str) {
        let detached = match self.node_mut(el) {
            Some(node) => {
                node.text = text.to_string();
                std::mem::take(&mut node.children)
            }
            None => return,
        };
        for child in detached {
            if let Some(node) = self.node_mut(child) {
                node.parent = None;
            }
            self.set_attached(child, false);
        }
    }

    fn create_element(&mut self, tag: &str) -> ElementId {
        self.nodes.push(Node {
            tag: tag.to_ascii_lowercase(),
            ..Node::default()
        });
        ElementId(self.nodes.len() - 1)
    }

    fn append_child(&mut self, parent: ElementId, child: ElementId) {
        if parent == child || self.node(parent).is_none() || self.contains(child, parent) {
            return;
        }
        self.remove(child);
        let parent_attached = self.node(parent).is_some_and(|n| n.attached);
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.node_mut(parent) {
            node.children.push(child);
        }
        self.set_attached(child, parent_attached);
    }

    fn remove(&mut self, el: ElementId) {
        let Some(parent) = self.node(el).and_then(|n| n.parent) else {
            return;
        };
        if let Some(node) = self.node_mut(parent) {
            node.children.retain(|c| *c != el);
        }
        if let Some(node) = self.node_mut(el) {
            node.parent = None;
        }
        self.set_attached(el, false);
    }

    fn bounding_rect(&self, el: ElementId) -> Option<Rect> {
        self.node(el).filter(|n| n.attached).and_then(|n| n.rect)
    }

    fn focus(&mut self, el: ElementId) {
        self.focused = Some(el);
    }

    fn scroll_into_view(&mut self, el: ElementId) {
        self.scrolled_to.push(el);
    }
}
