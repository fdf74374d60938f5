//! Host Primitive - Builder for host element descriptors.
//!
//! # Example
//!
//! ```ignore
//! use spark_fiber::primitives::{h, text};
//!
//! let list = h("ul").list(products.iter().map(|p| {
//!     h("li").key(p.id).child(text(p.title.clone()))
//! }));
//! ```

use crate::types::{AttrValue, EventHandler, Key};
use super::types::{Element, HostElement};

/// Start a host element descriptor with the given tag.
pub fn h(tag: impl Into<String>) -> HostElement {
    HostElement {
        tag: tag.into(),
        ..Default::default()
    }
}

impl HostElement {
    /// Set an attribute.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    /// Attach an event handler (`on("click", ..)`).
    pub fn on(mut self, event: impl Into<String>, handler: impl Fn() + 'static) -> Self {
        self.handlers.insert(event.into(), EventHandler::new(handler));
        self
    }

    /// Attach a reconciliation key.
    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Append one child.
    pub fn child(mut self, child: impl Into<Element>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Append a child only when present (conditional rendering).
    pub fn child_if(mut self, child: Option<impl Into<Element>>) -> Self {
        if let Some(child) = child {
            self.children.push(child.into());
        }
        self
    }

    /// Append static children.
    pub fn children<I, E>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Element>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    /// Append children produced from a collection.
    ///
    /// Marks the sibling group as a list: members without a key are
    /// reported with a missing-key warning and fall back to positional
    /// matching.
    pub fn list<I, E>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Element>,
    {
        self.list = true;
        self.children(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_collects_attrs_and_children() {
        let el = h("img")
            .attr("className", "avatar")
            .attr("width", 90)
            .child("caption")
            .child_if(None::<Element>)
            .child_if(Some("shown"));

        assert_eq!(el.tag, "img");
        assert_eq!(el.attrs.get("width"), Some(&AttrValue::Int(90)));
        assert_eq!(el.children.len(), 2);
        assert!(!el.list);
    }

    #[test]
    fn test_list_marks_group() {
        let el = h("ul").list((1..=3).map(|id| h("li").key(id)));
        assert!(el.list);
        assert_eq!(el.children.len(), 3);
        assert_eq!(el.children[2].key(), Some(&Key::Num(3)));
    }

    #[test]
    fn test_handlers_kept_apart_from_attrs() {
        let el = h("button").on("click", || {});
        assert!(el.attrs.is_empty());
        assert!(el.handlers.contains_key("click"));
    }
}
