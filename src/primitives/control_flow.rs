//! Control Flow Primitives - Conditional and list rendering.
//!
//! These are plain descriptor helpers; they do not hold state. Identity
//! across renders comes from the reconciler:
//! - [`show`] - pick one of two branches; switching branches replaces the
//!   subtree when the branch roots differ in type.
//! - [`each`] - map items to keyed children so reorders become moves and
//!   instances (with their state) survive.
//!
//! # Example
//!
//! ```ignore
//! let products = vec![(1, "Cabbage"), (2, "Garlic"), (3, "Apple")];
//!
//! h("ul").list(each(&products, |p| p.0, |p| h("li").child(p.1)));
//!
//! h("div").child(show(is_logged_in, || component(admin_panel, ()), || component(login_form, ())));
//! ```

use crate::types::Key;
use super::types::{ComponentElement, Element, HostElement};

/// Render `then_fn` when `condition` holds, `else_fn` otherwise.
pub fn show<T, E>(
    condition: bool,
    then_fn: impl FnOnce() -> T,
    else_fn: impl FnOnce() -> E,
) -> Element
where
    T: Into<Element>,
    E: Into<Element>,
{
    if condition {
        then_fn().into()
    } else {
        else_fn().into()
    }
}

/// Render `then_fn` only when `condition` holds (`cond && <X/>`).
pub fn when<T: Into<Element>>(condition: bool, then_fn: impl FnOnce() -> T) -> Option<Element> {
    condition.then(|| then_fn().into())
}

/// Map items to keyed children.
///
/// The key returned by `key_fn` is attached to each rendered child,
/// replacing any key the render function set itself. Duplicate keys are
/// kept; the reconciler rejects the group with a duplicate-key error.
pub fn each<'a, T, K, R>(
    items: impl IntoIterator<Item = &'a T>,
    key_fn: impl Fn(&T) -> K,
    render_fn: impl Fn(&T) -> R,
) -> Vec<Element>
where
    T: 'a,
    K: Into<Key>,
    R: Into<Keyable>,
{
    items
        .into_iter()
        .map(|item| {
            let keyable: Keyable = render_fn(item).into();
            keyable.with_key(key_fn(item).into())
        })
        .collect()
}

/// A descriptor that can carry a key.
pub enum Keyable {
    Host(HostElement),
    Component(ComponentElement),
}

impl Keyable {
    fn with_key(self, key: Key) -> Element {
        match self {
            Keyable::Host(mut host) => {
                host.key = Some(key);
                Element::Host(host)
            }
            Keyable::Component(mut component) => {
                component.key = Some(key);
                Element::Component(component)
            }
        }
    }
}

impl From<HostElement> for Keyable {
    fn from(value: HostElement) -> Self {
        Keyable::Host(value)
    }
}

impl From<ComponentElement> for Keyable {
    fn from(value: ComponentElement) -> Self {
        Keyable::Component(value)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::h;

    #[test]
    fn test_show_picks_branch() {
        let yes = show(true, || h("a"), || h("b"));
        let no = show(false, || h("a"), || h("b"));

        assert_eq!(yes.describe(), "<a>");
        assert_eq!(no.describe(), "<b>");
    }

    #[test]
    fn test_when_drops_child() {
        assert!(when(false, || h("panel")).is_none());
        assert!(when(true, || h("panel")).is_some());
    }

    #[test]
    fn test_each_assigns_keys() {
        let products = vec![(1, "Cabbage"), (2, "Garlic")];
        let children = each(&products, |p| p.0, |p| h("li").child(p.1));

        assert_eq!(children.len(), 2);
        assert_eq!(children[0].key(), Some(&Key::Num(1)));
        assert_eq!(children[1].key(), Some(&Key::Num(2)));
    }

    #[test]
    fn test_each_overrides_inner_key() {
        let items = vec!["x"];
        let children = each(&items, |s| s.to_string(), |_| h("li").key(99));
        assert_eq!(children[0].key(), Some(&Key::from("x")));
    }

    #[test]
    fn test_each_passes_duplicate_keys_through() {
        let items = vec![7, 7];
        let children = each(&items, |n| *n, |_| h("li"));

        assert_eq!(children.len(), 2);
        assert_eq!(children[0].key(), children[1].key());
    }
}
