//! Element descriptors - the plain data a render call produces.
//!
//! Descriptors carry no identity of their own. They are created fresh on
//! every render and dropped once the reconciler has diffed them against the
//! instance tree.

use std::any::{Any, TypeId};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::engine::Scope;
use crate::types::{AttrValue, EventHandler, Key};

// =============================================================================
// Element
// =============================================================================

/// A rendered descriptor: host element, text leaf, or component reference.
#[derive(Clone, Debug)]
pub enum Element {
    /// Host element (`div`, `ul`, `button`, ...).
    Host(HostElement),
    /// Text leaf. Never keyed; matched by position.
    Text(String),
    /// Reference to a component plus its props.
    Component(ComponentElement),
}

impl Element {
    /// Reconciliation key, if any.
    pub fn key(&self) -> Option<&Key> {
        match self {
            Element::Host(host) => host.key.as_ref(),
            Element::Text(_) => None,
            Element::Component(component) => component.key.as_ref(),
        }
    }

    /// Short description used in logs and errors.
    pub fn describe(&self) -> String {
        match self {
            Element::Host(host) => format!("<{}>", host.tag),
            Element::Text(_) => "#text".to_string(),
            Element::Component(component) => format!("<{}>", component.ty.name()),
        }
    }
}

impl From<HostElement> for Element {
    fn from(value: HostElement) -> Self {
        Element::Host(value)
    }
}

impl From<ComponentElement> for Element {
    fn from(value: ComponentElement) -> Self {
        Element::Component(value)
    }
}

impl From<&str> for Element {
    fn from(value: &str) -> Self {
        Element::Text(value.to_string())
    }
}

impl From<String> for Element {
    fn from(value: String) -> Self {
        Element::Text(value)
    }
}

// =============================================================================
// Host Element
// =============================================================================

/// Descriptor for a host element.
///
/// Attributes are kept sorted so attribute diffs come out in a stable order.
#[derive(Clone, Debug, Default)]
pub struct HostElement {
    pub tag: String,
    pub attrs: BTreeMap<String, AttrValue>,
    pub handlers: BTreeMap<String, EventHandler>,
    pub children: Vec<Element>,
    pub key: Option<Key>,
    /// Children came from a list and are expected to be keyed.
    pub list: bool,
}

// =============================================================================
// Component Element
// =============================================================================

/// Type-erased props with equality.
///
/// Implemented for every `PartialEq + 'static` type.
pub trait AnyProps: 'static {
    fn as_any(&self) -> &dyn Any;

    /// Compare with props of a possibly different type.
    fn props_eq(&self, other: &dyn AnyProps) -> bool;
}

impl<P: PartialEq + 'static> AnyProps for P {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn props_eq(&self, other: &dyn AnyProps) -> bool {
        other
            .as_any()
            .downcast_ref::<P>()
            .is_some_and(|other| other == self)
    }
}

/// Render callback of a component with its props already bound.
pub type RenderFn = Rc<dyn Fn(&mut Scope<'_>) -> Element>;

/// Identity of a component function.
///
/// Every fn item and closure has its own type, so the `TypeId` of the
/// function type identifies the component. Function pointers all share one
/// type and are told apart by their target address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ComponentType {
    id: TypeId,
    addr: Option<usize>,
    pure: bool,
    name: &'static str,
}

impl ComponentType {
    pub fn of<F: 'static>() -> Self {
        let full = std::any::type_name::<F>();
        let name = full.rsplit("::").next().unwrap_or(full);
        Self {
            id: TypeId::of::<F>(),
            addr: None,
            pure: std::mem::size_of::<F>() == 0,
            name,
        }
    }

    /// Identity of the function pointer type `F` aimed at `addr`.
    pub fn pointer<F: 'static>(addr: usize) -> Self {
        Self {
            addr: Some(addr),
            pure: true,
            name: "fn",
            ..Self::of::<F>()
        }
    }

    /// Readable name (last path segment of the function).
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Props are the function's only input.
    ///
    /// True for fn items, non-capturing closures and function pointers.
    /// Capturing closures carry data the props don't show, so the
    /// reconciler never skips their render.
    pub fn is_pure(&self) -> bool {
        self.pure
    }
}

/// Descriptor for a component instance.
#[derive(Clone)]
pub struct ComponentElement {
    pub ty: ComponentType,
    pub props: Rc<dyn AnyProps>,
    pub render: RenderFn,
    pub key: Option<Key>,
}

impl ComponentElement {
    /// Attach a reconciliation key.
    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Whether `other` carries equal props.
    pub fn same_props(&self, other: &ComponentElement) -> bool {
        self.props.props_eq(other.props.as_ref())
    }
}

impl fmt::Debug for ComponentElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentElement")
            .field("name", &self.ty.name())
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================
