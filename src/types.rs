//! Core types for spark-fiber.
//!
//! These types are shared by descriptors, the instance tree and the patch
//! stream handed to the presentation layer.

use std::fmt;
use std::rc::Rc;

// =============================================================================
// Node Identity
// =============================================================================

slotmap::new_key_type! {
    /// Identity of a node in the instance tree.
    ///
    /// Ids are generational: once a node is destroyed its id is never handed
    /// out again, so a stale [`crate::Setter`] can never reach a newer instance.
    pub struct NodeId;
}

// =============================================================================
// Key
// =============================================================================

/// Reconciliation key for a child in a list.
///
/// Keys are scoped to one sibling group. They are only used to match an old
/// child to a new one and carry no ordering meaning.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Str(Rc<str>),
    Num(i64),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Str(s) => write!(f, "{s:?}"),
            Key::Num(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Str(Rc::from(value))
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::Str(Rc::from(value))
    }
}

macro_rules! key_from_int {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Key {
            fn from(value: $ty) -> Self {
                Key::Num(value as i64)
            }
        })*
    };
}

key_from_int!(i32, i64, u32, u64, usize);

// =============================================================================
// Attribute Values
// =============================================================================

/// A host attribute value.
///
/// Event handlers are not attribute values; see [`EventHandler`].
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Str(s) => f.write_str(s),
            AttrValue::Int(n) => write!(f, "{n}"),
            AttrValue::Float(x) => write!(f, "{x}"),
            AttrValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Str(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        AttrValue::Int(value as i64)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Float(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

// =============================================================================
// Event Handlers
// =============================================================================

/// Event handler attached to a host element (`onClick` and friends).
///
/// Using Rc<dyn Fn> so handlers can be cloned out of the tree before they
/// run; a running handler may enqueue state updates but never touches the
/// tree itself.
#[derive(Clone)]
pub struct EventHandler(Rc<dyn Fn()>);

impl EventHandler {
    pub fn new(f: impl Fn() + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Run the handler.
    pub fn call(&self) {
        (self.0)()
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EventHandler(..)")
    }
}

// =============================================================================
// Node Flags (bitflags)
// =============================================================================

bitflags::bitflags! {
    /// Per-node bookkeeping flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct NodeFlags: u8 {
        const NONE = 0;
        /// Component has a queued update for the current flush.
        const DIRTY = 1 << 0;
        /// Children are a list (`HostElement::list`); members should be keyed.
        const LIST = 1 << 1;
    }
}

// =============================================================================
// Tests
// =============================================================================
