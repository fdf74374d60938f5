//! Error taxonomy.
//!
//! - [`StateError`] - misuse of the state API, raised by the store.
//! - [`ReconcileError`] - isolated failures; the flush continues and
//!   reports them in [`crate::Flush::errors`].
//! - [`EngineError`] - fatal to the whole flush.
//! - [`Warning`] - non-fatal diagnostics.

use thiserror::Error;

use crate::types::{Key, NodeId};

/// Errors raised by the state store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// State declared while `instance` is not the instance being rendered.
    #[error("state declared outside the render of instance {instance:?}")]
    IllegalStateAccess { instance: NodeId },

    /// A render declared state slots in a different count or order.
    #[error("instance {instance:?}: {detail}")]
    StateSlotMismatch { instance: NodeId, detail: SlotFault },
}

/// How a render broke slot ordering.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotFault {
    #[error("declared {found} state slot(s), previous renders declared {expected}")]
    Count { expected: usize, found: usize },

    #[error("slot {slot} holds {stored} but was declared as {declared}")]
    Type {
        slot: usize,
        stored: &'static str,
        declared: &'static str,
    },
}

/// Errors confined to one subtree or sibling group.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    /// Two siblings share a key; the group keeps its previous children.
    #[error("duplicate key {key} among children of {parent:?}")]
    DuplicateKey { parent: NodeId, key: Key },

    /// The instance broke slot ordering and was torn down.
    #[error("<{component}> torn down: {source}")]
    StateSlotMismatch {
        instance: NodeId,
        component: &'static str,
        #[source]
        source: StateError,
    },
}

/// Errors that abort a whole flush.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A destroyed instance id came back within the same flush.
    #[error("instance identity {node:?} reused after destroy in the same flush")]
    IdentityReused { node: NodeId },

    #[error("unknown node {node:?}")]
    UnknownNode { node: NodeId },

    #[error("node {node:?} is not a component instance")]
    NotAComponent { node: NodeId },

    #[error("updates still pending after {cycles} flush cycles")]
    FlushLimitExceeded { cycles: usize },
}

/// Patch application failures in [`crate::host::HostTree`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("unknown host node {node:?}")]
    UnknownNode { node: NodeId },

    #[error("node {node:?} already exists")]
    DuplicateNode { node: NodeId },

    #[error("index {index} out of bounds for {len} children of {parent:?}")]
    IndexOutOfBounds {
        parent: NodeId,
        index: usize,
        len: usize,
    },

    #[error("expected {expected:?} at index {index} of {parent:?}, found {found:?}")]
    NodeMismatch {
        parent: NodeId,
        index: usize,
        expected: NodeId,
        found: NodeId,
    },

    #[error("change does not apply to node {node:?}")]
    KindMismatch { node: NodeId },
}

/// Non-fatal diagnostics collected during a flush.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Warning {
    /// A list child without a key; matched by position.
    #[error("child {index} ({element}) of list {parent:?} has no key")]
    MissingKey {
        parent: NodeId,
        index: usize,
        element: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let fault = SlotFault::Count {
            expected: 2,
            found: 1,
        };
        assert_eq!(
            fault.to_string(),
            "declared 1 state slot(s), previous renders declared 2"
        );

        let err = ReconcileError::DuplicateKey {
            parent: NodeId::default(),
            key: Key::from(7),
        };
        assert!(err.to_string().starts_with("duplicate key 7"));
    }
}
