//! Instance Tree - Arena of nodes produced by reconciliation.
//!
//! Manages the persistent side of rendering:
//! - One node per matched descriptor (host, text or component instance)
//! - Children owned top-down as ordered id lists
//! - Parent links for lookups only; never consulted for destruction
//! - A permanent container node that holds the mounted root
//!
//! Node ids come from a `SlotMap`, so a destroyed id is never reissued.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use slotmap::SlotMap;

use crate::error::EngineError;
use crate::patch::NodePayload;
use crate::primitives::{ComponentElement, Element};
use crate::types::{AttrValue, EventHandler, Key, NodeFlags, NodeId};

// =============================================================================
// Node
// =============================================================================

/// What a node is, with the data last reconciled into it.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Mount point owned by the runtime.
    Container,
    Host {
        tag: String,
        attrs: BTreeMap<String, AttrValue>,
        handlers: BTreeMap<String, EventHandler>,
    },
    Text(String),
    /// Component instance with its current props and render callback.
    Component(ComponentElement),
}

impl NodeKind {
    fn from_element(element: &Element) -> Self {
        match element {
            Element::Host(host) => NodeKind::Host {
                tag: host.tag.clone(),
                attrs: host.attrs.clone(),
                handlers: host.handlers.clone(),
            },
            Element::Text(text) => NodeKind::Text(text.clone()),
            Element::Component(component) => NodeKind::Component(component.clone()),
        }
    }
}

/// One node of the instance tree.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) key: Option<Key>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) depth: u32,
    pub(crate) flags: NodeFlags,
}

impl Node {
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Distance from the container (the container itself is 0).
    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn flags(&self) -> NodeFlags {
        self.flags
    }

    pub fn is_component(&self) -> bool {
        matches!(self.kind, NodeKind::Component(_))
    }

    /// Component name, for component instances.
    pub fn component_name(&self) -> Option<&'static str> {
        match &self.kind {
            NodeKind::Component(component) => Some(component.ty.name()),
            _ => None,
        }
    }

    /// Text content, for text nodes.
    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Whether `element` may be reconciled into this node.
    ///
    /// Same tag for hosts, same component function for components.
    pub fn matches(&self, element: &Element) -> bool {
        match (&self.kind, element) {
            (NodeKind::Host { tag, .. }, Element::Host(host)) => *tag == host.tag,
            (NodeKind::Text(_), Element::Text(_)) => true,
            (NodeKind::Component(current), Element::Component(next)) => current.ty == next.ty,
            _ => false,
        }
    }

    /// Payload describing this node to the presentation layer.
    pub fn payload(&self) -> Option<NodePayload> {
        match &self.kind {
            NodeKind::Container => None,
            NodeKind::Host { tag, attrs, .. } => Some(NodePayload::Host {
                tag: tag.clone(),
                attrs: attrs.clone(),
                key: self.key.clone(),
            }),
            NodeKind::Text(text) => Some(NodePayload::Text(text.clone())),
            NodeKind::Component(component) => Some(NodePayload::Component {
                name: component.ty.name(),
                key: self.key.clone(),
            }),
        }
    }
}

// =============================================================================
// Instance Tree
// =============================================================================

/// Arena-backed tree of rendered nodes.
pub struct InstanceTree {
    nodes: SlotMap<NodeId, Node>,
    container: NodeId,
}

impl InstanceTree {
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let container = nodes.insert(Node {
            kind: NodeKind::Container,
            key: None,
            parent: None,
            children: Vec::new(),
            depth: 0,
            flags: NodeFlags::NONE,
        });
        Self { nodes, container }
    }

    /// The permanent mount point.
    pub fn container(&self) -> NodeId {
        self.container
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Like [`get`](Self::get) but fails with [`EngineError::UnknownNode`].
    pub fn node(&self, id: NodeId) -> Result<&Node, EngineError> {
        self.nodes.get(id).ok_or(EngineError::UnknownNode { node: id })
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, EngineError> {
        self.nodes
            .get_mut(id)
            .ok_or(EngineError::UnknownNode { node: id })
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn is_component(&self, id: NodeId) -> bool {
        self.nodes.get(id).is_some_and(Node::is_component)
    }

    /// Number of nodes, excluding the container.
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Children of `id` (empty for unknown ids).
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|node| node.parent)
    }

    pub fn depth(&self, id: NodeId) -> u32 {
        self.nodes.get(id).map(|node| node.depth).unwrap_or(0)
    }

    /// Position of `id` among its parent's children.
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|child| *child == id)
    }

    /// All nodes below `id` in pre-order, `id` included.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get(current) {
                out.push(current);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    /// First node in pre-order (from the container) matching `predicate`.
    pub fn find(&self, predicate: impl Fn(&Node) -> bool) -> Option<NodeId> {
        self.descendants(self.container)
            .into_iter()
            .find(|id| self.nodes.get(*id).is_some_and(&predicate))
    }

    /// All nodes in pre-order matching `predicate`.
    pub fn find_all(&self, predicate: impl Fn(&Node) -> bool) -> Vec<NodeId> {
        self.descendants(self.container)
            .into_iter()
            .filter(|id| self.nodes.get(*id).is_some_and(&predicate))
            .collect()
    }

    /// Ids of all component instances in pre-order.
    pub fn components(&self) -> Vec<NodeId> {
        self.find_all(Node::is_component)
    }

    /// Indented one-node-per-line rendering of the tree below the container.
    pub fn outline(&self) -> String {
        let mut out = String::new();
        for id in self.descendants(self.container).into_iter().skip(1) {
            if let Some(node) = self.nodes.get(id) {
                if let Some(payload) = node.payload() {
                    let indent = "  ".repeat(node.depth.saturating_sub(1) as usize);
                    let _ = writeln!(out, "{indent}{}", payload.describe());
                }
            }
        }
        out
    }

    // =========================================================================
    // Mutation (reconciler only)
    // =========================================================================

    /// Allocate a node for `element` under `parent`, not yet linked.
    pub(crate) fn insert(&mut self, parent: NodeId, element: &Element) -> Result<NodeId, EngineError> {
        let depth = self.node(parent)?.depth + 1;
        let flags = match element {
            Element::Host(host) if host.list => NodeFlags::LIST,
            _ => NodeFlags::NONE,
        };
        Ok(self.nodes.insert(Node {
            kind: NodeKind::from_element(element),
            key: element.key().cloned(),
            parent: Some(parent),
            children: Vec::new(),
            depth,
            flags,
        }))
    }

    /// Replace the ordered children of `parent`.
    pub(crate) fn set_children(&mut self, parent: NodeId, children: Vec<NodeId>) -> Result<(), EngineError> {
        self.node_mut(parent)?.children = children;
        Ok(())
    }

    /// Remove `id` and everything below it; unlinks it from its parent.
    ///
    /// Returns the removed ids in pre-order, with the flags they carried.
    pub(crate) fn remove_subtree(&mut self, id: NodeId) -> Vec<(NodeId, NodeFlags)> {
        if id == self.container {
            return Vec::new();
        }
        if let Some(parent) = self.parent(id) {
            if let Some(node) = self.nodes.get_mut(parent) {
                node.children.retain(|child| *child != id);
            }
        }
        self.descendants(id)
            .into_iter()
            .filter_map(|node| Some((node, self.nodes.remove(node)?.flags)))
            .collect()
    }
}

impl Default for InstanceTree {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
