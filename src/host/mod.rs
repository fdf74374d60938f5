//! Host - Reference presentation layer.
//!
//! [`HostTree`] is a concrete node tree driven only by patches. It knows
//! nothing about components or state; it checks every operation against
//! its own children lists and fails on the first one that does not fit.
//!
//! Component nodes are kept (each with its single rendered child) so that
//! positions line up with the patch. [`HostTree::to_markup`] skips them.

pub mod terminal;

use std::collections::HashMap;
use std::fmt::Write as _;

use crate::error::HostError;
use crate::patch::{NodeChange, NodePayload, Patch, PatchOp};
use crate::types::NodeId;

/// One node of the host tree.
#[derive(Debug, Clone, PartialEq)]
pub struct HostNode {
    /// `None` for the container.
    pub payload: Option<NodePayload>,
    pub children: Vec<NodeId>,
}

/// Node tree maintained by applying patches.
#[derive(Debug, Clone)]
pub struct HostTree {
    container: NodeId,
    nodes: HashMap<NodeId, HostNode>,
}

impl HostTree {
    /// Empty tree rooted at the runtime's container id.
    pub fn new(container: NodeId) -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(
            container,
            HostNode {
                payload: None,
                children: Vec::new(),
            },
        );
        Self { container, nodes }
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    pub fn get(&self, id: NodeId) -> Option<&HostNode> {
        self.nodes.get(&id)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(&id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    /// Number of nodes, excluding the container.
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply every operation of `patch` in order.
    pub fn apply(&mut self, patch: &Patch) -> Result<(), HostError> {
        for op in patch {
            self.apply_op(op)?;
        }
        Ok(())
    }

    pub fn apply_op(&mut self, op: &PatchOp) -> Result<(), HostError> {
        match op {
            PatchOp::Create {
                parent,
                index,
                node,
                payload,
            } => {
                if self.nodes.contains_key(node) {
                    return Err(HostError::DuplicateNode { node: *node });
                }
                let siblings = self.children_mut(*parent)?;
                if *index > siblings.len() {
                    return Err(HostError::IndexOutOfBounds {
                        parent: *parent,
                        index: *index,
                        len: siblings.len(),
                    });
                }
                siblings.insert(*index, *node);
                self.nodes.insert(
                    *node,
                    HostNode {
                        payload: Some(payload.clone()),
                        children: Vec::new(),
                    },
                );
            }
            PatchOp::Update {
                parent,
                index,
                node,
                change,
            } => {
                self.expect_at(*parent, *index, *node)?;
                let payload = self
                    .nodes
                    .get_mut(node)
                    .and_then(|host| host.payload.as_mut())
                    .ok_or(HostError::UnknownNode { node: *node })?;
                match (payload, change) {
                    (NodePayload::Host { attrs, .. }, NodeChange::Attrs(diff)) => diff.apply_to(attrs),
                    (NodePayload::Text(text), NodeChange::Text(next)) => text.clone_from(next),
                    (NodePayload::Component { .. }, NodeChange::Props) => {}
                    _ => return Err(HostError::KindMismatch { node: *node }),
                }
            }
            PatchOp::Move {
                parent,
                node,
                from,
                to,
                ..
            } => {
                self.expect_at(*parent, *from, *node)?;
                let siblings = self.children_mut(*parent)?;
                siblings.remove(*from);
                if *to > siblings.len() {
                    return Err(HostError::IndexOutOfBounds {
                        parent: *parent,
                        index: *to,
                        len: siblings.len(),
                    });
                }
                siblings.insert(*to, *node);
            }
            PatchOp::Delete {
                parent,
                index,
                node,
            } => {
                self.expect_at(*parent, *index, *node)?;
                self.children_mut(*parent)?.remove(*index);
                self.drop_subtree(*node);
            }
        }
        Ok(())
    }

    /// Same format as [`InstanceTree::outline`](crate::engine::InstanceTree::outline).
    pub fn outline(&self) -> String {
        let mut out = String::new();
        self.outline_into(self.container, 0, &mut out);
        out
    }

    /// HTML-like rendering with component nodes removed.
    ///
    /// `<ul><li>Garlic</li><li>Apple</li></ul>`
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        for child in self.children(self.container) {
            self.markup_into(*child, &mut out);
        }
        out
    }

    fn outline_into(&self, id: NodeId, depth: usize, out: &mut String) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        if let Some(payload) = &node.payload {
            let indent = "  ".repeat(depth.saturating_sub(1));
            let _ = writeln!(out, "{indent}{}", payload.describe());
        }
        for child in &node.children {
            self.outline_into(*child, depth + 1, out);
        }
    }

    fn markup_into(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        match &node.payload {
            Some(NodePayload::Host { tag, attrs, .. }) => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    let _ = write!(out, " {name}=\"{value}\"");
                }
                out.push('>');
                for child in &node.children {
                    self.markup_into(*child, out);
                }
                let _ = write!(out, "</{tag}>");
            }
            Some(NodePayload::Text(text)) => out.push_str(text),
            Some(NodePayload::Component { .. }) | None => {
                for child in &node.children {
                    self.markup_into(*child, out);
                }
            }
        }
    }

    fn children_mut(&mut self, parent: NodeId) -> Result<&mut Vec<NodeId>, HostError> {
        self.nodes
            .get_mut(&parent)
            .map(|node| &mut node.children)
            .ok_or(HostError::UnknownNode { node: parent })
    }

    fn expect_at(&self, parent: NodeId, index: usize, expected: NodeId) -> Result<(), HostError> {
        let siblings = self
            .nodes
            .get(&parent)
            .map(|node| node.children.as_slice())
            .ok_or(HostError::UnknownNode { node: parent })?;
        match siblings.get(index) {
            Some(found) if *found == expected => Ok(()),
            Some(found) => Err(HostError::NodeMismatch {
                parent,
                index,
                expected,
                found: *found,
            }),
            None => Err(HostError::IndexOutOfBounds {
                parent,
                index,
                len: siblings.len(),
            }),
        }
    }

    fn drop_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(&current) {
                stack.extend(node.children);
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Runtime;
    use crate::primitives::{each, h, text};

    fn fruit(items: &[(i64, &str)]) -> crate::primitives::HostElement {
        h("ul").list(each(items, |(id, _)| *id, |(_, name)| h("li").child(text(*name))))
    }

    #[test]
    fn test_apply_mirrors_runtime() {
        let mut runtime = Runtime::new();
        let mut host = HostTree::new(runtime.container());

        let flush = runtime.mount(fruit(&[(1, "Cabbage"), (2, "Garlic")])).unwrap();
        host.apply(&flush.patch).unwrap();
        assert_eq!(host.to_markup(), "<ul><li>Cabbage</li><li>Garlic</li></ul>");

        let flush = runtime.render(fruit(&[(2, "Garlic"), (3, "Apple")])).unwrap();
        host.apply(&flush.patch).unwrap();
        assert_eq!(host.to_markup(), "<ul><li>Garlic</li><li>Apple</li></ul>");
        assert_eq!(host.outline(), runtime.tree().outline());
        assert_eq!(host.len(), runtime.tree().len());
    }

    #[test]
    fn test_stale_patch_is_rejected() {
        let mut runtime = Runtime::new();
        let mut host = HostTree::new(runtime.container());
        runtime.mount(fruit(&[(1, "Cabbage")])).unwrap();

        // The host never saw the mount.
        let flush = runtime.render(fruit(&[(1, "Kale")])).unwrap();
        assert!(matches!(
            host.apply(&flush.patch),
            Err(HostError::UnknownNode { .. })
        ));
    }

    #[test]
    fn test_delete_drops_subtree() {
        let mut runtime = Runtime::new();
        let mut host = HostTree::new(runtime.container());
        host.apply(&runtime.mount(fruit(&[(1, "Cabbage")])).unwrap().patch)
            .unwrap();
        assert_eq!(host.len(), 3);

        host.apply(&runtime.unmount().unwrap().patch).unwrap();
        assert!(host.is_empty());
        assert_eq!(host.to_markup(), "");
    }
}
