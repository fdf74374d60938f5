//! Patch stream - ordered edit script for the presentation layer.
//!
//! Every operation addresses a position as `(parent, index)` in the
//! instance tree. Applying the operations of a [`Patch`] in order against
//! the previous tree yields the new tree. A created subtree is emitted
//! parent first.
//!
//! # Example
//!
//! ```text
//! [Cabbage#1, Garlic#2]  ->  [Garlic#2, Apple#3]
//!
//! move(#2, 1 -> 0)        [Garlic, Cabbage]
//! delete(1)               [Garlic]
//! create(1, <li key=3>)   [Garlic, Apple]
//! create(0, "Apple")      (child of the new <li>)
//! ```

use std::collections::BTreeMap;
use std::fmt;

use crate::types::{AttrValue, Key, NodeId};

// =============================================================================
// Payloads
// =============================================================================

/// What a created node is.
#[derive(Debug, Clone, PartialEq)]
pub enum NodePayload {
    Host {
        tag: String,
        attrs: BTreeMap<String, AttrValue>,
        key: Option<Key>,
    },
    Text(String),
    /// Component instance; holds exactly one child (its rendered root).
    Component {
        name: &'static str,
        key: Option<Key>,
    },
}

impl NodePayload {
    /// One-line rendering used by outlines and logs.
    pub fn describe(&self) -> String {
        match self {
            NodePayload::Host { tag, attrs, key } => {
                let mut out = format!("<{tag}");
                if let Some(key) = key {
                    out.push_str(&format!(" key={key}"));
                }
                for (name, value) in attrs {
                    out.push_str(&format!(" {name}=\"{value}\""));
                }
                out.push('>');
                out
            }
            NodePayload::Text(text) => format!("{text:?}"),
            NodePayload::Component { name, key } => match key {
                Some(key) => format!("<{name} key={key}/>"),
                None => format!("<{name}/>"),
            },
        }
    }
}

/// Attribute changes between two renders of one host node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttrDiff {
    pub set: Vec<(String, AttrValue)>,
    pub removed: Vec<String>,
}

impl AttrDiff {
    /// Compute the changes that turn `old` into `new`.
    pub fn between(
        old: &BTreeMap<String, AttrValue>,
        new: &BTreeMap<String, AttrValue>,
    ) -> Self {
        let set = new
            .iter()
            .filter(|(name, value)| old.get(*name) != Some(*value))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        let removed = old
            .keys()
            .filter(|name| !new.contains_key(*name))
            .cloned()
            .collect();
        Self { set, removed }
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.removed.is_empty()
    }

    /// Apply the changes to an attribute map.
    pub fn apply_to(&self, attrs: &mut BTreeMap<String, AttrValue>) {
        for name in &self.removed {
            attrs.remove(name);
        }
        for (name, value) in &self.set {
            attrs.insert(name.clone(), value.clone());
        }
    }
}

/// What changed on an updated node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeChange {
    Attrs(AttrDiff),
    Text(String),
    /// Component received different props.
    Props,
}

// =============================================================================
// Operations
// =============================================================================

/// Kind of a patch operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Create,
    Update,
    Move,
    Delete,
}

/// One step of the edit script.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchOp {
    /// Insert `node` into `parent` at `index`.
    Create {
        parent: NodeId,
        index: usize,
        node: NodeId,
        payload: NodePayload,
    },
    /// Change the node at `index` in place.
    Update {
        parent: NodeId,
        index: usize,
        node: NodeId,
        change: NodeChange,
    },
    /// Move an existing child from `from` to `to` (remove then insert).
    Move {
        parent: NodeId,
        node: NodeId,
        key: Option<Key>,
        from: usize,
        to: usize,
    },
    /// Remove the child at `index` together with its subtree.
    Delete {
        parent: NodeId,
        index: usize,
        node: NodeId,
    },
}

impl PatchOp {
    pub fn kind(&self) -> OpKind {
        match self {
            PatchOp::Create { .. } => OpKind::Create,
            PatchOp::Update { .. } => OpKind::Update,
            PatchOp::Move { .. } => OpKind::Move,
            PatchOp::Delete { .. } => OpKind::Delete,
        }
    }

    /// Node the operation is about.
    pub fn node(&self) -> NodeId {
        match self {
            PatchOp::Create { node, .. }
            | PatchOp::Update { node, .. }
            | PatchOp::Move { node, .. }
            | PatchOp::Delete { node, .. } => *node,
        }
    }

    pub fn parent(&self) -> NodeId {
        match self {
            PatchOp::Create { parent, .. }
            | PatchOp::Update { parent, .. }
            | PatchOp::Move { parent, .. }
            | PatchOp::Delete { parent, .. } => *parent,
        }
    }
}

impl fmt::Display for PatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchOp::Create { index, payload, .. } => {
                write!(f, "create({index}, {})", payload.describe())
            }
            PatchOp::Update { index, change, .. } => match change {
                NodeChange::Attrs(diff) => write!(
                    f,
                    "update({index}, attrs +{} -{})",
                    diff.set.len(),
                    diff.removed.len()
                ),
                NodeChange::Text(text) => write!(f, "update({index}, {text:?})"),
                NodeChange::Props => write!(f, "update({index}, props)"),
            },
            PatchOp::Move { key, from, to, .. } => match key {
                Some(key) => write!(f, "move(key={key}, {from} -> {to})"),
                None => write!(f, "move({from} -> {to})"),
            },
            PatchOp::Delete { index, .. } => write!(f, "delete({index})"),
        }
    }
}

// =============================================================================
// Patch
// =============================================================================

/// Ordered list of operations produced by one flush.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    ops: Vec<PatchOp>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: PatchOp) {
        self.ops.push(op);
    }

    pub fn ops(&self) -> &[PatchOp] {
        &self.ops
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PatchOp> {
        self.ops.iter()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Number of operations of the given kind.
    pub fn count(&self, kind: OpKind) -> usize {
        self.ops.iter().filter(|op| op.kind() == kind).count()
    }

    /// Operation kinds in order; handy in assertions.
    pub fn kinds(&self) -> Vec<OpKind> {
        self.ops.iter().map(PatchOp::kind).collect()
    }
}

impl IntoIterator for Patch {
    type Item = PatchOp;
    type IntoIter = std::vec::IntoIter<PatchOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

impl<'a> IntoIterator for &'a Patch {
    type Item = &'a PatchOp;
    type IntoIter = std::slice::Iter<'a, PatchOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.iter()
    }
}

impl fmt::Display for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, op) in self.ops.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{op}")?;
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, AttrValue)]) -> BTreeMap<String, AttrValue> {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn test_attr_diff_between() {
        let old = attrs(&[("class", "a".into()), ("src", "x.png".into())]);
        let new = attrs(&[("class", "b".into()), ("alt", "photo".into())]);

        let diff = AttrDiff::between(&old, &new);
        assert_eq!(
            diff.set,
            vec![
                ("alt".to_string(), AttrValue::from("photo")),
                ("class".to_string(), AttrValue::from("b")),
            ]
        );
        assert_eq!(diff.removed, vec!["src".to_string()]);

        let mut applied = old.clone();
        diff.apply_to(&mut applied);
        assert_eq!(applied, new);
    }

    #[test]
    fn test_attr_diff_identical_is_empty() {
        let same = attrs(&[("width", 90.into())]);
        assert!(AttrDiff::between(&same, &same).is_empty());
    }

    #[test]
    fn test_payload_describe() {
        let host = NodePayload::Host {
            tag: "li".into(),
            attrs: attrs(&[("class", "fruit".into())]),
            key: Some(Key::from(3)),
        };
        assert_eq!(host.describe(), "<li key=3 class=\"fruit\">");

        let component = NodePayload::Component {
            name: "MyButton",
            key: None,
        };
        assert_eq!(component.describe(), "<MyButton/>");
        assert_eq!(NodePayload::Text("Apple".into()).describe(), "\"Apple\"");
    }

    #[test]
    fn test_patch_counts() {
        let mut patch = Patch::new();
        assert!(patch.is_empty());

        let node = NodeId::default();
        patch.push(PatchOp::Delete {
            parent: node,
            index: 0,
            node,
        });
        patch.push(PatchOp::Move {
            parent: node,
            node,
            key: None,
            from: 1,
            to: 0,
        });

        assert_eq!(patch.len(), 2);
        assert_eq!(patch.count(OpKind::Move), 1);
        assert_eq!(patch.kinds(), vec![OpKind::Delete, OpKind::Move]);
        assert_eq!(patch.to_string(), "delete(0); move(1 -> 0)");
    }
}
