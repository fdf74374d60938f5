//! Reconciler - Diffs new descriptors against the instance tree.
//!
//! Works one sibling group at a time:
//!
//! 1. Reject the group if two new children share a key.
//! 2. Match: keyed children by key, unkeyed children by position. A match
//!    is reused only if the tag / component function is the same.
//! 3. Emit the edit script for the group:
//!    - moves, bringing reused nodes into their new relative order
//!    - deletes of unmatched old nodes (from the tail)
//!    - creates at their final positions
//!    - updates of reused nodes at their final positions
//! 4. Recurse: host children as a new group; components are rendered
//!    (unless their props are unchanged, nothing is pending and props are
//!    the function's only input) and their output reconciled as a group
//!    of one.
//!
//! Unkeyed children never match across positions, so reordering an
//! unkeyed list recreates instances whose type changed at a position.
//! The script is correct, not minimal.

use std::collections::{HashMap, HashSet};

use crate::config::{MissingKeyPolicy, RuntimeConfig};
use crate::error::{EngineError, ReconcileError, Warning};
use crate::patch::{AttrDiff, NodeChange, Patch, PatchOp};
use crate::primitives::Element;
use crate::types::{Key, NodeFlags, NodeId};
use super::render::render_instance;
use super::state::{StateStore, UpdateQueue};
use super::tree::{InstanceTree, NodeKind};

/// Result of one reconciliation pass.
#[derive(Debug, Default)]
pub(crate) struct Outcome {
    pub(crate) patch: Patch,
    pub(crate) rendered: Vec<NodeId>,
    pub(crate) errors: Vec<ReconcileError>,
    pub(crate) warnings: Vec<Warning>,
}

/// A new child after matching.
struct Placed {
    id: NodeId,
    element: Element,
    created: bool,
    needs_render: bool,
}

pub(crate) struct Reconciler<'a> {
    tree: &'a mut InstanceTree,
    store: &'a mut StateStore,
    queue: &'a UpdateQueue,
    config: &'a RuntimeConfig,
    destroyed: HashSet<NodeId>,
    outcome: Outcome,
}

impl<'a> Reconciler<'a> {
    pub(crate) fn new(
        tree: &'a mut InstanceTree,
        store: &'a mut StateStore,
        queue: &'a UpdateQueue,
        config: &'a RuntimeConfig,
    ) -> Self {
        Self {
            tree,
            store,
            queue,
            config,
            destroyed: HashSet::new(),
            outcome: Outcome::default(),
        }
    }

    pub(crate) fn finish(self) -> Outcome {
        self.outcome
    }

    /// Re-render a component marked [`NodeFlags::DIRTY`].
    ///
    /// No-op if an ancestor's pass already rendered or removed it.
    pub(crate) fn rerender(&mut self, id: NodeId) -> Result<(), EngineError> {
        match self.tree.get(id) {
            Some(node) if node.flags.contains(NodeFlags::DIRTY) => self.render_component(id),
            _ => Ok(()),
        }
    }

    /// Reconcile `children` as the new child group of `parent`.
    ///
    /// Children of a [`NodeFlags::LIST`] parent are checked for keys.
    pub(crate) fn reconcile_children(
        &mut self,
        parent: NodeId,
        children: Vec<Element>,
    ) -> Result<(), EngineError> {
        if let Some(key) = duplicate_key(&children) {
            tracing::error!(?parent, %key, "duplicate key, keeping previous children");
            self.outcome
                .errors
                .push(ReconcileError::DuplicateKey { parent, key });
            return Ok(());
        }
        if self.tree.node(parent)?.flags.contains(NodeFlags::LIST) {
            self.check_keys(parent, &children);
        }

        let old: Vec<NodeId> = self.tree.children(parent).to_vec();
        let matched = self.match_children(&old, &children);
        let used: HashSet<NodeId> = matched.iter().flatten().copied().collect();
        let mut current = old.clone();

        // Moves: reused nodes into their new relative order.
        let mut target = 0;
        for &id in matched.iter().flatten() {
            if let Some(from) = current.iter().position(|c| *c == id) {
                if from != target {
                    current.remove(from);
                    current.insert(target, id);
                    let key = self.tree.node(id)?.key.clone();
                    self.emit(PatchOp::Move {
                        parent,
                        node: id,
                        key,
                        from,
                        to: target,
                    });
                }
            }
            target += 1;
        }

        // Deletes: unmatched nodes now sit at the tail.
        let mut index = current.len();
        while index > target {
            index -= 1;
            let id = current.remove(index);
            debug_assert!(!used.contains(&id));
            self.emit(PatchOp::Delete {
                parent,
                index,
                node: id,
            });
            self.destroy(id);
        }

        // Creates at final positions.
        let mut placed = Vec::with_capacity(children.len());
        for (index, (element, reused)) in children.into_iter().zip(matched).enumerate() {
            match reused {
                Some(id) => placed.push(Placed {
                    id,
                    element,
                    created: false,
                    needs_render: false,
                }),
                None => {
                    let id = self.create_node(parent, &element)?;
                    current.insert(index, id);
                    if let Some(payload) = self.tree.node(id)?.payload() {
                        self.emit(PatchOp::Create {
                            parent,
                            index,
                            node: id,
                            payload,
                        });
                    }
                    placed.push(Placed {
                        id,
                        element,
                        created: true,
                        needs_render: true,
                    });
                }
            }
        }
        self.tree.set_children(parent, current)?;

        // Updates at final positions.
        for (index, child) in placed.iter_mut().enumerate() {
            if !child.created {
                child.needs_render = self.update_node(parent, index, child.id, &child.element)?;
            }
        }

        for child in placed {
            self.descend(child)?;
        }
        Ok(())
    }

    /// Pair each new child with a reusable old node.
    fn match_children(&self, old: &[NodeId], children: &[Element]) -> Vec<Option<NodeId>> {
        let by_key: HashMap<&Key, NodeId> = old
            .iter()
            .filter_map(|id| Some((self.tree.get(*id)?.key.as_ref()?, *id)))
            .collect();

        let mut used = HashSet::new();
        children
            .iter()
            .enumerate()
            .map(|(index, element)| {
                let candidate = match element.key() {
                    Some(key) => by_key.get(key).copied(),
                    None => old
                        .get(index)
                        .copied()
                        .filter(|id| self.tree.get(*id).is_some_and(|node| node.key.is_none())),
                };
                let reused = candidate.filter(|id| {
                    !used.contains(id) && self.tree.get(*id).is_some_and(|node| node.matches(element))
                });
                if let Some(id) = reused {
                    used.insert(id);
                }
                reused
            })
            .collect()
    }

    /// Sync a reused node with its new descriptor and emit an update if it
    /// changed. Returns whether a component needs rendering.
    fn update_node(
        &mut self,
        parent: NodeId,
        index: usize,
        id: NodeId,
        element: &Element,
    ) -> Result<bool, EngineError> {
        let memoize = self.config.memoize_props;
        let node = self.tree.node_mut(id)?;
        let dirty = node.flags.contains(NodeFlags::DIRTY);

        let (change, needs_render) = match (&mut node.kind, element) {
            (NodeKind::Host { attrs, handlers, .. }, Element::Host(host)) => {
                *handlers = host.handlers.clone();
                node.flags.set(NodeFlags::LIST, host.list);
                let diff = AttrDiff::between(attrs, &host.attrs);
                if diff.is_empty() {
                    (None, false)
                } else {
                    *attrs = host.attrs.clone();
                    (Some(NodeChange::Attrs(diff)), false)
                }
            }
            (NodeKind::Text(current), Element::Text(text)) => {
                if current == text {
                    (None, false)
                } else {
                    *current = text.clone();
                    (Some(NodeChange::Text(text.clone())), false)
                }
            }
            (NodeKind::Component(current), Element::Component(next)) => {
                let same = current.same_props(next);
                let skippable = same && memoize && next.ty.is_pure();
                *current = next.clone();
                let change = (!same).then_some(NodeChange::Props);
                (change, dirty || !skippable)
            }
            _ => (None, false),
        };

        if let Some(change) = change {
            self.emit(PatchOp::Update {
                parent,
                index,
                node: id,
                change,
            });
        }
        Ok(needs_render)
    }

    fn descend(&mut self, child: Placed) -> Result<(), EngineError> {
        match child.element {
            Element::Host(host) => self.reconcile_children(child.id, host.children),
            Element::Text(_) => Ok(()),
            Element::Component(component) => {
                if child.needs_render {
                    self.render_component(child.id)
                } else {
                    tracing::debug!(component = component.ty.name(), "props unchanged, skipping render");
                    Ok(())
                }
            }
        }
    }

    /// Render a component and reconcile its output as its only child.
    fn render_component(&mut self, id: NodeId) -> Result<(), EngineError> {
        let node = self.tree.node_mut(id)?;
        let NodeKind::Component(component) = &node.kind else {
            return Err(EngineError::NotAComponent { node: id });
        };
        let render = component.render.clone();
        let name = component.ty.name();
        node.flags.remove(NodeFlags::DIRTY);

        match render_instance(self.store, self.queue, id, &render) {
            Ok(output) => {
                self.outcome.rendered.push(id);
                self.reconcile_children(id, vec![output])
            }
            Err(source) => {
                tracing::error!(component = name, %source, "tearing down instance");
                self.outcome.errors.push(ReconcileError::StateSlotMismatch {
                    instance: id,
                    component: name,
                    source,
                });
                self.teardown(id)
            }
        }
    }

    /// Delete a failed instance from its parent's group.
    fn teardown(&mut self, id: NodeId) -> Result<(), EngineError> {
        let parent = self
            .tree
            .parent(id)
            .ok_or(EngineError::UnknownNode { node: id })?;
        let index = self
            .tree
            .index_in_parent(id)
            .ok_or(EngineError::UnknownNode { node: id })?;
        self.emit(PatchOp::Delete {
            parent,
            index,
            node: id,
        });
        self.destroy(id);
        Ok(())
    }

    fn create_node(&mut self, parent: NodeId, element: &Element) -> Result<NodeId, EngineError> {
        let id = self.tree.insert(parent, element)?;
        if self.destroyed.contains(&id) {
            return Err(EngineError::IdentityReused { node: id });
        }
        Ok(id)
    }

    /// Remove a subtree and release its state and pending work.
    fn destroy(&mut self, id: NodeId) {
        for (removed, flags) in self.tree.remove_subtree(id) {
            self.store.release(removed);
            if flags.contains(NodeFlags::DIRTY) {
                tracing::debug!(instance = ?removed, "discarding update for destroyed instance");
            }
            self.destroyed.insert(removed);
        }
    }

    fn check_keys(&mut self, parent: NodeId, children: &[Element]) {
        if self.config.missing_keys == MissingKeyPolicy::Ignore {
            return;
        }
        for (index, element) in children.iter().enumerate() {
            if element.key().is_some() {
                continue;
            }
            let warning = Warning::MissingKey {
                parent,
                index,
                element: element.describe(),
            };
            tracing::warn!(%warning, "list child without key");
            self.outcome.warnings.push(warning);
        }
    }

    fn emit(&mut self, op: PatchOp) {
        tracing::trace!(%op, "patch");
        self.outcome.patch.push(op);
    }
}

/// First key that appears twice in a group.
fn duplicate_key(children: &[Element]) -> Option<Key> {
    let mut seen = HashSet::new();
    children
        .iter()
        .filter_map(Element::key)
        .find(|key| !seen.insert(*key))
        .cloned()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Scope;
    use crate::patch::{NodePayload, OpKind};
    use crate::primitives::{component, h, text};

    fn label(_cx: &mut Scope<'_>, _props: &()) -> Element {
        text("label")
    }

    struct Harness {
        tree: InstanceTree,
        store: StateStore,
        queue: UpdateQueue,
        config: RuntimeConfig,
    }

    impl Harness {
        /// The container stands in for a list parent.
        fn new() -> Self {
            let queue = UpdateQueue::new();
            let mut tree = InstanceTree::new();
            let container = tree.container();
            tree.node_mut(container).unwrap().flags.insert(NodeFlags::LIST);
            Self {
                tree,
                store: StateStore::new(queue.clone()),
                queue,
                config: RuntimeConfig::default(),
            }
        }

        fn run(&mut self, children: Vec<Element>) -> Outcome {
            let container = self.tree.container();
            let mut rec = Reconciler::new(
                &mut self.tree,
                &mut self.store,
                &self.queue,
                &self.config,
            );
            rec.reconcile_children(container, children).unwrap();
            rec.finish()
        }

        fn keys(&self) -> Vec<Key> {
            self.tree
                .children(self.tree.container())
                .iter()
                .filter_map(|id| self.tree.get(*id)?.key.clone())
                .collect()
        }
    }

    fn items(ids: &[i64]) -> Vec<Element> {
        ids.iter()
            .map(|id| h("li").key(*id).child(text(format!("item {id}"))).into())
            .collect()
    }

    #[test]
    fn test_initial_render_creates_parent_first() {
        let mut harness = Harness::new();
        let outcome = harness.run(items(&[1]));

        assert_eq!(outcome.patch.kinds(), vec![OpKind::Create, OpKind::Create]);
        let ops = outcome.patch.ops();
        assert_eq!(ops[1].parent(), ops[0].node());
        assert_eq!(harness.tree.len(), 2);
    }

    #[test]
    fn test_identical_group_is_empty_patch() {
        let mut harness = Harness::new();
        harness.run(items(&[1, 2, 3]));
        let outcome = harness.run(items(&[1, 2, 3]));

        assert!(outcome.patch.is_empty(), "got {}", outcome.patch);
    }

    #[test]
    fn test_rotation_is_single_move() {
        let mut harness = Harness::new();
        harness.run(items(&[1, 2, 3]));
        let before = harness.tree.children(harness.tree.container()).to_vec();

        let outcome = harness.run(items(&[3, 1, 2]));
        assert_eq!(outcome.patch.kinds(), vec![OpKind::Move]);
        assert_eq!(harness.keys(), vec![Key::Num(3), Key::Num(1), Key::Num(2)]);

        let mut after = harness.tree.children(harness.tree.container()).to_vec();
        after.sort();
        let mut before = before;
        before.sort();
        assert_eq!(before, after, "instances must be reused");
    }

    #[test]
    fn test_insert_in_middle_is_single_create() {
        let mut harness = Harness::new();
        harness.run(items(&[1, 3]));
        let outcome = harness.run(items(&[1, 2, 3]));

        // The <li> plus its text child.
        assert_eq!(outcome.patch.kinds(), vec![OpKind::Create, OpKind::Create]);
        assert!(matches!(
            outcome.patch.ops()[0],
            PatchOp::Create { index: 1, .. }
        ));
    }

    #[test]
    fn test_duplicate_key_keeps_previous_children() {
        let mut harness = Harness::new();
        harness.run(items(&[1, 2]));
        let outcome = harness.run(items(&[1, 1]));

        assert!(outcome.patch.is_empty());
        assert!(matches!(
            outcome.errors.as_slice(),
            [ReconcileError::DuplicateKey { key: Key::Num(1), .. }]
        ));
        assert_eq!(harness.keys(), vec![Key::Num(1), Key::Num(2)]);
    }

    #[test]
    fn test_tag_change_replaces_node() {
        let mut harness = Harness::new();
        harness.run(vec![h("div").into()]);
        let outcome = harness.run(vec![h("span").into()]);

        assert_eq!(outcome.patch.kinds(), vec![OpKind::Delete, OpKind::Create]);
        assert!(matches!(
            &outcome.patch.ops()[1],
            PatchOp::Create { payload: NodePayload::Host { tag, .. }, .. } if tag == "span"
        ));
    }

    #[test]
    fn test_text_and_attr_updates() {
        let mut harness = Harness::new();
        harness.run(vec![h("p").attr("class", "a").child("one").into()]);
        let outcome = harness.run(vec![h("p").attr("class", "b").child("two").into()]);

        assert_eq!(outcome.patch.kinds(), vec![OpKind::Update, OpKind::Update]);
        assert!(matches!(
            &outcome.patch.ops()[1],
            PatchOp::Update { change: NodeChange::Text(t), .. } if t == "two"
        ));
    }

    #[test]
    fn test_unkeyed_list_warns() {
        let mut harness = Harness::new();
        let outcome = harness.run(vec![h("li").into(), h("li").key(2).into()]);

        assert_eq!(outcome.warnings.len(), 1);
        assert!(matches!(
            outcome.warnings[0],
            Warning::MissingKey { index: 0, .. }
        ));
    }

    #[test]
    fn test_list_flag_follows_reused_parent() {
        let mut harness = Harness::new();
        let list = || h("ul").key(1).list(vec![h("li")]);

        assert_eq!(harness.run(vec![list().into()]).warnings.len(), 1);
        let outcome = harness.run(vec![h("ul").key(1).children(vec![h("li")]).into()]);
        assert!(outcome.warnings.is_empty());
        assert_eq!(harness.run(vec![list().into()]).warnings.len(), 1);
    }

    #[test]
    fn test_rerender_skips_clean_component() {
        let mut harness = Harness::new();
        harness.run(vec![component(label, ()).key(1).into()]);
        let container = harness.tree.container();
        let id = harness.tree.children(container)[0];

        let mut rec = Reconciler::new(&mut harness.tree, &mut harness.store, &harness.queue, &harness.config);
        rec.rerender(id).unwrap();
        assert!(rec.finish().rendered.is_empty());

        harness.tree.node_mut(id).unwrap().flags.insert(NodeFlags::DIRTY);
        let mut rec = Reconciler::new(&mut harness.tree, &mut harness.store, &harness.queue, &harness.config);
        rec.rerender(id).unwrap();
        assert_eq!(rec.finish().rendered, vec![id]);
        assert!(!harness.tree.get(id).unwrap().flags().contains(NodeFlags::DIRTY));
        assert_eq!(harness.tree.children(container), &[id]);
    }

    #[test]
    fn test_unkeyed_matches_by_position_only() {
        let mut harness = Harness::new();
        harness.run(vec![h("a").into(), h("b").into()]);
        let outcome = harness.run(vec![h("b").into(), h("a").into()]);

        // No cross-position matching: both replaced.
        assert_eq!(outcome.patch.count(OpKind::Delete), 2);
        assert_eq!(outcome.patch.count(OpKind::Create), 2);
        assert_eq!(outcome.patch.count(OpKind::Move), 0);
    }

    #[test]
    fn test_duplicate_key_helper() {
        assert_eq!(duplicate_key(&items(&[1, 2, 3])), None);
        assert_eq!(duplicate_key(&items(&[1, 2, 1])), Some(Key::Num(1)));
    }
}
