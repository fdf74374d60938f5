//! Scheduler - Batches updates and drives one render/reconcile pass per flush.
//!
//! Setters and [`Runtime::schedule_update`] only enqueue. [`Runtime::flush`]:
//!
//! 1. Takes everything queued so far (later writes go to the next flush)
//! 2. Applies state updates in call order, marking their instances dirty
//! 3. Re-renders dirty instances shallowest first, so an ancestor's pass
//!    covers dirty descendants and each instance renders at most once
//! 4. Returns the patch together with isolated errors and warnings
//!
//! Updates aimed at instances that no longer exist are dropped.

use spark_signals::Signal;

use crate::config::RuntimeConfig;
use crate::error::{EngineError, ReconcileError, Warning};
use crate::patch::Patch;
use crate::primitives::Element;
use crate::types::{NodeFlags, NodeId};
use super::reconcile::Reconciler;
use super::state::{StateStore, UpdateQueue};
use super::tree::{InstanceTree, NodeKind};

// =============================================================================
// Flush
// =============================================================================

/// Output of one flush.
#[derive(Debug, Default)]
pub struct Flush {
    /// Edit script for the presentation layer.
    pub patch: Patch,
    /// Component instances rendered, in render order.
    pub rendered: Vec<NodeId>,
    /// Failures confined to a subtree or sibling group.
    pub errors: Vec<ReconcileError>,
    pub warnings: Vec<Warning>,
    /// Sequence number of this flush (starts at 1).
    pub cycle: u64,
}

impl Flush {
    /// No errors and no warnings.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    /// How many times `id` rendered during this flush.
    pub fn render_count(&self, id: NodeId) -> usize {
        self.rendered.iter().filter(|rendered| **rendered == id).count()
    }
}

// =============================================================================
// Runtime
// =============================================================================

/// Owns the instance tree, the state store and the update queue.
pub struct Runtime {
    tree: InstanceTree,
    store: StateStore,
    queue: UpdateQueue,
    config: RuntimeConfig,
    cycle: u64,
}

impl Runtime {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        let queue = UpdateQueue::new();
        Self {
            tree: InstanceTree::new(),
            store: StateStore::new(queue.clone()),
            queue,
            config,
            cycle: 0,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Permanent parent of the mounted root.
    pub fn container(&self) -> NodeId {
        self.tree.container()
    }

    pub fn tree(&self) -> &InstanceTree {
        &self.tree
    }

    /// Mount `root` under the container and flush.
    pub fn mount(&mut self, root: impl Into<Element>) -> Result<Flush, EngineError> {
        self.render(root)
    }

    /// Reconcile a new root against the mounted one and flush.
    ///
    /// Pending updates are applied in the same pass.
    pub fn render(&mut self, root: impl Into<Element>) -> Result<Flush, EngineError> {
        self.flush_with(Some(vec![root.into()]))
    }

    /// Delete the whole tree and release all state.
    pub fn unmount(&mut self) -> Result<Flush, EngineError> {
        self.flush_with(Some(Vec::new()))
    }

    /// Request a render of `instance` without changing its state.
    pub fn schedule_update(&self, instance: NodeId) -> Result<(), EngineError> {
        if !self.tree.node(instance)?.is_component() {
            return Err(EngineError::NotAComponent { node: instance });
        }
        self.queue.schedule(instance);
        Ok(())
    }

    pub fn has_pending(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Reactive count of queued updates.
    pub fn pending_updates(&self) -> Signal<usize> {
        self.queue.pending()
    }

    /// Apply queued updates and re-render affected instances.
    pub fn flush(&mut self) -> Result<Flush, EngineError> {
        self.flush_with(None)
    }

    /// Flush until nothing is queued.
    ///
    /// Updates scheduled while rendering land in the following flush; this
    /// keeps going until one flush schedules nothing new.
    pub fn run_until_idle(&mut self) -> Result<Vec<Flush>, EngineError> {
        let mut flushes = Vec::new();
        while self.has_pending() {
            if flushes.len() >= self.config.max_flush_cycles {
                return Err(EngineError::FlushLimitExceeded {
                    cycles: flushes.len(),
                });
            }
            flushes.push(self.flush()?);
        }
        Ok(flushes)
    }

    /// Run an event handler, then flush once.
    ///
    /// Every update the handler makes lands in that one flush.
    pub fn handle_event(&mut self, handler: impl FnOnce()) -> Result<Flush, EngineError> {
        handler();
        self.flush()
    }

    /// Invoke the `event` handler of a host node and flush.
    ///
    /// Returns `Ok(None)` when the node has no handler for `event`.
    pub fn dispatch_event(&mut self, node: NodeId, event: &str) -> Result<Option<Flush>, EngineError> {
        let handler = match self.tree.node(node)?.kind() {
            NodeKind::Host { handlers, .. } => handlers.get(event).cloned(),
            _ => None,
        };
        let Some(handler) = handler else {
            tracing::debug!(?node, event, "no handler");
            return Ok(None);
        };
        self.handle_event(|| handler.call()).map(Some)
    }

    /// Committed value of a state slot.
    pub fn state<T: Clone + 'static>(&self, instance: NodeId, slot: usize) -> Option<T> {
        self.store.get(instance, slot)
    }

    /// Slot count recorded by the instance's first render.
    pub fn slot_count(&self, instance: NodeId) -> Option<usize> {
        self.store.slot_count(instance)
    }

    // =========================================================================
    // Internal
    // =========================================================================

    fn flush_with(&mut self, root: Option<Vec<Element>>) -> Result<Flush, EngineError> {
        self.cycle += 1;
        let span = tracing::debug_span!("flush", cycle = self.cycle);
        let _enter = span.enter();

        let batch = self.queue.take();
        let mut roots = Vec::new();
        let mut discarded = 0usize;

        for update in batch.updates {
            let instance = update.instance;
            if self.tree.is_component(instance) && self.store.apply(update) {
                self.mark_dirty(&mut roots, instance);
            } else {
                discarded += 1;
            }
        }
        for instance in batch.forced {
            if self.tree.is_component(instance) {
                self.mark_dirty(&mut roots, instance);
            } else {
                discarded += 1;
            }
        }
        if discarded > 0 {
            tracing::debug!(discarded, "dropped updates for destroyed instances");
        }

        roots.sort_by_key(|id| (self.tree.depth(*id), *id));
        roots.dedup();

        let container = self.tree.container();
        let mut reconciler = Reconciler::new(
            &mut self.tree,
            &mut self.store,
            &self.queue,
            &self.config,
        );
        if let Some(children) = root {
            reconciler.reconcile_children(container, children)?;
        }
        for id in roots {
            reconciler.rerender(id)?;
        }
        let outcome = reconciler.finish();

        tracing::debug!(
            ops = outcome.patch.len(),
            rendered = outcome.rendered.len(),
            errors = outcome.errors.len(),
            "flush complete"
        );
        Ok(Flush {
            patch: outcome.patch,
            rendered: outcome.rendered,
            errors: outcome.errors,
            warnings: outcome.warnings,
            cycle: self.cycle,
        })
    }

    fn mark_dirty(&mut self, roots: &mut Vec<NodeId>, instance: NodeId) {
        if let Some(node) = self.tree.get_mut(instance) {
            node.flags.insert(NodeFlags::DIRTY);
            roots.push(instance);
        }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Scope;
    use crate::patch::{NodeChange, OpKind, PatchOp};
    use crate::primitives::{component, h, text};

    fn counter(cx: &mut Scope<'_>, _props: &()) -> Element {
        let (count, set_count) = cx.use_state(0);
        h("button")
            .on("click", move || {
                set_count.update(|c| c + 1);
                set_count.update(|c| c + 1);
            })
            .child(format!("Clicked {count} times"))
            .into()
    }

    fn button(runtime: &Runtime) -> NodeId {
        runtime
            .tree()
            .find(|node| matches!(node.kind(), NodeKind::Host { tag, .. } if tag == "button"))
            .unwrap()
    }

    #[test]
    fn test_mount_renders_once() {
        let mut runtime = Runtime::new();
        let flush = runtime.mount(component(counter, ())).unwrap();

        assert_eq!(flush.cycle, 1);
        assert_eq!(flush.rendered.len(), 1);
        assert!(flush.is_clean());
        assert_eq!(flush.patch.count(OpKind::Create), 3);
    }

    #[test]
    fn test_two_updates_one_render() {
        let mut runtime = Runtime::new();
        runtime.mount(component(counter, ())).unwrap();
        let instance = runtime.tree().components()[0];

        let flush = runtime
            .dispatch_event(button(&runtime), "click")
            .unwrap()
            .unwrap();

        assert_eq!(flush.render_count(instance), 1);
        assert_eq!(runtime.state::<i32>(instance, 0), Some(2));
        assert!(matches!(
            flush.patch.ops(),
            [PatchOp::Update { change: NodeChange::Text(t), .. }] if t == "Clicked 2 times"
        ));
        assert!(!runtime.has_pending());
    }

    #[test]
    fn test_missing_handler_is_none() {
        let mut runtime = Runtime::new();
        runtime.mount(component(counter, ())).unwrap();

        assert!(runtime.dispatch_event(button(&runtime), "hover").unwrap().is_none());
    }

    #[test]
    fn test_flush_without_work_is_empty() {
        let mut runtime = Runtime::new();
        runtime.mount(component(counter, ())).unwrap();

        let flush = runtime.flush().unwrap();
        assert!(flush.patch.is_empty());
        assert!(flush.rendered.is_empty());
    }

    #[test]
    fn test_schedule_update_rerenders_without_patch() {
        let mut runtime = Runtime::new();
        runtime.mount(component(counter, ())).unwrap();
        let instance = runtime.tree().components()[0];

        runtime.schedule_update(instance).unwrap();
        runtime.schedule_update(instance).unwrap();
        let flush = runtime.flush().unwrap();

        assert_eq!(flush.render_count(instance), 1);
        assert!(flush.patch.is_empty());
    }

    #[test]
    fn test_dirty_flag_set_until_rendered() {
        let mut runtime = Runtime::new();
        runtime.mount(h("div").child(component(counter, ())).child(component(counter, ()))).unwrap();
        let counters = runtime.tree().components();
        let dirty = |runtime: &Runtime, id| runtime.tree().get(id).unwrap().flags().contains(NodeFlags::DIRTY);

        runtime.schedule_update(counters[1]).unwrap();
        runtime.schedule_update(counters[1]).unwrap();
        let flush = runtime.flush().unwrap();

        assert_eq!(flush.rendered, vec![counters[1]]);
        assert!(!dirty(&runtime, counters[0]));
        assert!(!dirty(&runtime, counters[1]));
    }

    #[test]
    fn test_schedule_update_rejects_host_nodes() {
        let mut runtime = Runtime::new();
        runtime.mount(component(counter, ())).unwrap();

        assert_eq!(
            runtime.schedule_update(button(&runtime)),
            Err(EngineError::NotAComponent {
                node: button(&runtime)
            })
        );
    }

    #[test]
    fn test_unmount_releases_state() {
        let mut runtime = Runtime::new();
        runtime.mount(component(counter, ())).unwrap();
        let instance = runtime.tree().components()[0];

        let flush = runtime.unmount().unwrap();
        assert_eq!(flush.patch.kinds(), vec![OpKind::Delete]);
        assert!(runtime.tree().is_empty());
        assert_eq!(runtime.state::<i32>(instance, 0), None);
    }

    #[test]
    fn test_render_replaces_root() {
        let mut runtime = Runtime::new();
        runtime.mount(h("p").child(text("a"))).unwrap();

        let flush = runtime.render(h("p").child(text("b"))).unwrap();
        assert_eq!(flush.patch.kinds(), vec![OpKind::Update]);
        assert_eq!(runtime.tree().outline(), "<p>\n  \"b\"\n");
    }

    #[test]
    fn test_pending_signal_tracks_queue() {
        let mut runtime = Runtime::new();
        runtime.mount(component(counter, ())).unwrap();
        let pending = runtime.pending_updates();
        let instance = runtime.tree().components()[0];

        runtime.schedule_update(instance).unwrap();
        assert_eq!(pending.get(), 1);
        runtime.flush().unwrap();
        assert_eq!(pending.get(), 0);
    }
}
