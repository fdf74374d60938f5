//! Render Engine - Runs a component with an explicit render context.
//!
//! [`Scope`] is the handle a component receives. It binds state
//! declarations to the instance being rendered; there is no ambient
//! "current component".

use crate::error::StateError;
use crate::primitives::{Element, RenderFn};
use crate::types::NodeId;
use super::state::{Lookup, Setter, StateStore, UpdateQueue};

/// Render context of one component instance.
pub struct Scope<'a> {
    store: &'a mut StateStore,
    queue: &'a UpdateQueue,
    instance: NodeId,
}

impl<'a> Scope<'a> {
    /// Instance being rendered.
    pub fn instance(&self) -> NodeId {
        self.instance
    }

    /// Declare a state slot; `initial` is only used on the first render.
    ///
    /// Returns the current value and its setter.
    pub fn use_state<T: Clone + 'static>(&mut self, initial: T) -> (T, Setter<T>) {
        self.use_state_with(move || initial)
    }

    /// Like [`use_state`](Self::use_state) with a lazily computed initial value.
    ///
    /// Declarations must happen in the same order and count on every
    /// render. A violation is recorded and the instance is torn down once
    /// the render returns; until then the initial value stands in.
    pub fn use_state_with<T: Clone + 'static>(&mut self, initial: impl FnOnce() -> T) -> (T, Setter<T>) {
        match self.store.lookup::<T>(self.instance) {
            Ok(Lookup::Existing(value, setter)) => (value, setter),
            Ok(Lookup::Vacant(slot)) => {
                let value = initial();
                match self.store.allocate(self.instance, slot, value.clone()) {
                    Ok(setter) => (value, setter),
                    Err(_) => (value, self.store.detached_setter(self.instance, slot)),
                }
            }
            Err(err) => {
                tracing::debug!(instance = ?self.instance, %err, "state declaration rejected");
                (initial(), self.store.detached_setter(self.instance, usize::MAX))
            }
        }
    }

    /// Ask for another render of this instance in the next flush.
    pub fn schedule_update(&self) {
        self.queue.schedule(self.instance);
    }
}

/// Render `instance` with its bound render callback.
///
/// Resets the slot cursor, runs the component and checks the slot count
/// against earlier renders.
pub(crate) fn render_instance(
    store: &mut StateStore,
    queue: &UpdateQueue,
    instance: NodeId,
    render: &RenderFn,
) -> Result<Element, StateError> {
    store.begin_render(instance);
    let output = {
        let mut scope = Scope {
            store: &mut *store,
            queue,
            instance,
        };
        render(&mut scope)
    };
    store.finish_render(instance)?;
    Ok(output)
}

// =============================================================================
// Tests
// =============================================================================
