//! State Store - Hook slots per component instance.
//!
//! Each instance owns an ordered list of slots. Slot N is created the first
//! time the instance's render reaches its Nth state declaration and resolves
//! to the stored value on every later render.
//!
//! Writes never happen in place. A [`Setter`] pushes an update onto the
//! shared [`UpdateQueue`]; the scheduler applies queued updates in call order
//! at the start of the next flush, so everything a handler observes stays
//! consistent until that flush completes.
//!
//! # Example
//!
//! ```ignore
//! fn counter(cx: &mut Scope<'_>, _props: &()) -> Element {
//!     let (count, set_count) = cx.use_state(0);
//!     h("button")
//!         .on("click", move || set_count.update(|c| c + 1))
//!         .child(format!("Clicked {count} times"))
//!         .into()
//! }
//! ```

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use slotmap::SecondaryMap;
use spark_signals::{signal, Signal};

use crate::error::{SlotFault, StateError};
use crate::types::NodeId;

// =============================================================================
// Update Queue
// =============================================================================

/// Deferred write to one state slot.
pub(crate) struct PendingUpdate {
    pub(crate) instance: NodeId,
    pub(crate) slot: usize,
    apply: Box<dyn FnOnce(&mut dyn Any) -> bool>,
}

/// Everything queued since the last flush.
#[derive(Default)]
pub(crate) struct Batch {
    pub(crate) updates: Vec<PendingUpdate>,
    pub(crate) forced: Vec<NodeId>,
}

/// Queue shared by setters and the scheduler.
///
/// The number of queued entries is mirrored into a signal so a host loop
/// can react to pending work.
#[derive(Clone)]
pub struct UpdateQueue {
    batch: Rc<RefCell<Batch>>,
    pending: Signal<usize>,
}

impl UpdateQueue {
    pub fn new() -> Self {
        Self {
            batch: Rc::new(RefCell::new(Batch::default())),
            pending: signal(0),
        }
    }

    fn push(&self, update: PendingUpdate) {
        let len = {
            let mut batch = self.batch.borrow_mut();
            batch.updates.push(update);
            batch.updates.len() + batch.forced.len()
        };
        self.pending.set(len);
    }

    /// Request a render of `instance` without a state change.
    pub fn schedule(&self, instance: NodeId) {
        let len = {
            let mut batch = self.batch.borrow_mut();
            batch.forced.push(instance);
            batch.updates.len() + batch.forced.len()
        };
        self.pending.set(len);
    }

    /// Number of queued entries.
    pub fn len(&self) -> usize {
        let batch = self.batch.borrow();
        batch.updates.len() + batch.forced.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reactive view of [`len`](Self::len).
    pub fn pending(&self) -> Signal<usize> {
        self.pending.clone()
    }

    /// Take everything queued so far. Entries queued afterwards belong to
    /// the next flush.
    pub(crate) fn take(&self) -> Batch {
        let batch = std::mem::take(&mut *self.batch.borrow_mut());
        self.pending.set(0);
        batch
    }
}

impl Default for UpdateQueue {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Setter
// =============================================================================

/// Update function returned by a state declaration.
///
/// Calls enqueue; the new value is visible from the next completed flush.
/// Setters of destroyed instances are inert.
pub struct Setter<T> {
    instance: NodeId,
    slot: usize,
    queue: UpdateQueue,
    _marker: PhantomData<fn(T)>,
}

impl<T: 'static> Setter<T> {
    fn new(instance: NodeId, slot: usize, queue: UpdateQueue) -> Self {
        Self {
            instance,
            slot,
            queue,
            _marker: PhantomData,
        }
    }

    /// Replace the value.
    pub fn set(&self, value: T) {
        self.enqueue(Box::new(move |stored: &mut dyn Any| {
            match stored.downcast_mut::<T>() {
                Some(slot) => {
                    *slot = value;
                    true
                }
                None => false,
            }
        }));
    }

    /// Derive the value from the previous one (applied in call order).
    pub fn update(&self, f: impl FnOnce(&T) -> T + 'static) {
        self.enqueue(Box::new(move |stored: &mut dyn Any| {
            match stored.downcast_mut::<T>() {
                Some(slot) => {
                    *slot = f(slot);
                    true
                }
                None => false,
            }
        }));
    }

    /// Instance that owns the slot.
    pub fn instance(&self) -> NodeId {
        self.instance
    }

    fn enqueue(&self, apply: Box<dyn FnOnce(&mut dyn Any) -> bool>) {
        self.queue.push(PendingUpdate {
            instance: self.instance,
            slot: self.slot,
            apply,
        });
    }
}

impl<T> Clone for Setter<T> {
    fn clone(&self) -> Self {
        Self {
            instance: self.instance,
            slot: self.slot,
            queue: self.queue.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Setter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setter")
            .field("instance", &self.instance)
            .field("slot", &self.slot)
            .finish()
    }
}

// =============================================================================
// State Store
// =============================================================================

struct Slot {
    value: Box<dyn Any>,
    type_name: &'static str,
}

#[derive(Default)]
struct SlotList {
    slots: Vec<Slot>,
    /// Slot count recorded by the first completed render.
    committed: Option<usize>,
}

struct ActiveRender {
    instance: NodeId,
    cursor: usize,
    fault: Option<SlotFault>,
}

/// Result of resolving the next slot of the active render.
pub(crate) enum Lookup<T> {
    Existing(T, Setter<T>),
    Vacant(usize),
}

/// Slot storage for every live component instance.
pub struct StateStore {
    lists: SecondaryMap<NodeId, SlotList>,
    active: Option<ActiveRender>,
    queue: UpdateQueue,
}

impl StateStore {
    pub fn new(queue: UpdateQueue) -> Self {
        Self {
            lists: SecondaryMap::new(),
            active: None,
            queue,
        }
    }

    /// Declare the next state slot of `instance`.
    ///
    /// Only valid while `instance` is being rendered; otherwise fails with
    /// [`StateError::IllegalStateAccess`]. `initial` runs only when the slot
    /// is allocated.
    pub fn declare<T: Clone + 'static>(
        &mut self,
        instance: NodeId,
        initial: impl FnOnce() -> T,
    ) -> Result<(T, Setter<T>), StateError> {
        match self.lookup::<T>(instance)? {
            Lookup::Existing(value, setter) => Ok((value, setter)),
            Lookup::Vacant(slot) => {
                let value = initial();
                Ok((value.clone(), self.allocate(instance, slot, value)?))
            }
        }
    }

    /// Resolve the next slot, advancing the cursor.
    pub(crate) fn lookup<T: Clone + 'static>(&mut self, instance: NodeId) -> Result<Lookup<T>, StateError> {
        let active = self
            .active
            .as_mut()
            .filter(|active| active.instance == instance)
            .ok_or(StateError::IllegalStateAccess { instance })?;
        let list = self
            .lists
            .get(instance)
            .ok_or(StateError::IllegalStateAccess { instance })?;

        let index = active.cursor;
        active.cursor += 1;

        let Some(slot) = list.slots.get(index) else {
            return Ok(Lookup::Vacant(index));
        };
        match slot.value.downcast_ref::<T>() {
            Some(value) => Ok(Lookup::Existing(
                value.clone(),
                Setter::new(instance, index, self.queue.clone()),
            )),
            None => {
                let detail = SlotFault::Type {
                    slot: index,
                    stored: slot.type_name,
                    declared: std::any::type_name::<T>(),
                };
                active.fault.get_or_insert(detail.clone());
                Err(StateError::StateSlotMismatch { instance, detail })
            }
        }
    }

    /// Store the initial value of a vacant slot.
    pub(crate) fn allocate<T: 'static>(
        &mut self,
        instance: NodeId,
        slot: usize,
        value: T,
    ) -> Result<Setter<T>, StateError> {
        let list = self
            .lists
            .get_mut(instance)
            .ok_or(StateError::IllegalStateAccess { instance })?;
        debug_assert_eq!(list.slots.len(), slot);
        list.slots.push(Slot {
            value: Box::new(value),
            type_name: std::any::type_name::<T>(),
        });
        Ok(Setter::new(instance, slot, self.queue.clone()))
    }

    /// A setter that targets `slot` without touching the store.
    pub(crate) fn detached_setter<T: 'static>(&self, instance: NodeId, slot: usize) -> Setter<T> {
        Setter::new(instance, slot, self.queue.clone())
    }

    /// Position the cursor at slot 0 of `instance`.
    pub(crate) fn begin_render(&mut self, instance: NodeId) {
        if !self.lists.contains_key(instance) {
            self.lists.insert(instance, SlotList::default());
        }
        self.active = Some(ActiveRender {
            instance,
            cursor: 0,
            fault: None,
        });
    }

    /// Close the active render and check the slot count.
    ///
    /// The first completed render fixes the count; later renders must match.
    pub(crate) fn finish_render(&mut self, instance: NodeId) -> Result<usize, StateError> {
        let active = self
            .active
            .take()
            .filter(|active| active.instance == instance)
            .ok_or(StateError::IllegalStateAccess { instance })?;
        if let Some(detail) = active.fault {
            return Err(StateError::StateSlotMismatch { instance, detail });
        }
        let list = self
            .lists
            .get_mut(instance)
            .ok_or(StateError::IllegalStateAccess { instance })?;
        match list.committed {
            Some(expected) if expected != active.cursor => Err(StateError::StateSlotMismatch {
                instance,
                detail: SlotFault::Count {
                    expected,
                    found: active.cursor,
                },
            }),
            _ => {
                list.committed = Some(active.cursor);
                Ok(active.cursor)
            }
        }
    }

    /// Apply one queued update. Returns false if the slot is gone or the
    /// update no longer fits it.
    pub(crate) fn apply(&mut self, update: PendingUpdate) -> bool {
        let Some(slot) = self
            .lists
            .get_mut(update.instance)
            .and_then(|list| list.slots.get_mut(update.slot))
        else {
            return false;
        };
        (update.apply)(slot.value.as_mut())
    }

    /// Drop all slots of a destroyed instance.
    pub(crate) fn release(&mut self, instance: NodeId) {
        self.lists.remove(instance);
        if self.active.as_ref().is_some_and(|active| active.instance == instance) {
            self.active = None;
        }
    }

    /// Current value of a slot.
    pub fn get<T: Clone + 'static>(&self, instance: NodeId, slot: usize) -> Option<T> {
        self.lists
            .get(instance)?
            .slots
            .get(slot)?
            .value
            .downcast_ref::<T>()
            .cloned()
    }

    /// Slot count fixed by the instance's first render.
    pub fn slot_count(&self, instance: NodeId) -> Option<usize> {
        self.lists.get(instance)?.committed
    }

    /// Instance currently being rendered, if any.
    pub fn rendering(&self) -> Option<NodeId> {
        self.active.as_ref().map(|active| active.instance)
    }
}

// =============================================================================
// Tests
// =============================================================================
