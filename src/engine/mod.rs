//! Fiber Engine - Instances, hook state, reconciliation and scheduling.
//!
//! The engine manages the persistent side of rendering:
//! - Tree: arena of host, text and component nodes with stable ids
//! - State: hook slots per component instance and the update queue
//! - Render: the explicit render context handed to components
//! - Reconcile: keyed diff of new descriptors against the tree
//! - Scheduler: `Runtime`, which batches updates into flushes
//!
//! # Architecture
//!
//! ```text
//! setter.update(..) ──► UpdateQueue ──► Runtime::flush
//!                                          │
//!                        apply updates ◄───┤
//!                        render dirty  ◄───┤  (Scope → StateStore)
//!                        reconcile     ◄───┘  (InstanceTree → Patch)
//! ```
//!
//! Components are never called outside a flush, so state can only be read
//! through a [`Scope`] while its instance renders.

mod tree;
mod state;
mod render;
mod reconcile;
mod scheduler;

pub use tree::*;
pub use state::{Setter, StateStore, UpdateQueue};
pub use render::Scope;
pub use scheduler::{Flush, Runtime};
