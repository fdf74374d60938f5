//! # spark-fiber
//!
//! Component instances, hook state and keyed reconciliation for declarative UIs.
//!
//! Built on [spark-signals](https://github.com/RLabs-Inc/spark-signals); the
//! update queue publishes its pending count as a signal.
//!
//! ## Architecture
//!
//! Components are plain functions `Fn(&mut Scope, &Props) -> Element`. The
//! engine keeps one persistent instance per matched position or key, owns
//! its state slots, and turns every flush into an ordered edit script:
//! ```text
//! event handler → Setter → UpdateQueue → Runtime::flush → render → reconcile → Patch
//! ```
//! The presentation layer only ever sees the [`Patch`]; [`host::HostTree`]
//! is a reference consumer.
//!
//! ## Example
//!
//! ```ignore
//! use spark_fiber::{component, h, Element, Runtime, Scope};
//!
//! fn counter(cx: &mut Scope<'_>, _props: &()) -> Element {
//!     let (count, set_count) = cx.use_state(0);
//!     h("button")
//!         .on("click", move || set_count.update(|c| c + 1))
//!         .child(format!("Clicked {count} times"))
//!         .into()
//! }
//!
//! let mut runtime = Runtime::new();
//! let flush = runtime.mount(component(counter, ()))?;
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Core types (NodeId, Key, AttrValue, NodeFlags)
//! - [`primitives`] - Element descriptors and builders
//! - [`engine`] - Instance tree, state store, reconciler, runtime
//! - [`patch`] - Edit script emitted per flush
//! - [`host`] - Patch-driven host tree and terminal renderer

pub mod config;
pub mod engine;
pub mod error;
pub mod host;
pub mod patch;
pub mod primitives;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use config::{MissingKeyPolicy, RuntimeConfig};

pub use engine::{Flush, InstanceTree, Node, NodeKind, Runtime, Scope, Setter};

pub use error::{EngineError, HostError, ReconcileError, SlotFault, StateError, Warning};

pub use patch::{AttrDiff, NodeChange, NodePayload, OpKind, Patch, PatchOp};

pub use primitives::{
    component, each, h, show, text, when, ComponentElement, ComponentType, Element, HostElement,
};
