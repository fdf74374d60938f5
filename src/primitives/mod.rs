//! Primitives - Descriptor building blocks.
//!
//! This module provides the values component render functions return:
//! - [`h`] - host element builder (`h("ul").list(..)`)
//! - [`text`] - text leaf
//! - [`component`] - reference to a component function with props
//! - [`show`], [`when`], [`each`] - conditional and keyed list helpers
//!
//! # Architecture
//!
//! Descriptors are plain data. They never own state; state lives on the
//! component instance the reconciler matches them to. The same descriptor
//! rendered twice at the same position reaches the same instance.

mod types;
mod host;
mod text;
mod component;
mod control_flow;

pub use types::*;
pub use host::h;
pub use text::text;
pub use component::component;
pub use control_flow::{each, show, when, Keyable};
