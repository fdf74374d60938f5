//! Component Primitive - Descriptors that reference a component function.
//!
//! A component is any `Fn(&mut Scope, &Props) -> Element`. The scope is the
//! explicit render context; state hooks are declared through it.
//!
//! # Example
//!
//! ```ignore
//! use spark_fiber::{component, h, Element, Scope};
//!
//! fn my_button(cx: &mut Scope<'_>, _props: &()) -> Element {
//!     let (count, set_count) = cx.use_state(0);
//!     h("button")
//!         .on("click", move || set_count.update(|c| c + 1))
//!         .child(format!("Clicked {count} times"))
//!         .into()
//! }
//!
//! let app = h("div").child(component(my_button, ())).child(component(my_button, ()));
//! ```

use std::any::Any;
use std::rc::Rc;

use crate::engine::Scope;
use super::types::{AnyProps, ComponentElement, ComponentType, Element, RenderFn};

/// Create a component descriptor from a render function and its props.
///
/// The function's type is the component's identity; a function pointer is
/// identified by its target. A capturing closure is re-rendered on every
/// pass that reaches it, even with equal props.
pub fn component<F, P>(render: F, props: P) -> ComponentElement
where
    F: Fn(&mut Scope<'_>, &P) -> Element + 'static,
    P: PartialEq + 'static,
{
    let ty = match (&render as &dyn Any).downcast_ref::<fn(&mut Scope<'_>, &P) -> Element>() {
        Some(pointer) => ComponentType::pointer::<F>(*pointer as usize),
        None => ComponentType::of::<F>(),
    };
    let props = Rc::new(props);
    let bound = props.clone();

    ComponentElement {
        ty,
        props: props as Rc<dyn AnyProps>,
        render: bind(move |cx| render(cx, &bound)),
        key: None,
    }
}

// Pins the closure signature to the higher-ranked `Scope<'_>` form.
fn bind(f: impl Fn(&mut Scope<'_>) -> Element + 'static) -> RenderFn {
    Rc::new(f)
}

// =============================================================================
// Tests
// =============================================================================
