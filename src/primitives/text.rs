//! Text Primitive - Text leaf descriptors.
//!
//! Text cannot have children or a key. Inside a sibling group it is matched
//! by position, and a content change becomes an `update` with the new text.

use super::types::Element;

/// Create a text descriptor.
pub fn text(content: impl Into<String>) -> Element {
    Element::Text(content.into())
}
