//! Pure markup builders for the card components.
//!
//! Nothing here touches a document: every function maps configuration plus
//! current values (and errors) to [`Markup`]. Structured fields are emitted
//! as a tagged wrapper around a native control, which is what
//! [`FieldManager`](super::FieldManager) looks for.

pub mod display;
pub mod form;
pub mod grid;
pub mod list;

use super::{ACTION_ATTR, ID_ATTR};
use crate::dom::{el, El};

/// A `<button type=button>` dispatching `action` (optionally for item `id`)
pub fn action_button(action: &str, id: Option<&str>, label: &str, class: &str) -> El {
    el("button")
        .attr("type", "button")
        .class("btn")
        .class(class)
        .attr(ACTION_ATTR, action)
        .attr_opt(ID_ATTR, id)
        .attr("title", label)
        .text(label)
}

/// Decorative icon span (icon font class `icon-{name}`)
pub fn icon(name: &str) -> El {
    el("span")
        .class("icon")
        .class(&format!("icon-{}", name))
        .attr("aria-hidden", "true")
}

/// Empty-state block shared by lists, grids and displays
pub fn empty_state(icon_name: &str, message: &str) -> El {
    el("div")
        .class("empty-state")
        .child(icon(icon_name))
        .child(el("p").class("empty-message").text(message))
}
