//! Config-driven card components: lists, grids, forms and displays
//!
//! Templates produce markup tagged with the attributes below; components
//! instantiate it into a [`Document`] and hand the subtree to a
//! [`FieldManager`] which upgrades structured fields into live widgets.
//! Events enter through each component's `handle_action` / `handle_input`.

pub mod display;
pub mod field;
pub mod field_manager;
pub mod form;
pub mod grid;
pub mod list;
pub mod templates;
pub mod validation;
pub mod widgets;

pub use display::{CardDisplay, DisplayConfig, DisplayMode};
pub use field::{FieldSpec, FieldType, Section, SelectOption};
pub use field_manager::FieldManager;
pub use form::{CardForm, FormConfig, FormMode, SubmitOutcome};
pub use grid::{CardGrid, GridConfig, SelectionMode};
pub use list::{CardList, ListConfig, ListOperation, ListOutcome};
pub use validation::{FieldErrors, Rules, ValidationError, Validator, ValidatorSpec};

use futures::future::LocalBoxFuture;
use serde_json::{Map, Number, Value};

use crate::dom::{Document, FormData, NodeId};
use crate::error::SubmitError;

// ============================================================================
// Tagging contract between templates, widgets and components
// ============================================================================

/// Structured field wrapper: the widget type name
pub const FIELD_TYPE_ATTR: &str = "data-field-type";
/// Structured field wrapper: the field name
pub const FIELD_NAME_ATTR: &str = "data-field-name";
/// Set on a control once a widget owns it
pub const WIDGET_INIT_ATTR: &str = "data-widget-initialized";
/// Chrome buttons handled by the owning widget
pub const WIDGET_ACTION_ATTR: &str = "data-widget-action";
/// A label + control + error + help block, keyed by field name
pub const FIELD_GROUP_ATTR: &str = "data-field-group";
/// Error slot for a field name (or `_form`)
pub const ERROR_FOR_ATTR: &str = "data-error-for";
/// Component-level actions (`edit`, `save`, `select`...)
pub const ACTION_ATTR: &str = "data-action";
/// Item targeted by an action
pub const ID_ATTR: &str = "data-id";
/// Root node of a rendered item
pub const ITEM_ID_ATTR: &str = "data-item-id";
/// Section container, keyed by section id
pub const SECTION_ATTR: &str = "data-section";
/// Semantic role of a text node inside a card (`title`, `subtitle`...)
pub const ROLE_ATTR: &str = "data-role";

// ============================================================================
// Items
// ============================================================================

/// An opaque record: field name -> value
pub type Item = Map<String, Value>;

/// Called with an item after a local mutation
pub type ItemCallback = Box<dyn FnMut(&Item)>;

/// Called with a user-facing error message
pub type ErrorCallback = Box<dyn FnMut(&str)>;

/// Blocking confirmation prompt for destructive actions
pub type ConfirmPrompt = Box<dyn FnMut(&str) -> bool>;

/// Caller-supplied asynchronous persistence hook
pub type AsyncHook<A> = Box<dyn Fn(A, Item) -> LocalBoxFuture<'static, Result<(), SubmitError>>>;

/// The `id` of an item as a string (numbers are stringified)
pub fn item_id(item: &Item) -> Option<String> {
    match item.get("id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A fresh random id
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Assign a generated id if the item has none. Returns the id.
pub fn ensure_id(item: &mut Item) -> String {
    match item_id(item) {
        Some(id) => id,
        None => {
            let id = generate_id();
            item.insert("id".to_string(), Value::String(id.clone()));
            id
        }
    }
}

/// Text form of a value for inputs and attributes
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(value_to_string).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}

/// Falsy: null, false, 0, empty string, empty list
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(_) => true,
    }
}

/// Wait out an animation delay; zero delays return immediately
pub(crate) async fn pause(delay: std::time::Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

fn number_value(f: f64) -> Value {
    if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Value::Number(Number::from(f as i64))
    } else {
        Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
    }
}

// ============================================================================
// Form plumbing shared by CardForm and CardList
// ============================================================================

/// Read the values of `fields` from a rendered `<form>`.
///
/// Checkboxes always yield a boolean (an unchecked box is `false`, never
/// absent), multi-selects and checkbox groups yield arrays, numeric kinds
/// yield numbers when they parse, and structured fields report their
/// widget's value.
pub fn extract_form_values(doc: &Document, form: NodeId, fields: &[FieldSpec], widgets: Option<&FieldManager>) -> Item {
    let data = FormData::from_form(doc, form);
    let mut values = Item::new();
    for field in fields {
        let name = field.name.as_str();
        if field.field_type.widget_type().is_some() {
            if let Some(value) = widgets.and_then(|m| m.value_for_field(doc, name)) {
                values.insert(name.to_string(), value);
                continue;
            }
        }
        let value = match field.field_type {
            FieldType::Checkbox | FieldType::Boolean if field.options.is_empty() => Value::Bool(data.contains(name)),
            FieldType::Checkbox => Value::Array(data.get_all(name).iter().cloned().map(Value::String).collect()),
            FieldType::Select if field.multiple => {
                Value::Array(data.get_all(name).iter().cloned().map(Value::String).collect())
            }
            FieldType::Radio => data.get(name).map(|v| Value::String(v.to_string())).unwrap_or(Value::Null),
            FieldType::Number | FieldType::Currency => match data.get(name).map(str::trim) {
                None => continue,
                Some("") => Value::Null,
                Some(raw) => crate::format::value_as_f64(&Value::String(raw.to_string()))
                    .map(number_value)
                    .unwrap_or_else(|| Value::String(raw.to_string())),
            },
            _ => match data.get(name) {
                Some(v) => Value::String(v.to_string()),
                None => continue,
            },
        };
        values.insert(name.to_string(), value);
    }
    values
}

/// Write `data` into the controls of a rendered form
pub fn populate_form(
    doc: &mut Document,
    form: NodeId,
    fields: &[FieldSpec],
    data: &Item,
    mut widgets: Option<&mut FieldManager>,
) {
    for field in fields {
        let value = match data.get(&field.name) {
            Some(v) => v,
            None => continue,
        };
        if field.field_type.widget_type().is_some() {
            if let Some(manager) = widgets.as_deref_mut() {
                if manager.set_field_value(doc, &field.name, value) {
                    continue;
                }
            }
        }
        let controls = doc.find_by_attr(form, "name", Some(&field.name));
        for control in controls {
            let (tag, input_type) = match doc.element(control) {
                Some(e) => (e.tag.clone(), e.input_type()),
                None => continue,
            };
            let own_value = doc.value(control).filter(|v| !v.is_empty());
            match (tag.as_str(), input_type.as_str()) {
                ("input", "checkbox") => {
                    let on = match (value, own_value) {
                        (Value::Array(items), Some(v)) => items.iter().any(|i| value_to_string(i) == v),
                        (other, _) => is_truthy(other),
                    };
                    doc.set_checked(control, on);
                }
                ("input", "radio") => {
                    let on = doc.value(control).as_deref() == Some(value_to_string(value).as_str());
                    doc.set_checked(control, on);
                }
                ("input", "file") => {}
                ("select", _) if doc.has_attr(control, "multiple") => {
                    let selected: Vec<String> = match value {
                        Value::Array(items) => items.iter().map(value_to_string).collect(),
                        other => vec![value_to_string(other)],
                    };
                    doc.set_selected_values(control, &selected);
                }
                _ => doc.set_value(control, &value_to_string(value)),
            }
        }
    }
}

/// Show `errors` inside `scope`: `has-error` on field groups and message
/// text plus `visible` on error slots. Clears stale errors.
pub fn apply_errors(doc: &mut Document, scope: NodeId, errors: &FieldErrors) {
    for group in doc.find_by_attr(scope, FIELD_GROUP_ATTR, None) {
        let failed = doc.attr(group, FIELD_GROUP_ATTR).map(|n| errors.contains(n)).unwrap_or(false);
        doc.toggle_class(group, "has-error", failed);
    }
    for slot in doc.find_by_attr(scope, ERROR_FOR_ATTR, None) {
        let message = doc
            .attr(slot, ERROR_FOR_ATTR)
            .and_then(|n| errors.get(n))
            .map(String::from);
        doc.set_text(slot, message.as_deref().unwrap_or(""));
        doc.toggle_class(slot, "visible", message.is_some());
    }
}

fn is_focusable(doc: &Document, node: NodeId) -> bool {
    match doc.element(node) {
        Some(e) => {
            e.is_form_control()
                && e.attr("disabled").is_none()
                && !matches!(e.input_type().as_str(), "hidden" | "file")
                && !doc.is_hidden(node)
        }
        None => false,
    }
}

/// Focus the first editable control inside `scope`
pub fn focus_first_field(doc: &mut Document, scope: NodeId) -> Option<NodeId> {
    let target = doc.find_first(scope, |id, _| is_focusable(doc, id))?;
    doc.focus(target);
    Some(target)
}

/// Focus the first control of the first field with an error
pub fn focus_first_error(doc: &mut Document, scope: NodeId, errors: &FieldErrors) -> Option<NodeId> {
    let name = errors.field_names().next()?.to_string();
    let group = doc.find_first_by_attr(scope, FIELD_GROUP_ATTR, &name)?;
    let target = doc.find_first(group, |id, _| is_focusable(doc, id))?;
    doc.focus(target);
    Some(target)
}

/// The clicked node's action and target id, from it or its closest
/// actionable ancestor
pub fn action_target(doc: &Document, node: NodeId) -> Option<(String, Option<String>, NodeId)> {
    let actionable = doc.closest_with_attr(node, ACTION_ATTR)?;
    let action = doc.attr(actionable, ACTION_ATTR)?.to_string();
    let id = doc
        .attr(actionable, ID_ATTR)
        .map(String::from)
        .or_else(|| {
            doc.closest_with_attr(actionable, ITEM_ID_ATTR)
                .and_then(|n| doc.attr(n, ITEM_ID_ATTR))
                .map(String::from)
        });
    Some((action, id, actionable))
}
