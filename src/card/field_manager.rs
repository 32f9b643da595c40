//! Upgrades tagged markup into live widgets and tears them down again.
//!
//! One manager is owned per rendered scope (a form, a list item, a
//! display). Widgets are tracked by the id of the element they were mounted
//! on, so re-scanning an unchanged subtree never mounts twice.

use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::rc::Rc;
use tracing::{debug, error, warn};

use super::widgets::{wrapper_of, FieldWidget, WidgetRegistry, CHARACTER_COUNTER};
use super::{FIELD_NAME_ATTR, FIELD_TYPE_ATTR, WIDGET_ACTION_ATTR, WIDGET_INIT_ATTR};
use crate::dom::{Document, NodeId};

const FIELD_TYPE_CLASS_PREFIX: &str = "field-type-";

struct Tracked {
    widget: Box<dyn FieldWidget>,
    element: NodeId,
    kind: String,
    field_name: Option<String>,
}

pub struct FieldManager {
    scope: NodeId,
    registry: Rc<WidgetRegistry>,
    instances: IndexMap<String, Tracked>,
}

/// Declared widget type of a marker element: `data-field-type`, or a
/// `field-type-*` class
pub fn detect_field_type(doc: &Document, node: NodeId) -> Option<String> {
    let element = doc.element(node)?;
    if let Some(kind) = element.attr(FIELD_TYPE_ATTR).filter(|k| !k.is_empty()) {
        return Some(kind.to_string());
    }
    element
        .classes()
        .iter()
        .find_map(|c| c.strip_prefix(FIELD_TYPE_CLASS_PREFIX))
        .filter(|k| !k.is_empty())
        .map(String::from)
}

/// The control a widget mounts on: the marker itself if it is a control,
/// otherwise its first inner input/textarea/select
fn mount_target(doc: &Document, marker: NodeId) -> Option<NodeId> {
    if doc.element(marker)?.is_form_control() {
        return Some(marker);
    }
    doc.find_first(marker, |_, e| e.is_form_control())
}

impl FieldManager {
    pub fn new(scope: NodeId, registry: Rc<WidgetRegistry>) -> Self {
        Self {
            scope,
            registry,
            instances: IndexMap::new(),
        }
    }

    pub fn scope(&self) -> NodeId {
        self.scope
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Type names of the tracked widgets, in mount order
    pub fn kinds(&self) -> Vec<&str> {
        self.instances.values().map(|t| t.kind.as_str()).collect()
    }

    pub fn is_tracked(&self, element_id: &str) -> bool {
        self.instances.contains_key(element_id)
    }

    /// Scan the scope and mount a widget on every untracked structured
    /// field, then attach character counters to plain length-limited text
    /// controls. Returns how many widgets were mounted by this call.
    ///
    /// A failing widget is logged and skipped; its control stays a plain
    /// native control.
    pub fn auto_init_fields(&mut self, doc: &mut Document) -> usize {
        if !doc.is_attached(self.scope) {
            warn!(scope = ?self.scope, "field scope is not attached, skipping widget init");
            return 0;
        }
        let mut mounted = 0;

        let markers = doc.find_all(self.scope, |id, _| detect_field_type(doc, id).is_some());
        for marker in markers {
            let kind = match detect_field_type(doc, marker) {
                Some(k) => k,
                None => continue,
            };
            let target = match mount_target(doc, marker) {
                Some(t) => t,
                None => {
                    warn!(field_type = %kind, "structured field has no inner control");
                    continue;
                }
            };
            let field_name = doc
                .attr(marker, FIELD_NAME_ATTR)
                .or_else(|| doc.attr(target, "name"))
                .map(String::from);
            if self.mount(doc, target, &kind, field_name) {
                mounted += 1;
            }
        }

        if self.registry.contains(CHARACTER_COUNTER) {
            let candidates = doc.find_all(self.scope, |id, e| {
                let text_like = e.tag == "textarea" || (e.tag == "input" && e.input_type() == "text");
                text_like
                    && e.attr("maxlength").is_some()
                    && e.attr(WIDGET_INIT_ATTR).is_none()
                    && doc.closest_with_attr(id, FIELD_TYPE_ATTR).is_none()
            });
            for target in candidates {
                let field_name = doc.attr(target, "name").map(String::from);
                if self.mount(doc, target, CHARACTER_COUNTER, field_name) {
                    mounted += 1;
                }
            }
        }

        if mounted > 0 {
            debug!(mounted, total = self.instances.len(), "widgets initialized");
        }
        mounted
    }

    fn mount(&mut self, doc: &mut Document, target: NodeId, kind: &str, field_name: Option<String>) -> bool {
        let element_id = match doc.attr(target, "id") {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                let id = doc.generate_id("field");
                doc.set_attr(target, "id", &id);
                id
            }
        };
        if self.instances.contains_key(&element_id) {
            return false;
        }
        if doc.has_attr(target, WIDGET_INIT_ATTR) {
            debug!(element = %element_id, "element already owns a widget");
            return false;
        }
        let mut widget = match self.registry.create(kind, &Map::new()) {
            Ok(w) => w,
            Err(e) => {
                error!(field_type = kind, field = ?field_name, error = %e, "cannot create widget");
                return false;
            }
        };
        if let Err(e) = widget.mount(doc, target) {
            error!(field_type = kind, field = ?field_name, error = %e, "widget failed to mount");
            return false;
        }
        self.instances.insert(
            element_id,
            Tracked {
                widget,
                element: target,
                kind: kind.to_string(),
                field_name,
            },
        );
        true
    }

    /// Destroy every tracked widget. Safe after the scope was removed.
    pub fn destroy_all(&mut self, doc: &mut Document) {
        let count = self.instances.len();
        for (_, mut tracked) in self.instances.drain(..) {
            tracked.widget.destroy(doc);
        }
        if count > 0 {
            debug!(count, "widgets destroyed");
        }
    }

    fn field_widget(&self, name: &str) -> Option<&Tracked> {
        self.instances
            .values()
            .find(|t| t.kind != CHARACTER_COUNTER && t.field_name.as_deref() == Some(name))
    }

    /// Value reported by the widget of field `name`
    pub fn value_for_field(&self, doc: &Document, name: &str) -> Option<Value> {
        self.field_widget(name).map(|t| t.widget.value(doc))
    }

    /// Push a value into the widget of field `name` (and any counter on the
    /// same field). Returns false if no widget owns the field.
    pub fn set_field_value(&mut self, doc: &mut Document, name: &str, value: &Value) -> bool {
        let mut handled = false;
        for tracked in self.instances.values_mut() {
            if tracked.field_name.as_deref() == Some(name) {
                tracked.widget.set_value(doc, value);
                handled = true;
            }
        }
        handled
    }

    /// Forward an input event on `node` to the widgets that own it
    pub fn notify_input(&mut self, doc: &mut Document, node: NodeId) {
        for tracked in self.instances.values_mut() {
            if tracked.element == node {
                tracked.widget.on_input(doc);
            }
        }
    }

    /// Route a click on widget chrome to the widget whose wrapper contains
    /// it. Returns true if a widget handled it.
    pub fn dispatch_action(&mut self, doc: &mut Document, node: NodeId) -> bool {
        let actionable = match doc.closest_with_attr(node, WIDGET_ACTION_ATTR) {
            Some(a) => a,
            None => return false,
        };
        let action = match doc.attr(actionable, WIDGET_ACTION_ATTR) {
            Some(a) => a.to_string(),
            None => return false,
        };
        for tracked in self.instances.values_mut() {
            let owns = wrapper_of(doc, tracked.element)
                .map(|w| doc.contains(w, actionable))
                .unwrap_or(false);
            if owns && tracked.widget.on_action(doc, &action, actionable) {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::templates::form::field_group;
    use crate::card::{FieldSpec, FieldType};
    use crate::dom::{el, fragment, Markup};
    use crate::settings::Settings;
    use serde_json::json;

    fn registry() -> Rc<WidgetRegistry> {
        Rc::new(WidgetRegistry::with_builtins(&Settings::default()))
    }

    fn render(doc: &mut Document, markup: Markup) -> NodeId {
        let c = doc.create_container("scope");
        doc.set_content(c, &markup);
        c
    }

    fn sample_fields() -> Markup {
        fragment(vec![
            field_group(&FieldSpec::new("headline", FieldType::EmojiText), &Value::Null, None),
            field_group(&FieldSpec::new("color", FieldType::ColorPicker), &json!("#123456"), None),
            field_group(&FieldSpec::new("summary", FieldType::Textarea).with_max_length(280), &Value::Null, None),
            field_group(&FieldSpec::text("plain"), &Value::Null, None),
        ])
    }

    #[test]
    fn test_auto_init_is_idempotent() {
        let mut doc = Document::new();
        let scope = render(&mut doc, sample_fields());
        let mut manager = FieldManager::new(scope, registry());
        assert_eq!(manager.auto_init_fields(&mut doc), 3);
        assert_eq!(manager.len(), 3);
        assert_eq!(manager.auto_init_fields(&mut doc), 0);
        assert_eq!(manager.len(), 3);
        assert_eq!(manager.kinds(), vec!["emoji-text", "color-picker", CHARACTER_COUNTER]);
    }

    #[test]
    fn test_second_manager_respects_widget_marker() {
        let mut doc = Document::new();
        let scope = render(&mut doc, sample_fields());
        let mut first = FieldManager::new(scope, registry());
        first.auto_init_fields(&mut doc);
        let mut second = FieldManager::new(scope, registry());
        assert_eq!(second.auto_init_fields(&mut doc), 0);
    }

    #[test]
    fn test_class_marker_and_unknown_type() {
        let mut doc = Document::new();
        let scope = render(
            &mut doc,
            fragment(vec![
                el("div").class("field-type-color").child(el("input").attr("name", "accent")).into(),
                el("div").attr(FIELD_TYPE_ATTR, "hologram").child(el("input").attr("name", "x")).into(),
            ]),
        );
        let mut manager = FieldManager::new(scope, registry());
        // The unknown type is logged and skipped, the other still mounts
        assert_eq!(manager.auto_init_fields(&mut doc), 1);
        assert_eq!(manager.value_for_field(&doc, "accent"), Some(Value::Null));
        assert!(manager.set_field_value(&mut doc, "accent", &json!("#abc")));
        assert_eq!(manager.value_for_field(&doc, "accent"), Some(json!("#aabbcc")));
    }

    #[test]
    fn test_failing_widget_does_not_block_siblings() {
        let mut doc = Document::new();
        let scope = render(&mut doc, sample_fields());
        let mut settings = Settings::default();
        settings.fonts.clear();
        let registry = Rc::new(WidgetRegistry::with_builtins(&settings));
        doc.append_markup(
            scope,
            &field_group(&FieldSpec::new("font", FieldType::FontSelector), &Value::Null, None),
        );
        let mut manager = FieldManager::new(scope, registry);
        assert_eq!(manager.auto_init_fields(&mut doc), 3);
        assert!(!manager.kinds().contains(&"font-selector"));
    }

    #[test]
    fn test_destroy_all_after_removal() {
        let mut doc = Document::new();
        let scope = render(&mut doc, sample_fields());
        let mut manager = FieldManager::new(scope, registry());
        manager.auto_init_fields(&mut doc);
        doc.clear_children(scope);
        manager.destroy_all(&mut doc);
        assert!(manager.is_empty());
        assert_eq!(manager.auto_init_fields(&mut doc), 0);
    }

    #[test]
    fn test_detached_scope_is_skipped() {
        let mut doc = Document::new();
        let scope = render(&mut doc, sample_fields());
        doc.remove(scope);
        let mut manager = FieldManager::new(scope, registry());
        assert_eq!(manager.auto_init_fields(&mut doc), 0);
    }

    #[test]
    fn test_dispatch_action_reaches_owning_widget() {
        let mut doc = Document::new();
        let scope = render(&mut doc, sample_fields());
        let mut manager = FieldManager::new(scope, registry());
        manager.auto_init_fields(&mut doc);
        let option = doc.find_first_by_attr(scope, "data-emoji", "🎉").unwrap();
        assert!(manager.dispatch_action(&mut doc, option));
        assert_eq!(manager.value_for_field(&doc, "headline"), Some(json!("🎉")));
    }
}
