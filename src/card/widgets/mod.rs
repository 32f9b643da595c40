//! Interactive widgets attached to structured fields
//!
//! A widget is mounted on the native control that a template emitted inside
//! a tagged wrapper. It may add its own chrome next to the control, keeps
//! whatever state it needs, and reports the field value in its own terms
//! (a file widget reports a list of names, a color widget a normalized hex).

mod color;
mod counter;
mod emoji;
mod file;
mod font;
mod markdown;

pub use color::{normalize_hex, ColorPicker};
pub use counter::CharacterCounter;
pub use emoji::EmojiText;
pub use file::FileUpload;
pub use font::FontSelector;
pub use markdown::{render_markdown, MarkdownEditor};

use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::rc::Rc;
use tracing::debug;

use super::{FIELD_TYPE_ATTR, WIDGET_INIT_ATTR};
use crate::dom::{Document, Markup, NodeId};
use crate::error::WidgetError;
use crate::settings::Settings;

/// Options handed to a widget factory (registration defaults)
pub type WidgetOptions = Map<String, Value>;

/// Builds a fresh, unmounted widget
pub type WidgetFactory = Rc<dyn Fn(&WidgetOptions) -> Result<Box<dyn FieldWidget>, WidgetError>>;

/// Type name of the character counter attached to plain length-limited inputs
pub const CHARACTER_COUNTER: &str = "character-counter";

/// Live behavior behind a structured field
pub trait FieldWidget {
    /// Registered type name
    fn kind(&self) -> &'static str;

    /// Attach to `element`, which must be attached to the document
    fn mount(&mut self, doc: &mut Document, element: NodeId) -> Result<(), WidgetError>;

    /// Remove chrome and the init marker. Must tolerate a detached element.
    fn destroy(&mut self, doc: &mut Document);

    fn value(&self, doc: &Document) -> Value;

    fn set_value(&mut self, doc: &mut Document, value: &Value);

    /// The user typed into the control
    fn on_input(&mut self, _doc: &mut Document) {}

    /// A chrome button carrying `data-widget-action` was clicked.
    /// Returns true if the action was handled.
    fn on_action(&mut self, _doc: &mut Document, _action: &str, _node: NodeId) -> bool {
        false
    }
}

// ============================================================================
// Mount helpers shared by the built-ins
// ============================================================================

/// Mark `element` as owned by a widget of `kind`, refusing a second mount
pub(crate) fn claim(doc: &mut Document, element: NodeId, kind: &str) -> Result<(), WidgetError> {
    if !doc.is_attached(element) {
        return Err(WidgetError::Detached);
    }
    if doc.has_attr(element, WIDGET_INIT_ATTR) {
        return Err(WidgetError::AlreadyMounted);
    }
    doc.set_attr(element, WIDGET_INIT_ATTR, kind);
    Ok(())
}

pub(crate) fn release(doc: &mut Document, element: NodeId) {
    doc.remove_attr(element, WIDGET_INIT_ATTR);
}

/// The tagged wrapper around `element`, or its parent for bare controls
pub(crate) fn wrapper_of(doc: &Document, element: NodeId) -> Option<NodeId> {
    doc.closest_with_attr(element, FIELD_TYPE_ATTR).or_else(|| doc.parent(element))
}

/// Append chrome to the wrapper of `element`, returning the new nodes
pub(crate) fn add_chrome(doc: &mut Document, element: NodeId, markup: &Markup) -> Vec<NodeId> {
    match wrapper_of(doc, element) {
        Some(wrapper) => doc.append_markup(wrapper, markup),
        None => Vec::new(),
    }
}

pub(crate) fn remove_chrome(doc: &mut Document, chrome: &mut Vec<NodeId>) {
    for node in chrome.drain(..) {
        doc.remove(node);
    }
}

pub(crate) fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Wrap a typed constructor as a [`WidgetFactory`]
pub fn widget_factory<W, F>(build: F) -> WidgetFactory
where
    W: FieldWidget + 'static,
    F: Fn(&WidgetOptions) -> Result<W, WidgetError> + 'static,
{
    Rc::new(move |opts: &WidgetOptions| build(opts).map(|w| Box::new(w) as Box<dyn FieldWidget>))
}

struct Registration {
    factory: WidgetFactory,
    defaults: WidgetOptions,
}

/// Type name -> widget factory table owned by one component
#[derive(Default)]
pub struct WidgetRegistry {
    types: IndexMap<String, Registration>,
    aliases: IndexMap<String, String>,
}

impl WidgetRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in widgets and their short aliases
    pub fn with_builtins(settings: &Settings) -> Self {
        let mut registry = Self::new();
        registry.register_field_type("emoji-text", widget_factory(|_| Ok(EmojiText::new())), Map::new());
        registry.register_field_type(
            "color-picker",
            widget_factory(|opts| Ok(ColorPicker::from_options(opts))),
            Map::new(),
        );
        registry.register_field_type(
            "file-upload",
            widget_factory(|opts| Ok(FileUpload::from_options(opts))),
            Map::new(),
        );
        registry.register_field_type("markdown", widget_factory(|_| Ok(MarkdownEditor::new())), Map::new());

        let mut font_defaults = Map::new();
        font_defaults.insert(
            "fonts".to_string(),
            Value::Array(settings.fonts.iter().cloned().map(Value::String).collect()),
        );
        registry.register_field_type("font-selector", widget_factory(FontSelector::from_options), font_defaults);
        registry.register_field_type(CHARACTER_COUNTER, widget_factory(|_| Ok(CharacterCounter::new())), Map::new());

        registry.alias("color", "color-picker");
        registry.alias("file", "file-upload");
        registry.alias("font", "font-selector");
        registry
    }

    /// Add or replace the factory for `name`
    pub fn register_field_type(&mut self, name: &str, factory: WidgetFactory, defaults: WidgetOptions) {
        debug!(field_type = name, "registered widget type");
        self.types.insert(name.to_string(), Registration { factory, defaults });
    }

    pub fn alias(&mut self, alias: &str, target: &str) {
        self.aliases.insert(alias.to_string(), target.to_string());
    }

    /// Canonical type name for `name`, following aliases
    pub fn resolve(&self, name: &str) -> Option<&str> {
        let canonical = self.aliases.get(name).map(|s| s.as_str()).unwrap_or(name);
        self.types.get_key_value(canonical).map(|(k, _)| k.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(|k| k.as_str())
    }

    /// Build a widget for `name`, with `overrides` layered over the
    /// registration defaults
    pub fn create(&self, name: &str, overrides: &WidgetOptions) -> Result<Box<dyn FieldWidget>, WidgetError> {
        let canonical = self
            .resolve(name)
            .ok_or_else(|| WidgetError::UnknownType(name.to_string()))?;
        let registration = &self.types[canonical];
        let mut options = registration.defaults.clone();
        for (k, v) in overrides {
            options.insert(k.clone(), v.clone());
        }
        (registration.factory)(&options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::el;

    struct Probe;

    impl FieldWidget for Probe {
        fn kind(&self) -> &'static str {
            "probe"
        }
        fn mount(&mut self, doc: &mut Document, element: NodeId) -> Result<(), WidgetError> {
            claim(doc, element, "probe")
        }
        fn destroy(&mut self, _doc: &mut Document) {}
        fn value(&self, _doc: &Document) -> Value {
            Value::Null
        }
        fn set_value(&mut self, _doc: &mut Document, _value: &Value) {}
    }

    #[test]
    fn test_builtins_and_aliases() {
        let registry = WidgetRegistry::with_builtins(&Settings::default());
        for name in ["emoji-text", "color-picker", "file-upload", "markdown", "font-selector", CHARACTER_COUNTER] {
            assert!(registry.contains(name), "{name}");
        }
        assert_eq!(registry.resolve("color"), Some("color-picker"));
        assert_eq!(registry.resolve("file"), Some("file-upload"));
        assert_eq!(registry.resolve("font"), Some("font-selector"));
        assert!(matches!(
            registry.create("hologram", &Map::new()),
            Err(WidgetError::UnknownType(_))
        ));
    }

    #[test]
    fn test_register_field_type_extends_registry() {
        let mut registry = WidgetRegistry::new();
        registry.register_field_type("probe", widget_factory(|_| Ok(Probe)), Map::new());
        let widget = registry.create("probe", &Map::new()).unwrap();
        assert_eq!(widget.kind(), "probe");
    }

    #[test]
    fn test_claim_guards_double_mount_and_detached() {
        let mut doc = Document::new();
        let c = doc.create_container("root");
        doc.set_content(c, &el("input").attr("id", "x").into());
        let input = doc.element_by_id(c, "x").unwrap();
        assert!(claim(&mut doc, input, "probe").is_ok());
        assert_eq!(claim(&mut doc, input, "probe"), Err(WidgetError::AlreadyMounted));
        release(&mut doc, input);
        assert!(claim(&mut doc, input, "probe").is_ok());

        doc.remove(c);
        assert_eq!(claim(&mut doc, input, "probe"), Err(WidgetError::Detached));
    }
}
