use serde_json::Value;

use super::{add_chrome, claim, release, remove_chrome, value_text, FieldWidget, WidgetOptions};
use crate::card::WIDGET_ACTION_ATTR;
use crate::dom::{el, fragment, Document, Markup, NodeId};
use crate::error::WidgetError;

const PREVIEW_TEXT: &str = "Aa Bb Cc 123";

/// Pick a font family from a catalog, with a preview line
pub struct FontSelector {
    fonts: Vec<String>,
    element: Option<NodeId>,
    preview: Option<NodeId>,
    chrome: Vec<NodeId>,
}

impl FontSelector {
    /// Options: `fonts` (non-empty array of family names)
    pub fn from_options(options: &WidgetOptions) -> Result<Self, WidgetError> {
        let fonts: Vec<String> = options
            .get("fonts")
            .and_then(Value::as_array)
            .map(|list| list.iter().filter_map(Value::as_str).map(String::from).collect())
            .unwrap_or_default();
        if fonts.is_empty() {
            return Err(WidgetError::Invalid("font selector needs a non-empty `fonts` list".to_string()));
        }
        Ok(Self {
            fonts,
            element: None,
            preview: None,
            chrome: Vec::new(),
        })
    }

    pub fn fonts(&self) -> &[String] {
        &self.fonts
    }

    fn refresh(&self, doc: &mut Document) {
        let element = match self.element {
            Some(e) => e,
            None => return,
        };
        let current = doc.value(element).unwrap_or_default();
        if let Some(preview) = self.preview {
            doc.set_attr(preview, "style", &format!("font-family: '{}'", current));
        }
        let options: Vec<NodeId> = self
            .chrome
            .iter()
            .flat_map(|c| doc.find_by_attr(*c, "data-font", None))
            .collect();
        for option in options {
            let selected = doc.attr(option, "data-font") == Some(current.as_str());
            doc.toggle_class(option, "selected", selected);
        }
    }
}

impl FieldWidget for FontSelector {
    fn kind(&self) -> &'static str {
        "font-selector"
    }

    fn mount(&mut self, doc: &mut Document, element: NodeId) -> Result<(), WidgetError> {
        claim(doc, element, self.kind())?;
        let options = self.fonts.iter().map(|font| {
            Markup::from(
                el("button")
                    .attr("type", "button")
                    .class("font-option")
                    .attr(WIDGET_ACTION_ATTR, "font-pick")
                    .attr("data-font", font.as_str())
                    .attr("style", format!("font-family: '{}'", font))
                    .text(font.as_str()),
            )
        });
        let chrome = fragment(vec![
            el("div").class("font-options").children(options).into(),
            el("span").class("font-preview").text(PREVIEW_TEXT).into(),
        ]);
        self.chrome = add_chrome(doc, element, &chrome);
        self.preview = self.chrome.get(1).copied();
        self.element = Some(element);
        self.refresh(doc);
        Ok(())
    }

    fn destroy(&mut self, doc: &mut Document) {
        remove_chrome(doc, &mut self.chrome);
        if let Some(element) = self.element.take() {
            release(doc, element);
        }
        self.preview = None;
    }

    fn value(&self, doc: &Document) -> Value {
        self.element
            .and_then(|e| doc.value(e))
            .filter(|v| !v.is_empty())
            .map(Value::String)
            .unwrap_or(Value::Null)
    }

    fn set_value(&mut self, doc: &mut Document, value: &Value) {
        if let Some(element) = self.element {
            doc.set_value(element, &value_text(value));
            self.refresh(doc);
        }
    }

    fn on_input(&mut self, doc: &mut Document) {
        self.refresh(doc);
    }

    fn on_action(&mut self, doc: &mut Document, action: &str, node: NodeId) -> bool {
        if action != "font-pick" {
            return false;
        }
        let (element, font) = match (self.element, doc.attr(node, "data-font")) {
            (Some(e), Some(f)) => (e, f.to_string()),
            _ => return false,
        };
        doc.set_value(element, &font);
        self.refresh(doc);
        true
    }
}
