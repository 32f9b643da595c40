use serde_json::Value;

use super::{add_chrome, claim, release, remove_chrome, value_text, FieldWidget, WidgetOptions};
use crate::dom::{el, fragment, Document, NodeId};
use crate::error::WidgetError;

/// Normalize `#abc`, `abc` or `#AABBCC` to lowercase `#aabbcc`
pub fn normalize_hex(raw: &str) -> Option<String> {
    let hex = raw.trim().trim_start_matches('#');
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        3 => Some(format!("#{}", hex.chars().flat_map(|c| [c, c]).collect::<String>()).to_ascii_lowercase()),
        6 => Some(format!("#{}", hex.to_ascii_lowercase())),
        _ => None,
    }
}

/// Hex color input with a live swatch
pub struct ColorPicker {
    element: Option<NodeId>,
    swatch: Option<NodeId>,
    label: Option<NodeId>,
    chrome: Vec<NodeId>,
    fallback: String,
}

impl ColorPicker {
    /// Options: `default` (hex used when the input is empty or invalid)
    pub fn from_options(options: &WidgetOptions) -> Self {
        let fallback = options
            .get("default")
            .and_then(|v| v.as_str())
            .and_then(normalize_hex)
            .unwrap_or_else(|| "#000000".to_string());
        Self {
            element: None,
            swatch: None,
            label: None,
            chrome: Vec::new(),
            fallback,
        }
    }

    fn current(&self, doc: &Document) -> Option<String> {
        let raw = doc.value(self.element?)?;
        normalize_hex(&raw)
    }

    fn refresh(&self, doc: &mut Document) {
        let color = self.current(doc);
        let shown = color.clone().unwrap_or_else(|| self.fallback.clone());
        if let Some(swatch) = self.swatch {
            doc.set_attr(swatch, "style", &format!("background-color: {}", shown));
            doc.toggle_class(swatch, "invalid", color.is_none());
        }
        if let Some(label) = self.label {
            doc.set_text(label, &shown);
        }
    }
}

impl FieldWidget for ColorPicker {
    fn kind(&self) -> &'static str {
        "color-picker"
    }

    fn mount(&mut self, doc: &mut Document, element: NodeId) -> Result<(), WidgetError> {
        claim(doc, element, self.kind())?;
        let chrome = fragment(vec![
            el("span").class("color-swatch").into(),
            el("span").class("color-value").into(),
        ]);
        self.chrome = add_chrome(doc, element, &chrome);
        self.swatch = self.chrome.first().copied();
        self.label = self.chrome.get(1).copied();
        self.element = Some(element);
        self.refresh(doc);
        Ok(())
    }

    fn destroy(&mut self, doc: &mut Document) {
        remove_chrome(doc, &mut self.chrome);
        if let Some(element) = self.element.take() {
            release(doc, element);
        }
        self.swatch = None;
        self.label = None;
    }

    fn value(&self, doc: &Document) -> Value {
        match self.current(doc) {
            Some(hex) => Value::String(hex),
            None => self
                .element
                .and_then(|e| doc.value(e))
                .filter(|v| !v.is_empty())
                .map(Value::String)
                .unwrap_or(Value::Null),
        }
    }

    fn set_value(&mut self, doc: &mut Document, value: &Value) {
        if let Some(element) = self.element {
            let raw = value_text(value);
            let normalized = normalize_hex(&raw).unwrap_or(raw);
            doc.set_value(element, &normalized);
            self.refresh(doc);
        }
    }

    fn on_input(&mut self, doc: &mut Document) {
        self.refresh(doc);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::FIELD_TYPE_ATTR;
    use serde_json::{json, Map};

    #[test]
    fn test_normalize_hex() {
        assert_eq!(normalize_hex("#ABC").as_deref(), Some("#aabbcc"));
        assert_eq!(normalize_hex("1a2B3c").as_deref(), Some("#1a2b3c"));
        assert_eq!(normalize_hex("#12345"), None);
        assert_eq!(normalize_hex("azul"), None);
    }

    #[test]
    fn test_swatch_follows_input() {
        let mut doc = Document::new();
        let c = doc.create_container("root");
        doc.set_content(
            c,
            &el("div")
                .attr(FIELD_TYPE_ATTR, "color-picker")
                .child(el("input").attr("id", "cor").attr("value", "#F00"))
                .into(),
        );
        let input = doc.element_by_id(c, "cor").unwrap();
        let mut picker = ColorPicker::from_options(&Map::new());
        picker.mount(&mut doc, input).unwrap();
        let swatch = doc.find_by_class(c, "color-swatch")[0];
        assert_eq!(doc.attr(swatch, "style"), Some("background-color: #ff0000"));
        assert_eq!(picker.value(&doc), json!("#ff0000"));

        doc.set_value(input, "zz");
        picker.on_input(&mut doc);
        assert!(doc.has_class(swatch, "invalid"));
        assert_eq!(picker.value(&doc), json!("zz"));

        picker.set_value(&mut doc, &json!("#0A0"));
        assert_eq!(doc.value(input).as_deref(), Some("#00aa00"));
        assert_eq!(doc.text_content(doc.find_by_class(c, "color-value")[0]), "#00aa00");
    }
}
