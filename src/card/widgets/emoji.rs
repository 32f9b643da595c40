use serde_json::Value;

use super::{add_chrome, claim, release, remove_chrome, value_text, FieldWidget};
use crate::card::WIDGET_ACTION_ATTR;
use crate::dom::{el, fragment, Document, Markup, NodeId};
use crate::error::WidgetError;

const PALETTE: &[&str] = &["😀", "😊", "👍", "🎉", "⚖️", "📌", "📅", "💡", "✅", "🔥", "📣", "🤝"];

/// Text input with an emoji palette that inserts at the end of the value
pub struct EmojiText {
    element: Option<NodeId>,
    palette: Option<NodeId>,
    chrome: Vec<NodeId>,
}

impl EmojiText {
    pub fn new() -> Self {
        Self {
            element: None,
            palette: None,
            chrome: Vec::new(),
        }
    }

    fn chrome() -> Markup {
        let buttons = PALETTE.iter().map(|e| {
            Markup::from(
                el("button")
                    .attr("type", "button")
                    .class("emoji-option")
                    .attr(WIDGET_ACTION_ATTR, "emoji-insert")
                    .attr("data-emoji", *e)
                    .text(*e),
            )
        });
        fragment(vec![
            el("button")
                .attr("type", "button")
                .class("emoji-toggle")
                .attr(WIDGET_ACTION_ATTR, "emoji-toggle")
                .attr("aria-label", "Inserir emoji")
                .text("😊")
                .into(),
            el("div").class("emoji-palette").flag("hidden", true).children(buttons).into(),
        ])
    }

    pub fn is_palette_open(&self, doc: &Document) -> bool {
        self.palette.map(|p| !doc.is_hidden(p)).unwrap_or(false)
    }
}

impl Default for EmojiText {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldWidget for EmojiText {
    fn kind(&self) -> &'static str {
        "emoji-text"
    }

    fn mount(&mut self, doc: &mut Document, element: NodeId) -> Result<(), WidgetError> {
        claim(doc, element, self.kind())?;
        self.chrome = add_chrome(doc, element, &Self::chrome());
        self.palette = self
            .chrome
            .iter()
            .copied()
            .find(|n| doc.has_class(*n, "emoji-palette"));
        self.element = Some(element);
        Ok(())
    }

    fn destroy(&mut self, doc: &mut Document) {
        remove_chrome(doc, &mut self.chrome);
        if let Some(element) = self.element.take() {
            release(doc, element);
        }
        self.palette = None;
    }

    fn value(&self, doc: &Document) -> Value {
        self.element
            .and_then(|e| doc.value(e))
            .map(Value::String)
            .unwrap_or(Value::Null)
    }

    fn set_value(&mut self, doc: &mut Document, value: &Value) {
        if let Some(element) = self.element {
            doc.set_value(element, &value_text(value));
        }
    }

    fn on_action(&mut self, doc: &mut Document, action: &str, node: NodeId) -> bool {
        let (element, palette) = match (self.element, self.palette) {
            (Some(e), Some(p)) => (e, p),
            _ => return false,
        };
        match action {
            "emoji-toggle" => {
                let hidden = doc.is_hidden(palette);
                doc.set_hidden(palette, !hidden);
                true
            }
            "emoji-insert" => {
                let emoji = match doc.attr(node, "data-emoji") {
                    Some(e) => e.to_string(),
                    None => return false,
                };
                let mut current = doc.value(element).unwrap_or_default();
                current.push_str(&emoji);
                doc.set_value(element, &current);
                doc.set_hidden(palette, true);
                doc.focus(element);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::FIELD_TYPE_ATTR;

    fn mounted() -> (Document, NodeId, EmojiText) {
        let mut doc = Document::new();
        let c = doc.create_container("root");
        doc.set_content(
            c,
            &el("div")
                .attr(FIELD_TYPE_ATTR, "emoji-text")
                .child(el("input").attr("id", "t").attr("value", "Oi"))
                .into(),
        );
        let input = doc.element_by_id(c, "t").unwrap();
        let mut widget = EmojiText::new();
        widget.mount(&mut doc, input).unwrap();
        (doc, input, widget)
    }

    #[test]
    fn test_toggle_and_insert() {
        let (mut doc, input, mut widget) = mounted();
        let toggle = doc.find_by_class(doc.body(), "emoji-toggle")[0];
        assert!(!widget.is_palette_open(&doc));
        assert!(widget.on_action(&mut doc, "emoji-toggle", toggle));
        assert!(widget.is_palette_open(&doc));

        let option = doc.find_first_by_attr(doc.body(), "data-emoji", "👍").unwrap();
        assert!(widget.on_action(&mut doc, "emoji-insert", option));
        assert_eq!(widget.value(&doc), Value::String("Oi👍".into()));
        assert!(!widget.is_palette_open(&doc));
        assert_eq!(doc.focused(), Some(input));
    }

    #[test]
    fn test_destroy_removes_chrome_and_marker() {
        let (mut doc, input, mut widget) = mounted();
        widget.destroy(&mut doc);
        assert!(doc.find_by_class(doc.body(), "emoji-palette").is_empty());
        assert!(!doc.has_attr(input, crate::card::WIDGET_INIT_ATTR));
    }
}
