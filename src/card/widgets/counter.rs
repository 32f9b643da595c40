use serde_json::Value;

use super::{claim, release, value_text, FieldWidget};
use crate::dom::{el, Document, NodeId};
use crate::error::WidgetError;

/// `n/max` readout next to a length-limited input
pub struct CharacterCounter {
    element: Option<NodeId>,
    readout: Option<NodeId>,
    max: usize,
}

impl CharacterCounter {
    pub fn new() -> Self {
        Self {
            element: None,
            readout: None,
            max: 0,
        }
    }

    fn refresh(&self, doc: &mut Document) {
        let (element, readout) = match (self.element, self.readout) {
            (Some(e), Some(r)) => (e, r),
            _ => return,
        };
        let count = doc.value(element).map(|v| v.chars().count()).unwrap_or(0);
        doc.set_text(readout, &format!("{}/{}", count, self.max));
        // Warn in the last 10% of the budget
        doc.toggle_class(readout, "warning", count * 10 >= self.max * 9 && count < self.max);
        doc.toggle_class(readout, "limit", count >= self.max);
    }
}

impl Default for CharacterCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldWidget for CharacterCounter {
    fn kind(&self) -> &'static str {
        "character-counter"
    }

    fn mount(&mut self, doc: &mut Document, element: NodeId) -> Result<(), WidgetError> {
        let max = doc
            .attr(element, "maxlength")
            .and_then(|m| m.parse::<usize>().ok())
            .filter(|m| *m > 0)
            .ok_or_else(|| WidgetError::Invalid("character counter needs a positive maxlength".to_string()))?;
        let parent = doc.parent(element).ok_or(WidgetError::Detached)?;
        claim(doc, element, self.kind())?;
        self.max = max;
        self.readout = doc.append_markup(parent, &el("span").class("char-counter").into()).first().copied();
        self.element = Some(element);
        self.refresh(doc);
        Ok(())
    }

    fn destroy(&mut self, doc: &mut Document) {
        if let Some(readout) = self.readout.take() {
            doc.remove(readout);
        }
        if let Some(element) = self.element.take() {
            release(doc, element);
        }
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

    #[test]
    fn test_counts_and_flags_limit() {
        let mut doc = Document::new();
        let c = doc.create_container("root");
        doc.set_content(c, &el("div").child(el("input").attr("id", "t").attr("maxlength", "10")).into());
        let input = doc.element_by_id(c, "t").unwrap();
        let mut counter = CharacterCounter::new();
        counter.mount(&mut doc, input).unwrap();
        let readout = doc.find_by_class(c, "char-counter")[0];
        assert_eq!(doc.text_content(readout), "0/10");

        doc.set_value(input, "123456789");
        counter.on_input(&mut doc);
        assert_eq!(doc.text_content(readout), "9/10");
        assert!(doc.has_class(readout, "warning"));

        counter.set_value(&mut doc, &Value::String("1234567890".into()));
        assert!(doc.has_class(readout, "limit"));
        assert!(!doc.has_class(readout, "warning"));
    }

    #[test]
    fn test_requires_maxlength() {
        let mut doc = Document::new();
        let c = doc.create_container("root");
        doc.set_content(c, &el("div").child(el("input").attr("id", "t")).into());
        let input = doc.element_by_id(c, "t").unwrap();
        assert!(matches!(
            CharacterCounter::new().mount(&mut doc, input),
            Err(WidgetError::Invalid(_))
        ));
    }
}
