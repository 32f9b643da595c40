use serde_json::Value;

use super::{add_chrome, claim, release, remove_chrome, FieldWidget, WidgetOptions};
use crate::card::WIDGET_ACTION_ATTR;
use crate::dom::{el, Document, Markup, NodeId};
use crate::error::WidgetError;

/// File picker that tracks the chosen file names
pub struct FileUpload {
    element: Option<NodeId>,
    list: Option<NodeId>,
    chrome: Vec<NodeId>,
    files: Vec<String>,
    multiple: bool,
    max_files: Option<usize>,
}

impl FileUpload {
    /// Options: `multiple` (bool), `maxFiles` (number)
    pub fn from_options(options: &WidgetOptions) -> Self {
        Self {
            element: None,
            list: None,
            chrome: Vec::new(),
            files: Vec::new(),
            multiple: options.get("multiple").and_then(Value::as_bool).unwrap_or(false),
            max_files: options.get("maxFiles").and_then(Value::as_u64).map(|n| n as usize),
        }
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Record files chosen by the user. A single-file picker keeps the last one.
    pub fn choose(&mut self, doc: &mut Document, names: &[String]) {
        if self.multiple {
            for name in names {
                if !self.files.contains(name) {
                    self.files.push(name.clone());
                }
            }
            if let Some(max) = self.max_files {
                self.files.truncate(max);
            }
        } else if let Some(last) = names.last() {
            self.files = vec![last.clone()];
        }
        self.render_list(doc);
    }

    fn render_list(&self, doc: &mut Document) {
        let list = match self.list {
            Some(l) => l,
            None => return,
        };
        let items = self.files.iter().enumerate().map(|(i, name)| {
            Markup::from(
                el("li").class("file-item").child(el("span").class("file-name").text(name.as_str())).child(
                    el("button")
                        .attr("type", "button")
                        .class("file-remove")
                        .attr(WIDGET_ACTION_ATTR, "file-remove")
                        .attr("data-index", i.to_string())
                        .text("×"),
                ),
            )
        });
        doc.set_content(list, &Markup::Fragment(items.collect()));
        doc.toggle_class(list, "empty", self.files.is_empty());
    }
}

impl FieldWidget for FileUpload {
    fn kind(&self) -> &'static str {
        "file-upload"
    }

    fn mount(&mut self, doc: &mut Document, element: NodeId) -> Result<(), WidgetError> {
        claim(doc, element, self.kind())?;
        self.multiple |= doc.has_attr(element, "multiple");
        self.chrome = add_chrome(doc, element, &el("ul").class("file-list").into());
        self.list = self.chrome.first().copied();
        self.element = Some(element);
        self.render_list(doc);
        Ok(())
    }

    fn destroy(&mut self, doc: &mut Document) {
        remove_chrome(doc, &mut self.chrome);
        if let Some(element) = self.element.take() {
            release(doc, element);
        }
        self.list = None;
    }

    fn value(&self, _doc: &Document) -> Value {
        if self.multiple {
            Value::Array(self.files.iter().cloned().map(Value::String).collect())
        } else {
            self.files.first().cloned().map(Value::String).unwrap_or(Value::Null)
        }
    }

    fn set_value(&mut self, doc: &mut Document, value: &Value) {
        self.files = match value {
            Value::Array(items) => items.iter().filter_map(|v| v.as_str()).map(String::from).collect(),
            Value::String(s) if !s.is_empty() => vec![s.clone()],
            _ => Vec::new(),
        };
        if !self.multiple {
            self.files.truncate(1);
        }
        self.render_list(doc);
    }

    fn on_action(&mut self, doc: &mut Document, action: &str, node: NodeId) -> bool {
        if action != "file-remove" {
            return false;
        }
        let index = doc.attr(node, "data-index").and_then(|i| i.parse::<usize>().ok());
        match index {
            Some(i) if i < self.files.len() => {
                self.files.remove(i);
                self.render_list(doc);
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
    use serde_json::{json, Map};

    fn mount(multiple: bool) -> (Document, NodeId, FileUpload) {
        let mut doc = Document::new();
        let c = doc.create_container("root");
        doc.set_content(
            c,
            &el("div")
                .attr(FIELD_TYPE_ATTR, "file-upload")
                .child(el("input").attr("type", "file").attr("id", "logo").flag("multiple", multiple))
                .into(),
        );
        let input = doc.element_by_id(c, "logo").unwrap();
        let mut widget = FileUpload::from_options(&Map::new());
        widget.mount(&mut doc, input).unwrap();
        (doc, c, widget)
    }

    #[test]
    fn test_single_file_keeps_last_choice() {
        let (mut doc, _, mut widget) = mount(false);
        assert_eq!(widget.value(&doc), Value::Null);
        widget.choose(&mut doc, &["a.png".into(), "b.png".into()]);
        assert_eq!(widget.value(&doc), json!("b.png"));
    }

    #[test]
    fn test_multiple_files_and_remove() {
        let (mut doc, c, mut widget) = mount(true);
        widget.set_value(&mut doc, &json!(["contrato.pdf", "procuracao.pdf"]));
        assert_eq!(doc.find_by_class(c, "file-item").len(), 2);

        let remove = doc.find_first_by_attr(c, "data-index", "0").unwrap();
        assert!(widget.on_action(&mut doc, "file-remove", remove));
        assert_eq!(widget.value(&doc), json!(["procuracao.pdf"]));
        assert_eq!(doc.find_by_class(c, "file-item").len(), 1);
    }
}
