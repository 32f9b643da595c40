//! Native form-encoding over a `<form>` subtree.
//!
//! Mirrors what a browser submits: unchecked checkboxes and radios are
//! omitted, disabled controls are skipped, file inputs carry no value and
//! multi-selects contribute one entry per selected option.

use indexmap::IndexMap;

use super::{Document, NodeId};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    entries: IndexMap<String, Vec<String>>,
}

impl FormData {
    /// Collect the named controls under `form`
    pub fn from_form(doc: &Document, form: NodeId) -> Self {
        let mut data = Self::default();
        let controls = doc.find_all(form, |_, e| e.is_form_control() && e.attr("name").is_some());
        for control in controls {
            let element = match doc.element(control) {
                Some(e) => e,
                None => continue,
            };
            if element.attr("disabled").is_some() {
                continue;
            }
            let name = match element.attr("name") {
                Some(n) if !n.is_empty() => n.to_string(),
                _ => continue,
            };
            match element.tag.as_str() {
                "select" => {
                    for value in doc.selected_values(control) {
                        data.append(&name, value);
                    }
                    if element.attr("multiple").is_none() && !data.contains(&name) {
                        if let Some(value) = doc.value(control) {
                            data.append(&name, value);
                        }
                    }
                }
                "textarea" => data.append(&name, doc.value(control).unwrap_or_default()),
                _ => match element.input_type().as_str() {
                    "checkbox" | "radio" => {
                        if doc.checked(control) {
                            let value = doc.value(control).filter(|v| !v.is_empty());
                            data.append(&name, value.unwrap_or_else(|| "on".to_string()));
                        }
                    }
                    "file" | "submit" | "button" | "reset" => {}
                    _ => data.append(&name, doc.value(control).unwrap_or_default()),
                },
            }
        }
        data
    }

    pub fn append(&mut self, name: &str, value: impl Into<String>) {
        self.entries.entry(name.to_string()).or_default().push(value.into());
    }

    /// First value for `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).and_then(|v| v.first()).map(|s| s.as_str())
    }

    pub fn get_all(&self, name: &str) -> &[String] {
        self.entries.get(name).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::el;

    #[test]
    fn test_unchecked_checkbox_is_omitted() {
        let mut doc = Document::new();
        let c = doc.create_container("root");
        doc.set_content(
            c,
            &el("form")
                .child(el("input").attr("name", "title").attr("value", "x"))
                .child(el("input").attr("type", "checkbox").attr("name", "published").attr("value", "true"))
                .child(el("input").attr("type", "checkbox").attr("name", "featured").flag("checked", true))
                .into(),
        );
        let form = doc.find_by_tag(c, "form")[0];
        let data = FormData::from_form(&doc, form);
        assert_eq!(data.get("title"), Some("x"));
        assert!(!data.contains("published"));
        assert_eq!(data.get("featured"), Some("on"));
    }

    #[test]
    fn test_radio_multi_select_and_disabled() {
        let mut doc = Document::new();
        let c = doc.create_container("root");
        doc.set_content(
            c,
            &el("form")
                .child(el("input").attr("type", "radio").attr("name", "tone").attr("value", "formal"))
                .child(el("input").attr("type", "radio").attr("name", "tone").attr("value", "casual").flag("checked", true))
                .child(
                    el("select")
                        .attr("name", "tags")
                        .flag("multiple", true)
                        .child(el("option").attr("value", "a").flag("selected", true))
                        .child(el("option").attr("value", "b"))
                        .child(el("option").attr("value", "c").flag("selected", true)),
                )
                .child(el("input").attr("name", "locked").attr("value", "1").flag("disabled", true))
                .child(el("input").attr("type", "file").attr("name", "logo"))
                .into(),
        );
        let form = doc.find_by_tag(c, "form")[0];
        let data = FormData::from_form(&doc, form);
        assert_eq!(data.get("tone"), Some("casual"));
        assert_eq!(data.get_all("tags"), &["a".to_string(), "c".to_string()]);
        assert!(!data.contains("locked"));
        assert!(!data.contains("logo"));
    }
}
