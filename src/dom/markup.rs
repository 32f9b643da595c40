//! Typed markup produced by the templates.
//!
//! A `Markup` tree is plain data: it can be serialized to an HTML string
//! (`to_string()`) or instantiated into a [`Document`](super::Document).

use std::fmt::{self, Write};

/// Elements that never have children or a closing tag
const VOID_ELEMENTS: &[&str] = &["area", "br", "col", "hr", "img", "input", "link", "meta", "source"];

pub fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// A markup fragment
#[derive(Debug, Clone, PartialEq)]
pub enum Markup {
    Element(El),
    Text(String),
    Fragment(Vec<Markup>),
}

/// An element under construction
#[derive(Debug, Clone, PartialEq)]
pub struct El {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub classes: Vec<String>,
    pub children: Vec<Markup>,
}

/// Start building an element
pub fn el(tag: &str) -> El {
    El {
        tag: tag.to_string(),
        attrs: Vec::new(),
        classes: Vec::new(),
        children: Vec::new(),
    }
}

/// A text node
pub fn text(value: impl Into<String>) -> Markup {
    Markup::Text(value.into())
}

/// A sequence of sibling nodes
pub fn fragment(items: impl IntoIterator<Item = Markup>) -> Markup {
    Markup::Fragment(items.into_iter().collect())
}

/// An empty fragment
pub fn nothing() -> Markup {
    Markup::Fragment(Vec::new())
}

impl El {
    /// Set an attribute, replacing any previous value
    pub fn attr(mut self, name: &str, value: impl Into<String>) -> Self {
        if name == "class" {
            let value = value.into();
            return self.class(&value);
        }
        let value = value.into();
        if let Some(slot) = self.attrs.iter_mut().find(|(k, _)| k == name) {
            slot.1 = value;
        } else {
            self.attrs.push((name.to_string(), value));
        }
        self
    }

    /// Set an attribute only when a value is present
    pub fn attr_opt<S: Into<String>>(self, name: &str, value: Option<S>) -> Self {
        match value {
            Some(v) => self.attr(name, v),
            None => self,
        }
    }

    /// Boolean attribute (`required`, `checked`, `hidden`...)
    pub fn flag(self, name: &str, on: bool) -> Self {
        if on {
            self.attr(name, "")
        } else {
            self
        }
    }

    /// Append one or more space-separated classes
    pub fn class(mut self, class: &str) -> Self {
        for c in class.split_whitespace() {
            if !self.classes.iter().any(|existing| existing == c) {
                self.classes.push(c.to_string());
            }
        }
        self
    }

    pub fn class_if(self, cond: bool, class: &str) -> Self {
        if cond {
            self.class(class)
        } else {
            self
        }
    }

    pub fn child(mut self, child: impl Into<Markup>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Markup>) -> Self {
        self.children.extend(children);
        self
    }

    /// Append a text child
    pub fn text(self, value: impl Into<String>) -> Self {
        self.child(Markup::Text(value.into()))
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }
}

impl From<El> for Markup {
    fn from(el: El) -> Self {
        Markup::Element(el)
    }
}

impl Markup {
    /// Number of top-level nodes this markup instantiates to
    pub fn top_level_count(&self) -> usize {
        match self {
            Markup::Element(_) | Markup::Text(_) => 1,
            Markup::Fragment(items) => items.iter().map(Markup::top_level_count).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.top_level_count() == 0
    }
}

/// Escape text content
pub fn escape_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape an attribute value (always double-quoted)
pub fn escape_attr(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Write an opening tag with classes and attributes
pub(crate) fn write_open_tag(
    out: &mut impl Write,
    tag: &str,
    classes: &[String],
    attrs: &[(String, String)],
) -> fmt::Result {
    write!(out, "<{}", tag)?;
    if !classes.is_empty() {
        write!(out, " class=\"{}\"", escape_attr(&classes.join(" ")))?;
    }
    for (name, value) in attrs {
        if value.is_empty() {
            write!(out, " {}", name)?;
        } else {
            write!(out, " {}=\"{}\"", name, escape_attr(value))?;
        }
    }
    out.write_char('>')
}

impl fmt::Display for Markup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Markup::Text(t) => f.write_str(&escape_text(t)),
            Markup::Fragment(items) => {
                for item in items {
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
            Markup::Element(el) => {
                write_open_tag(f, &el.tag, &el.classes, &el.attrs)?;
                if is_void(&el.tag) {
                    return Ok(());
                }
                for child in &el.children {
                    write!(f, "{}", child)?;
                }
                write!(f, "</{}>", el.tag)
            }
        }
    }
}

impl fmt::Display for El {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Markup::Element(self.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_nested_markup() {
        let m: Markup = el("div")
            .class("card")
            .attr("data-id", "7")
            .child(el("span").text("Olá"))
            .into();
        assert_eq!(m.to_string(), "<div class=\"card\" data-id=\"7\"><span>Olá</span></div>");
    }

    #[test]
    fn test_escapes_text_and_attributes() {
        let m: Markup = el("input").attr("value", "a\"<b>").into();
        assert_eq!(m.to_string(), "<input value=\"a&quot;&lt;b&gt;\">");
        assert_eq!(text("<script>").to_string(), "&lt;script&gt;");
    }

    #[test]
    fn test_flags_and_classes() {
        let m: Markup = el("input")
            .flag("required", true)
            .flag("disabled", false)
            .class("a b")
            .class_if(true, "b c")
            .attr("class", "d")
            .into();
        assert_eq!(m.to_string(), "<input class=\"a b c d\" required>");
    }

    #[test]
    fn test_fragment_counts_top_level_nodes() {
        let m = fragment(vec![el("p").into(), nothing(), text("x")]);
        assert_eq!(m.top_level_count(), 2);
        assert!(nothing().is_empty());
    }
}
