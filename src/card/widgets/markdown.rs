use serde_json::Value;

use super::{add_chrome, claim, release, remove_chrome, value_text, FieldWidget};
use crate::card::WIDGET_ACTION_ATTR;
use crate::dom::{el, fragment, text, Document, Markup, NodeId};
use crate::error::WidgetError;

/// (action, label, snippet appended to the text)
const TOOLBAR: &[(&str, &str, &str)] = &[
    ("md-bold", "B", "**texto**"),
    ("md-italic", "I", "*texto*"),
    ("md-heading", "H", "\n# Título"),
    ("md-list", "•", "\n- item"),
    ("md-link", "🔗", "[texto](https://)"),
];

// ============================================================================
// Minimal markdown rendering
// ============================================================================

/// Render headings, bullet lists, paragraphs and inline `**bold**`,
/// `*italic*`, `` `code` `` and `[links](url)`.
pub fn render_markdown(source: &str) -> Markup {
    let mut blocks: Vec<Markup> = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();
    let mut list: Vec<Markup> = Vec::new();

    fn flush_paragraph(paragraph: &mut Vec<&str>, blocks: &mut Vec<Markup>) {
        if !paragraph.is_empty() {
            blocks.push(el("p").children(render_inline(&paragraph.join(" "))).into());
            paragraph.clear();
        }
    }
    fn flush_list(list: &mut Vec<Markup>, blocks: &mut Vec<Markup>) {
        if !list.is_empty() {
            blocks.push(el("ul").children(list.drain(..)).into());
        }
    }

    for line in source.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            flush_paragraph(&mut paragraph, &mut blocks);
            flush_list(&mut list, &mut blocks);
            continue;
        }
        let hashes = trimmed.chars().take_while(|c| *c == '#').count();
        if (1..=3).contains(&hashes) && trimmed[hashes..].starts_with(' ') {
            flush_paragraph(&mut paragraph, &mut blocks);
            flush_list(&mut list, &mut blocks);
            let tag = format!("h{}", hashes);
            blocks.push(el(&tag).children(render_inline(trimmed[hashes..].trim())).into());
            continue;
        }
        if let Some(item) = trimmed.strip_prefix("- ").or_else(|| trimmed.strip_prefix("* ")) {
            flush_paragraph(&mut paragraph, &mut blocks);
            list.push(el("li").children(render_inline(item.trim())).into());
            continue;
        }
        flush_list(&mut list, &mut blocks);
        paragraph.push(trimmed);
    }
    flush_paragraph(&mut paragraph, &mut blocks);
    flush_list(&mut list, &mut blocks);
    fragment(blocks)
}

fn render_inline(source: &str) -> Vec<Markup> {
    let mut out = Vec::new();
    let mut plain = String::new();
    let mut rest = source;

    while let Some(c) = rest.chars().next() {
        let matched = match c {
            '*' if rest.starts_with("**") => delimited(rest, "**", "**").map(|(inner, len)| (el("strong").children(render_inline(inner)), len)),
            '*' => delimited(rest, "*", "*").map(|(inner, len)| (el("em").children(render_inline(inner)), len)),
            '`' => delimited(rest, "`", "`").map(|(inner, len)| (el("code").text(inner), len)),
            '[' => link(rest),
            _ => None,
        };
        match matched {
            Some((element, len)) => {
                if !plain.is_empty() {
                    out.push(text(std::mem::take(&mut plain)));
                }
                out.push(element.into());
                rest = &rest[len..];
            }
            None => {
                plain.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }
    if !plain.is_empty() {
        out.push(text(plain));
    }
    out
}

/// `open inner close` at the start of `s`: returns (inner, consumed bytes)
fn delimited<'a>(s: &'a str, open: &str, close: &str) -> Option<(&'a str, usize)> {
    let body = s.strip_prefix(open)?;
    let end = body.find(close)?;
    if end == 0 {
        return None;
    }
    Some((&body[..end], open.len() + end + close.len()))
}

fn link(s: &str) -> Option<(crate::dom::El, usize)> {
    let (label, label_len) = delimited(s, "[", "]")?;
    let (href, href_len) = delimited(&s[label_len..], "(", ")")?;
    let anchor = el("a")
        .attr("href", href)
        .attr("target", "_blank")
        .attr("rel", "noopener")
        .text(label);
    Some((anchor, label_len + href_len))
}

// ============================================================================
// Widget
// ============================================================================

/// Textarea with a formatting toolbar and a live preview
pub struct MarkdownEditor {
    element: Option<NodeId>,
    preview: Option<NodeId>,
    chrome: Vec<NodeId>,
}

impl MarkdownEditor {
    pub fn new() -> Self {
        Self {
            element: None,
            preview: None,
            chrome: Vec::new(),
        }
    }

    fn refresh_preview(&self, doc: &mut Document) {
        if let (Some(element), Some(preview)) = (self.element, self.preview) {
            let source = doc.value(element).unwrap_or_default();
            doc.set_content(preview, &render_markdown(&source));
        }
    }
}

impl Default for MarkdownEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldWidget for MarkdownEditor {
    fn kind(&self) -> &'static str {
        "markdown"
    }

    fn mount(&mut self, doc: &mut Document, element: NodeId) -> Result<(), WidgetError> {
        claim(doc, element, self.kind())?;
        let buttons = TOOLBAR.iter().map(|(action, label, _)| {
            Markup::from(
                el("button")
                    .attr("type", "button")
                    .class("markdown-tool")
                    .attr(WIDGET_ACTION_ATTR, *action)
                    .text(*label),
            )
        });
        let chrome = fragment(vec![
            el("div").class("markdown-toolbar").children(buttons).into(),
            el("div").class("markdown-preview").into(),
        ]);
        self.chrome = add_chrome(doc, element, &chrome);
        self.preview = self.chrome.get(1).copied();
        self.element = Some(element);
        self.refresh_preview(doc);
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
            .map(Value::String)
            .unwrap_or(Value::Null)
    }

    fn set_value(&mut self, doc: &mut Document, value: &Value) {
        if let Some(element) = self.element {
            doc.set_value(element, &value_text(value));
            self.refresh_preview(doc);
        }
    }

    fn on_input(&mut self, doc: &mut Document) {
        self.refresh_preview(doc);
    }

    fn on_action(&mut self, doc: &mut Document, action: &str, _node: NodeId) -> bool {
        let element = match self.element {
            Some(e) => e,
            None => return false,
        };
        let snippet = match TOOLBAR.iter().find(|(a, _, _)| *a == action) {
            Some((_, _, snippet)) => *snippet,
            None => return false,
        };
        let mut current = doc.value(element).unwrap_or_default();
        if current.is_empty() {
            current.push_str(snippet.trim_start_matches('\n'));
        } else {
            current.push_str(snippet);
        }
        doc.set_value(element, &current);
        self.refresh_preview(doc);
        doc.focus(element);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::FIELD_TYPE_ATTR;

    #[test]
    fn test_render_blocks() {
        let html = render_markdown("# Título\n\nPrimeira linha\ncontinua\n\n- um\n- dois").to_string();
        assert_eq!(
            html,
            "<h1>Título</h1><p>Primeira linha continua</p><ul><li>um</li><li>dois</li></ul>"
        );
    }

    #[test]
    fn test_render_inline_and_escape() {
        let html = render_markdown("**forte** e *leve* com `x<y` [site](https://ialum.com.br)").to_string();
        assert_eq!(
            html,
            "<p><strong>forte</strong> e <em>leve</em> com <code>x&lt;y</code> \
             <a href=\"https://ialum.com.br\" target=\"_blank\" rel=\"noopener\">site</a></p>"
        );
        assert_eq!(render_markdown("2 * 3 = 6").to_string(), "<p>2 * 3 = 6</p>");
    }

    #[test]
    fn test_toolbar_updates_preview() {
        let mut doc = Document::new();
        let c = doc.create_container("root");
        doc.set_content(
            c,
            &el("div")
                .attr(FIELD_TYPE_ATTR, "markdown")
                .child(el("textarea").attr("id", "bio"))
                .into(),
        );
        let textarea = doc.element_by_id(c, "bio").unwrap();
        let mut editor = MarkdownEditor::new();
        editor.mount(&mut doc, textarea).unwrap();
        let bold = doc.find_first_by_attr(c, WIDGET_ACTION_ATTR, "md-bold").unwrap();
        assert!(editor.on_action(&mut doc, "md-bold", bold));
        assert_eq!(editor.value(&doc), Value::String("**texto**".into()));
        let preview = doc.find_by_class(c, "markdown-preview")[0];
        assert_eq!(doc.inner_html(preview), "<p><strong>texto</strong></p>");
    }
}
