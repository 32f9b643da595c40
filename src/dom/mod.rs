//! In-memory document model
//!
//! Components render [`Markup`] into a [`Document`], an arena of element and
//! text nodes addressed by [`NodeId`]. The document supports exactly the
//! operations the card components need: replacing a container's content,
//! attribute/class/value access, subtree queries and relocation of nodes.
//!
//! Removed nodes give their slot back to the arena. A `NodeId` carries the
//! slot's generation, so a stale id held across a re-render never aliases
//! the node that reuses the slot; operations on it are no-ops.

pub mod form_data;
pub mod markup;

pub use form_data::FormData;
pub use markup::{el, fragment, nothing, text, El, Markup};

use indexmap::IndexMap;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt::Write as _;
use std::rc::Rc;

use markup::{escape_text, is_void, write_open_tag};

// ============================================================================
// Node storage
// ============================================================================

/// Handle to a node in a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

/// Element data plus live form-control state
#[derive(Debug, Clone)]
pub struct Element {
    pub tag: String,
    attrs: IndexMap<String, String>,
    classes: Vec<String>,
    value: String,
    checked: bool,
    selected: bool,
    hidden: bool,
}

impl Element {
    fn from_markup(el: &El) -> Self {
        let mut element = Self {
            tag: el.tag.clone(),
            attrs: IndexMap::new(),
            classes: el.classes.clone(),
            value: String::new(),
            checked: false,
            selected: false,
            hidden: false,
        };
        // An option's value is static; only real controls get live state
        let live_value = el.tag != "option";
        for (name, value) in &el.attrs {
            match name.as_str() {
                "value" if live_value => element.value = value.clone(),
                "checked" => element.checked = true,
                "selected" => element.selected = true,
                "hidden" => element.hidden = true,
                _ => {
                    element.attrs.insert(name.clone(), value.clone());
                }
            }
        }
        element
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(|s| s.as_str())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// The `type` attribute of an input, lowercased (`text` when absent)
    pub fn input_type(&self) -> String {
        self.attr("type").unwrap_or("text").to_ascii_lowercase()
    }

    pub fn is_form_control(&self) -> bool {
        matches!(self.tag.as_str(), "input" | "textarea" | "select")
    }
}

#[derive(Debug, Clone)]
enum NodeKind {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

/// Arena slot. `generation` is bumped every time the slot is freed.
#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

// ============================================================================
// Document
// ============================================================================

/// Arena-backed document with a single `<body>` root
#[derive(Debug, Clone)]
pub struct Document {
    slots: Vec<Slot>,
    free: Vec<usize>,
    root: NodeId,
    focused: Option<NodeId>,
    layout_epoch: u64,
    next_generated_id: u64,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let body = Node {
            parent: None,
            children: Vec::new(),
            kind: NodeKind::Element(Element::from_markup(&el("body"))),
        };
        Self {
            slots: vec![Slot {
                generation: 0,
                node: Some(body),
            }],
            free: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
            focused: None,
            layout_epoch: 0,
            next_generated_id: 0,
        }
    }

    /// The `<body>` element
    pub fn body(&self) -> NodeId {
        self.root
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        let slot = self.slots.get(id.index)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_ref()
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let slot = self.slots.get_mut(id.index)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_mut()
    }

    /// Number of live nodes, `<body>` included
    pub fn node_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Allocated slots, live or free
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.node(id)?.kind {
            NodeKind::Element(e) => Some(e),
            NodeKind::Text(_) => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Element(e) => Some(e),
            NodeKind::Text(_) => None,
        }
    }

    fn push_node(&mut self, parent: Option<NodeId>, kind: NodeKind) -> NodeId {
        let node = Node {
            parent,
            children: Vec::new(),
            kind,
        };
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.node = Some(node);
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeId {
                    index: self.slots.len() - 1,
                    generation: 0,
                }
            }
        };
        if let Some(p) = parent {
            if let Some(parent_node) = self.node_mut(p) {
                parent_node.children.push(id);
            }
        }
        id
    }

    // ------------------------------------------------------------------------
    // Layout
    // ------------------------------------------------------------------------

    /// Mark the current tree as laid out. Structural mutations commit on
    /// return, so nodes created before this call are ready for widgets.
    pub fn commit_layout(&mut self) -> u64 {
        self.layout_epoch += 1;
        self.layout_epoch
    }

    pub fn layout_epoch(&self) -> u64 {
        self.layout_epoch
    }

    /// Generate a document-unique id with the given prefix
    pub fn generate_id(&mut self, prefix: &str) -> String {
        self.next_generated_id += 1;
        format!("{}-{}", prefix, self.next_generated_id)
    }

    // ------------------------------------------------------------------------
    // Tree structure
    // ------------------------------------------------------------------------

    /// Create a `<div id=...>` under `<body>` to host a component
    pub fn create_container(&mut self, id: &str) -> NodeId {
        let node = self.push_node(
            Some(self.root),
            NodeKind::Element(Element::from_markup(&el("div").attr("id", id))),
        );
        self.commit_layout();
        node
    }

    pub fn is_alive(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Alive and reachable from `<body>`
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            let node = match self.node(current) {
                Some(n) => n,
                None => return false,
            };
            if current == self.root {
                return true;
            }
            match node.parent {
                Some(p) => current = p,
                None => return false,
            }
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id).map(|n| n.children.clone()).unwrap_or_default()
    }

    /// Replace all children of `container` with `markup` (the `innerHTML`
    /// equivalent). Returns the new top-level nodes.
    pub fn set_content(&mut self, container: NodeId, markup: &Markup) -> Vec<NodeId> {
        if !self.is_alive(container) {
            return Vec::new();
        }
        self.clear_children(container);
        let created = self.append_markup(container, markup);
        self.commit_layout();
        created
    }

    /// Append `markup` as the last children of `parent`
    pub fn append_markup(&mut self, parent: NodeId, markup: &Markup) -> Vec<NodeId> {
        let mut created = Vec::new();
        if self.is_alive(parent) {
            self.instantiate(markup, parent, &mut created);
            self.commit_layout();
        }
        created
    }

    /// Replace `node` in place with `markup`. Returns the first new node.
    pub fn replace_node(&mut self, node: NodeId, markup: &Markup) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let index = self.node(parent)?.children.iter().position(|c| *c == node)?;
        self.remove(node);
        let created = self.append_markup(parent, markup);
        // Move the freshly appended nodes back to the old position
        if let Some(p) = self.node_mut(parent) {
            let tail_start = p.children.len() - created.len();
            let tail: Vec<NodeId> = p.children.drain(tail_start..).collect();
            for (offset, child) in tail.into_iter().enumerate() {
                p.children.insert(index + offset, child);
            }
        }
        created.first().copied()
    }

    fn instantiate(&mut self, markup: &Markup, parent: NodeId, out: &mut Vec<NodeId>) {
        match markup {
            Markup::Text(t) => {
                out.push(self.push_node(Some(parent), NodeKind::Text(t.clone())));
            }
            Markup::Fragment(items) => {
                for item in items {
                    self.instantiate(item, parent, out);
                }
            }
            Markup::Element(el) => {
                let mut element = Element::from_markup(el);
                if el.tag == "textarea" {
                    // Textarea children are its initial value
                    element.value = el
                        .children
                        .iter()
                        .map(|c| match c {
                            Markup::Text(t) => t.clone(),
                            other => other.to_string(),
                        })
                        .collect();
                }
                let id = self.push_node(Some(parent), NodeKind::Element(element));
                if el.tag != "textarea" && !is_void(&el.tag) {
                    let mut ignored = Vec::new();
                    for child in &el.children {
                        self.instantiate(child, id, &mut ignored);
                    }
                }
                out.push(id);
            }
        }
    }

    /// Remove all children of `node`
    pub fn clear_children(&mut self, node: NodeId) {
        for child in self.children(node) {
            self.kill(child);
        }
        if let Some(n) = self.node_mut(node) {
            n.children.clear();
        }
    }

    /// Detach `node` from its parent and drop its subtree
    pub fn remove(&mut self, node: NodeId) {
        if node == self.root || !self.is_alive(node) {
            return;
        }
        if let Some(parent) = self.parent(node) {
            if let Some(p) = self.node_mut(parent) {
                p.children.retain(|c| *c != node);
            }
        }
        self.kill(node);
    }

    /// Free `node` and its subtree, returning the slots for reuse
    fn kill(&mut self, node: NodeId) {
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if current == self.root || self.node(current).is_none() {
                continue;
            }
            let slot = &mut self.slots[current.index];
            if let Some(n) = slot.node.take() {
                stack.extend(n.children);
            }
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(current.index);
            if self.focused == Some(current) {
                self.focused = None;
            }
        }
    }

    /// Move an existing node (with its subtree) to the end of `new_parent`
    pub fn move_node(&mut self, node: NodeId, new_parent: NodeId) -> bool {
        if !self.is_alive(node) || !self.is_alive(new_parent) || node == self.root {
            return false;
        }
        // Refuse to move a node into its own subtree
        let mut cursor = Some(new_parent);
        while let Some(c) = cursor {
            if c == node {
                return false;
            }
            cursor = self.parent(c);
        }
        if let Some(old_parent) = self.parent(node) {
            if let Some(p) = self.node_mut(old_parent) {
                p.children.retain(|c| *c != node);
            }
        }
        if let Some(n) = self.node_mut(node) {
            n.parent = Some(new_parent);
        }
        if let Some(p) = self.node_mut(new_parent) {
            p.children.push(node);
        }
        true
    }

    // ------------------------------------------------------------------------
    // Attributes and classes
    // ------------------------------------------------------------------------

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|e| e.tag.as_str())
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node)?.attr(name)
    }

    pub fn has_attr(&self, node: NodeId, name: &str) -> bool {
        self.attr(node, name).is_some()
    }

    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(e) = self.element_mut(node) {
            e.attrs.insert(name.to_string(), value.to_string());
        }
    }

    pub fn remove_attr(&mut self, node: NodeId, name: &str) {
        if let Some(e) = self.element_mut(node) {
            e.attrs.shift_remove(name);
        }
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) {
        if let Some(e) = self.element_mut(node) {
            if !e.has_class(class) {
                e.classes.push(class.to_string());
            }
        }
    }

    pub fn remove_class(&mut self, node: NodeId, class: &str) {
        if let Some(e) = self.element_mut(node) {
            e.classes.retain(|c| c != class);
        }
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.element(node).map(|e| e.has_class(class)).unwrap_or(false)
    }

    pub fn toggle_class(&mut self, node: NodeId, class: &str, on: bool) {
        if on {
            self.add_class(node, class);
        } else {
            self.remove_class(node, class);
        }
    }

    /// Display toggling (`hidden` attribute)
    pub fn set_hidden(&mut self, node: NodeId, hidden: bool) {
        if let Some(e) = self.element_mut(node) {
            e.hidden = hidden;
        }
    }

    pub fn is_hidden(&self, node: NodeId) -> bool {
        self.element(node).map(|e| e.hidden).unwrap_or(false)
    }

    // ------------------------------------------------------------------------
    // Form control state
    // ------------------------------------------------------------------------

    /// Current value of an input/textarea/select
    pub fn value(&self, node: NodeId) -> Option<String> {
        let element = self.element(node)?;
        if element.tag == "select" {
            if let Some(selected) = self.selected_values(node).into_iter().next() {
                return Some(selected);
            }
            let first = self.options(node).into_iter().next()?;
            let option = self.element(first)?;
            return Some(option_value(self, first, option));
        }
        Some(element.value.clone())
    }

    pub fn set_value(&mut self, node: NodeId, value: &str) {
        if self.tag(node) == Some("select") {
            self.set_selected_values(node, &[value.to_string()]);
            return;
        }
        if let Some(e) = self.element_mut(node) {
            e.value = value.to_string();
        }
    }

    pub fn checked(&self, node: NodeId) -> bool {
        self.element(node).map(|e| e.checked).unwrap_or(false)
    }

    pub fn set_checked(&mut self, node: NodeId, checked: bool) {
        if let Some(e) = self.element_mut(node) {
            e.checked = checked;
        }
    }

    fn options(&self, select: NodeId) -> Vec<NodeId> {
        self.find_all(select, |_, e| e.tag == "option")
    }

    /// Values of the selected `<option>`s of a select
    pub fn selected_values(&self, select: NodeId) -> Vec<String> {
        self.options(select)
            .into_iter()
            .filter_map(|o| {
                let e = self.element(o)?;
                if e.selected {
                    Some(option_value(self, o, e))
                } else {
                    None
                }
            })
            .collect()
    }

    pub fn set_selected_values(&mut self, select: NodeId, values: &[String]) {
        let multiple = self.has_attr(select, "multiple");
        let mut matched = false;
        for option in self.options(select) {
            let value = match self.element(option) {
                Some(e) => option_value(self, option, e),
                None => continue,
            };
            let on = values.contains(&value) && (multiple || !matched);
            matched |= on;
            if let Some(e) = self.element_mut(option) {
                e.selected = on;
            }
        }
    }

    // ------------------------------------------------------------------------
    // Text and focus
    // ------------------------------------------------------------------------

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        if let Some(n) = self.node(node) {
            match &n.kind {
                NodeKind::Text(t) => out.push_str(t),
                NodeKind::Element(_) => {
                    for child in &n.children {
                        self.collect_text(*child, out);
                    }
                }
            }
        }
    }

    /// Replace the children of `node` with a single text node
    pub fn set_text(&mut self, node: NodeId, value: &str) {
        if !self.is_alive(node) {
            return;
        }
        self.clear_children(node);
        if !value.is_empty() {
            self.push_node(Some(node), NodeKind::Text(value.to_string()));
        }
    }

    pub fn focus(&mut self, node: NodeId) {
        if self.is_attached(node) {
            self.focused = Some(node);
        }
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.focused.filter(|n| self.is_alive(*n))
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// All descendants of `scope` in document order (excluding `scope`)
    pub fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(scope).into_iter().rev().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            if let Some(n) = self.node(current) {
                stack.extend(n.children.iter().rev().copied());
            }
        }
        out
    }

    /// Elements under `scope` matching `pred`, in document order
    pub fn find_all(&self, scope: NodeId, pred: impl Fn(NodeId, &Element) -> bool) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|id| self.element(*id).map(|e| pred(*id, e)).unwrap_or(false))
            .collect()
    }

    pub fn find_first(&self, scope: NodeId, pred: impl Fn(NodeId, &Element) -> bool) -> Option<NodeId> {
        self.find_all(scope, pred).into_iter().next()
    }

    /// Elements carrying attribute `name` (optionally equal to `value`)
    pub fn find_by_attr(&self, scope: NodeId, name: &str, value: Option<&str>) -> Vec<NodeId> {
        self.find_all(scope, |_, e| match (e.attr(name), value) {
            (Some(_), None) => true,
            (Some(actual), Some(expected)) => actual == expected,
            (None, _) => false,
        })
    }

    pub fn find_first_by_attr(&self, scope: NodeId, name: &str, value: &str) -> Option<NodeId> {
        self.find_by_attr(scope, name, Some(value)).into_iter().next()
    }

    pub fn find_by_class(&self, scope: NodeId, class: &str) -> Vec<NodeId> {
        self.find_all(scope, |_, e| e.has_class(class))
    }

    pub fn find_by_tag(&self, scope: NodeId, tag: &str) -> Vec<NodeId> {
        self.find_all(scope, |_, e| e.tag == tag)
    }

    /// Element with the given `id` attribute inside `scope`
    pub fn element_by_id(&self, scope: NodeId, id: &str) -> Option<NodeId> {
        self.find_first_by_attr(scope, "id", id)
    }

    /// Resolve a `#id` selector from `<body>`
    pub fn select(&self, selector: &str) -> Option<NodeId> {
        let id = selector.strip_prefix('#').unwrap_or(selector);
        self.element_by_id(self.root, id)
    }

    /// `node` or its nearest ancestor matching `pred`
    pub fn closest(&self, node: NodeId, pred: impl Fn(&Element) -> bool) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(c) = current {
            if let Some(e) = self.element(c) {
                if pred(e) {
                    return Some(c);
                }
            }
            current = self.parent(c);
        }
        None
    }

    pub fn closest_with_attr(&self, node: NodeId, name: &str) -> Option<NodeId> {
        self.closest(node, |e| e.attr(name).is_some())
    }

    /// True if `node` is `ancestor` or lies inside it
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(c) = current {
            if c == ancestor {
                return true;
            }
            current = self.parent(c);
        }
        false
    }

    // ------------------------------------------------------------------------
    // Serialization
    // ------------------------------------------------------------------------

    /// Outer HTML of `node` including live form state
    pub fn to_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    /// HTML of the children of `node`
    pub fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(node) {
            self.write_html(child, &mut out);
        }
        out
    }

    fn write_html(&self, node: NodeId, out: &mut String) {
        let n = match self.node(node) {
            Some(n) => n,
            None => return,
        };
        match &n.kind {
            NodeKind::Text(t) => out.push_str(&escape_text(t)),
            NodeKind::Element(e) => {
                let mut attrs: Vec<(String, String)> =
                    e.attrs.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                if e.tag == "input" && !e.value.is_empty() {
                    attrs.push(("value".to_string(), e.value.clone()));
                }
                if e.checked {
                    attrs.push(("checked".to_string(), String::new()));
                }
                if e.selected {
                    attrs.push(("selected".to_string(), String::new()));
                }
                if e.hidden {
                    attrs.push(("hidden".to_string(), String::new()));
                }
                let _ = write_open_tag(out, &e.tag, &e.classes, &attrs);
                if is_void(&e.tag) {
                    return;
                }
                if e.tag == "textarea" {
                    out.push_str(&escape_text(&e.value));
                } else {
                    for child in &n.children {
                        self.write_html(*child, out);
                    }
                }
                let _ = write!(out, "</{}>", e.tag);
            }
        }
    }
}

fn option_value(doc: &Document, node: NodeId, option: &Element) -> String {
    match option.attr("value") {
        Some(v) => v.to_string(),
        None => doc.text_content(node),
    }
}

// ============================================================================
// Shared handle
// ============================================================================

/// Clonable handle to a document shared by the components on one page
#[derive(Debug, Clone, Default)]
pub struct Dom(Rc<RefCell<Document>>);

impl Dom {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn borrow(&self) -> Ref<'_, Document> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Document> {
        self.0.borrow_mut()
    }

    /// Create a hosting `<div id=...>` and return it
    pub fn create_container(&self, id: &str) -> NodeId {
        self.borrow_mut().create_container(id)
    }

    pub fn resolve(&self, container: &Container) -> Option<NodeId> {
        let doc = self.borrow();
        match container {
            Container::Node(id) => Some(*id).filter(|n| doc.is_alive(*n)),
            Container::Selector(sel) => doc.select(sel),
        }
    }
}

/// Where a component mounts: an element or a `#id` selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Container {
    Node(NodeId),
    Selector(String),
}

impl Container {
    pub fn describe(&self) -> String {
        match self {
            Container::Node(id) => format!("node {}", id.index),
            Container::Selector(sel) => sel.clone(),
        }
    }
}

impl From<NodeId> for Container {
    fn from(id: NodeId) -> Self {
        Container::Node(id)
    }
}

impl From<&str> for Container {
    fn from(sel: &str) -> Self {
        Container::Selector(sel.to_string())
    }
}

impl From<String> for Container {
    fn from(sel: String) -> Self {
        Container::Selector(sel)
    }
}
