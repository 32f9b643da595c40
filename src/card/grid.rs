//! Selectable grid of cards with client-side text filtering

use indexmap::IndexSet;
use std::rc::Rc;
use tracing::{debug, warn};

use super::form::resolve_container;
use super::templates::grid::{self as grid_tpl, GridLayout};
use super::{action_target, ensure_id, item_id, Item, ItemCallback, ITEM_ID_ATTR, ROLE_ATTR};
use crate::dom::{Container, Dom, Markup, NodeId};
use crate::error::ConfigError;
use crate::util::contains_ignore_case;

const COMPONENT: &str = "CardGrid";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionMode {
    /// Clicks report `on_item_clicked` only
    None,
    #[default]
    Single,
    Multiple,
}

/// Custom card markup in place of the standard grid item
pub type GridItemTemplate = Rc<dyn Fn(&Item, bool) -> Markup>;

pub struct GridConfig {
    pub items: Vec<Item>,
    pub layout: GridLayout,
    pub selection: SelectionMode,
    pub template: Option<GridItemTemplate>,
    pub on_item_selected: Option<ItemCallback>,
    pub on_item_clicked: Option<ItemCallback>,
    /// Called with the selected items, in selection order
    pub on_selection_changed: Option<Box<dyn FnMut(&[Item])>>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            layout: GridLayout::default(),
            selection: SelectionMode::Single,
            template: None,
            on_item_selected: None,
            on_item_clicked: None,
            on_selection_changed: None,
        }
    }
}

impl GridConfig {
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            items,
            ..Default::default()
        }
    }

    pub fn with_layout(mut self, layout: GridLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_selection(mut self, selection: SelectionMode) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_template(mut self, template: impl Fn(&Item, bool) -> Markup + 'static) -> Self {
        self.template = Some(Rc::new(template));
        self
    }

    pub fn on_item_selected(mut self, f: impl FnMut(&Item) + 'static) -> Self {
        self.on_item_selected = Some(Box::new(f));
        self
    }

    pub fn on_item_clicked(mut self, f: impl FnMut(&Item) + 'static) -> Self {
        self.on_item_clicked = Some(Box::new(f));
        self
    }

    pub fn on_selection_changed(mut self, f: impl FnMut(&[Item]) + 'static) -> Self {
        self.on_selection_changed = Some(Box::new(f));
        self
    }
}

pub struct CardGrid {
    dom: Dom,
    container: NodeId,
    config: GridConfig,
    items: Vec<Item>,
    selected: IndexSet<String>,
    filter: String,
}

impl CardGrid {
    pub fn new(dom: &Dom, container: impl Into<Container>, mut config: GridConfig) -> Result<Self, ConfigError> {
        let container = resolve_container(dom, COMPONENT, container.into())?;
        if config.selection == SelectionMode::None {
            config.layout.selectable = false;
        }
        let mut items = std::mem::take(&mut config.items);
        for item in items.iter_mut() {
            ensure_id(item);
        }
        let mut grid = Self {
            dom: dom.clone(),
            container,
            config,
            items,
            selected: IndexSet::new(),
            filter: String::new(),
        };
        grid.render();
        Ok(grid)
    }

    fn card(&self, item: &Item, id: &str) -> Markup {
        let selected = self.selected.contains(id);
        match &self.config.template {
            Some(template) => template(item, selected),
            None => grid_tpl::grid_item(&self.config.layout, item, id, selected),
        }
    }

    pub fn render(&mut self) {
        let cards: Vec<Markup> = self
            .items
            .iter()
            .filter_map(|item| item_id(item).map(|id| self.card(item, &id)))
            .collect();
        let markup = grid_tpl::grid(&self.config.layout, cards);
        self.dom.borrow_mut().set_content(self.container, &markup);
        if !self.filter.is_empty() {
            let query = self.filter.clone();
            self.apply_filter(&query);
        }
    }

    // ------------------------------------------------------------------
    // Items
    // ------------------------------------------------------------------

    pub fn get_items(&self) -> &[Item] {
        &self.items
    }

    pub fn get_item(&self, id: &str) -> Option<&Item> {
        self.items.iter().find(|i| item_id(i).as_deref() == Some(id))
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|i| item_id(i).as_deref() == Some(id))
    }

    /// Replace all items. Selection survives for ids still present.
    pub fn set_items(&mut self, items: Vec<Item>) {
        self.items = items;
        for item in self.items.iter_mut() {
            ensure_id(item);
        }
        let before = self.selected.len();
        let items = &self.items;
        self.selected
            .retain(|id| items.iter().any(|i| item_id(i).as_deref() == Some(id.as_str())));
        self.render();
        if self.selected.len() != before {
            self.notify_selection();
        }
    }

    pub fn add_item(&mut self, mut item: Item) -> String {
        let id = ensure_id(&mut item);
        self.items.push(item);
        self.render();
        id
    }

    /// Merge `partial` into an item and re-render its card
    pub fn update_item(&mut self, id: &str, partial: Item) -> bool {
        let index = match self.position(id) {
            Some(i) => i,
            None => {
                warn!(component = COMPONENT, item_id = id, "update of unknown item");
                return false;
            }
        };
        self.items[index].extend(partial);
        let markup = self.card(&self.items[index], id);
        let replaced = {
            let mut doc = self.dom.borrow_mut();
            match doc.find_first_by_attr(self.container, ITEM_ID_ATTR, id) {
                Some(node) => doc.replace_node(node, &markup).is_some(),
                None => false,
            }
        };
        if replaced && !self.filter.is_empty() {
            let query = self.filter.clone();
            self.apply_filter(&query);
        } else if !replaced {
            self.render();
        }
        true
    }

    pub fn remove_item(&mut self, id: &str) -> Option<Item> {
        let index = self.position(id)?;
        let item = self.items.remove(index);
        let was_selected = self.selected.shift_remove(id);
        self.render();
        if was_selected {
            self.notify_selection();
        }
        Some(item)
    }

    pub fn clear(&mut self) {
        self.items.clear();
        let had_selection = !self.selected.is_empty();
        self.selected.clear();
        self.render();
        if had_selection {
            self.notify_selection();
        }
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    pub fn selection_mode(&self) -> SelectionMode {
        self.config.selection
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    pub fn selected_ids(&self) -> Vec<String> {
        self.selected.iter().cloned().collect()
    }

    /// Selected items in selection order
    pub fn get_selected_items(&self) -> Vec<Item> {
        self.selected.iter().filter_map(|id| self.get_item(id).cloned()).collect()
    }

    fn mark(&self, id: &str, on: bool) {
        let mut doc = self.dom.borrow_mut();
        if let Some(node) = doc.find_first_by_attr(self.container, ITEM_ID_ATTR, id) {
            doc.toggle_class(node, "selected", on);
            doc.set_attr(node, "aria-selected", if on { "true" } else { "false" });
        }
    }

    fn notify_selection(&mut self) {
        let selected = self.get_selected_items();
        if let Some(cb) = self.config.on_selection_changed.as_mut() {
            cb(&selected);
        }
    }

    /// Select an item. In single mode this replaces the current selection.
    pub fn select_item(&mut self, id: &str) -> bool {
        if self.config.selection == SelectionMode::None {
            return false;
        }
        let item = match self.get_item(id) {
            Some(item) => item.clone(),
            None => {
                warn!(component = COMPONENT, item_id = id, "select of unknown item");
                return false;
            }
        };
        if self.selected.contains(id) {
            return false;
        }
        if self.config.selection == SelectionMode::Single {
            let previous: Vec<String> = self.selected.drain(..).collect();
            for other in previous {
                self.mark(&other, false);
            }
        }
        self.selected.insert(id.to_string());
        self.mark(id, true);
        debug!(component = COMPONENT, item_id = id, selected = self.selected.len(), "item selected");
        if let Some(cb) = self.config.on_item_selected.as_mut() {
            cb(&item);
        }
        self.notify_selection();
        true
    }

    pub fn deselect_item(&mut self, id: &str) -> bool {
        if !self.selected.shift_remove(id) {
            return false;
        }
        self.mark(id, false);
        self.notify_selection();
        true
    }

    pub fn toggle_selection(&mut self, id: &str) -> bool {
        if self.selected.contains(id) {
            self.deselect_item(id)
        } else {
            self.select_item(id)
        }
    }

    /// Select every visible item (multiple mode only)
    pub fn select_all(&mut self) -> bool {
        if self.config.selection != SelectionMode::Multiple {
            warn!(component = COMPONENT, mode = ?self.config.selection, "select_all needs multiple selection");
            return false;
        }
        let visible: Vec<String> = {
            let doc = self.dom.borrow();
            doc.find_by_attr(self.container, ITEM_ID_ATTR, None)
                .into_iter()
                .filter(|n| !doc.is_hidden(*n))
                .filter_map(|n| doc.attr(n, ITEM_ID_ATTR).map(String::from))
                .collect()
        };
        let mut changed = false;
        for id in visible {
            if self.selected.insert(id.clone()) {
                self.mark(&id, true);
                changed = true;
            }
        }
        if changed {
            self.notify_selection();
        }
        changed
    }

    pub fn clear_selection(&mut self) {
        if self.selected.is_empty() {
            return;
        }
        let previous: Vec<String> = self.selected.drain(..).collect();
        for id in previous {
            self.mark(&id, false);
        }
        self.notify_selection();
    }

    // ------------------------------------------------------------------
    // Filtering
    // ------------------------------------------------------------------

    fn apply_filter(&mut self, query: &str) -> usize {
        let needle = query.trim();
        let mut doc = self.dom.borrow_mut();
        let cards = doc.find_by_attr(self.container, ITEM_ID_ATTR, None);
        let mut visible = 0;
        for card in cards {
            let matches = needle.is_empty()
                || doc
                    .find_by_attr(card, ROLE_ATTR, None)
                    .into_iter()
                    .filter(|n| matches!(doc.attr(*n, ROLE_ATTR), Some("title") | Some("subtitle")))
                    .any(|n| contains_ignore_case(&doc.text_content(n), needle));
            doc.set_hidden(card, !matches);
            if matches {
                visible += 1;
            }
        }
        visible
    }

    /// Hide cards whose title and subtitle don't contain `query`
    /// (case-insensitive). An empty query shows everything. Returns the
    /// number of visible cards.
    pub fn filter(&mut self, query: &str) -> usize {
        self.filter = query.trim().to_string();
        let visible = self.apply_filter(query);
        debug!(component = COMPONENT, query, visible, "grid filtered");
        visible
    }

    pub fn visible_count(&self) -> usize {
        let doc = self.dom.borrow();
        doc.find_by_attr(self.container, ITEM_ID_ATTR, None)
            .into_iter()
            .filter(|n| !doc.is_hidden(*n))
            .count()
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// A click inside the grid. `select` toggles in multiple mode and
    /// selects in single mode; every card click reports `on_item_clicked`.
    pub fn handle_action(&mut self, node: NodeId) -> bool {
        let (action, id) = match action_target(&self.dom.borrow(), node) {
            Some((action, Some(id), _)) => (action, id),
            _ => return false,
        };
        let item = match self.get_item(&id) {
            Some(item) => item.clone(),
            None => return false,
        };
        match action.as_str() {
            "select" => {
                match self.config.selection {
                    SelectionMode::Multiple => {
                        self.toggle_selection(&id);
                    }
                    SelectionMode::Single => {
                        self.select_item(&id);
                    }
                    SelectionMode::None => {}
                }
                if let Some(cb) = self.config.on_item_clicked.as_mut() {
                    cb(&item);
                }
                true
            }
            "click" => {
                if let Some(cb) = self.config.on_item_clicked.as_mut() {
                    cb(&item);
                }
                true
            }
            _ => false,
        }
    }

    pub fn destroy(&mut self) {
        self.selected.clear();
        self.dom.borrow_mut().clear_children(self.container);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::el;
    use serde_json::{json, Value};
    use std::cell::RefCell;

    fn items() -> Vec<Item> {
        ["Direito do Consumidor", "Direito Trabalhista", "Planejamento Sucessório"]
            .iter()
            .enumerate()
            .map(|(i, title)| {
                let v = json!({"id": format!("t{}", i + 1), "title": title, "area": if i == 2 { "Família" } else { "Cível" }});
                serde_json::from_value::<Item>(v).unwrap()
            })
            .collect()
    }

    fn grid(selection: SelectionMode) -> (Dom, NodeId, CardGrid) {
        let dom = Dom::new();
        let c = dom.create_container("topics");
        let layout = GridLayout {
            subtitle_field: Some("area".to_string()),
            ..Default::default()
        };
        let g = CardGrid::new(&dom, c, GridConfig::new(items()).with_layout(layout).with_selection(selection)).unwrap();
        (dom, c, g)
    }

    fn card(dom: &Dom, c: NodeId, id: &str) -> NodeId {
        dom.borrow().find_first_by_attr(c, ITEM_ID_ATTR, id).unwrap()
    }

    #[test]
    fn test_missing_container_is_config_error() {
        let dom = Dom::new();
        assert!(matches!(
            CardGrid::new(&dom, "#nowhere", GridConfig::default()),
            Err(ConfigError::ContainerNotFound { .. })
        ));
    }

    #[test]
    fn test_single_selection_replaces_previous() {
        let (dom, c, mut g) = grid(SelectionMode::Single);
        assert!(g.select_item("t1"));
        assert!(g.select_item("t2"));
        assert_eq!(g.selected_ids(), vec!["t2".to_string()]);
        assert!(!dom.borrow().has_class(card(&dom, c, "t1"), "selected"));
        assert!(dom.borrow().has_class(card(&dom, c, "t2"), "selected"));
    }

    #[test]
    fn test_multiple_selection_toggles_and_select_all() {
        let (dom, c, mut g) = grid(SelectionMode::Multiple);
        let t1 = card(&dom, c, "t1");
        assert!(g.handle_action(t1));
        let t3 = card(&dom, c, "t3");
        assert!(g.handle_action(t3));
        assert_eq!(g.selected_ids(), vec!["t1".to_string(), "t3".to_string()]);
        let t1 = card(&dom, c, "t1");
        g.handle_action(t1);
        assert_eq!(g.selected_ids(), vec!["t3".to_string()]);

        assert!(g.select_all());
        assert_eq!(g.get_selected_items().len(), 3);
        g.clear_selection();
        assert!(g.get_selected_items().is_empty());
    }

    #[test]
    fn test_select_all_refused_in_single_mode() {
        let (_dom, _c, mut g) = grid(SelectionMode::Single);
        assert!(!g.select_all());
        assert!(g.selected_ids().is_empty());
    }

    #[test]
    fn test_selection_callbacks() {
        let changes = Rc::new(RefCell::new(Vec::new()));
        let sink = changes.clone();
        let dom = Dom::new();
        let c = dom.create_container("topics");
        let mut g = CardGrid::new(
            &dom,
            c,
            GridConfig::new(items())
                .with_selection(SelectionMode::Multiple)
                .on_selection_changed(move |items| sink.borrow_mut().push(items.len())),
        )
        .unwrap();
        g.select_item("t1");
        g.select_item("t2");
        g.deselect_item("t1");
        g.remove_item("t2");
        assert_eq!(*changes.borrow(), vec![1, 2, 1, 0]);
    }

    #[test]
    fn test_filter_matches_title_and_subtitle() {
        let (_dom, _c, mut g) = grid(SelectionMode::Single);
        assert_eq!(g.filter("direito"), 2);
        assert_eq!(g.filter("FAMÍLIA"), 1);
        assert_eq!(g.visible_count(), 1);
        assert_eq!(g.filter(""), 3);
    }

    #[test]
    fn test_filter_survives_rerender() {
        let (_dom, _c, mut g) = grid(SelectionMode::Single);
        g.filter("sucess");
        g.add_item(serde_json::from_value(json!({"title": "Direito Digital"})).unwrap());
        assert_eq!(g.visible_count(), 1);
    }

    #[test]
    fn test_click_only_mode_reports_clicks() {
        let clicked = Rc::new(RefCell::new(Vec::new()));
        let sink = clicked.clone();
        let dom = Dom::new();
        let c = dom.create_container("topics");
        let mut g = CardGrid::new(
            &dom,
            c,
            GridConfig::new(items())
                .with_selection(SelectionMode::None)
                .on_item_clicked(move |item| sink.borrow_mut().push(item["id"].clone())),
        )
        .unwrap();
        let t2 = card(&dom, c, "t2");
        assert_eq!(dom.borrow().attr(t2, "data-action"), Some("click"));
        assert!(g.handle_action(t2));
        assert!(g.selected_ids().is_empty());
        assert_eq!(*clicked.borrow(), vec![Value::from("t2")]);
    }

    #[test]
    fn test_update_item_rerenders_card() {
        let (dom, c, mut g) = grid(SelectionMode::Single);
        g.select_item("t1");
        let partial: Item = serde_json::from_value(json!({"title": "Consumidor e Bancos"})).unwrap();
        assert!(g.update_item("t1", partial));
        let node = card(&dom, c, "t1");
        assert!(dom.borrow().to_html(node).contains("Consumidor e Bancos"));
        assert!(dom.borrow().has_class(node, "selected"));
    }

    #[test]
    fn test_custom_template() {
        let dom = Dom::new();
        let c = dom.create_container("topics");
        CardGrid::new(
            &dom,
            c,
            GridConfig::new(items()).with_template(|item, _| {
                el("div")
                    .attr(ITEM_ID_ATTR, item_id(item).unwrap_or_default())
                    .attr(ROLE_ATTR, "title")
                    .text(item["title"].as_str().unwrap_or(""))
                    .into()
            }),
        )
        .unwrap();
        assert_eq!(dom.borrow().find_by_attr(c, ITEM_ID_ATTR, None).len(), 3);
    }
}
