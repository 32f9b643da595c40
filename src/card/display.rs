//! Read-only card for a single record

use std::fmt;
use std::rc::Rc;
use tracing::{debug, warn};

use super::field::FieldSpec;
use super::field_manager::FieldManager;
use super::form::resolve_container;
use super::templates::display::{self as display_tpl, DisplayLayout};
use super::widgets::WidgetRegistry;
use super::{action_target, Item, ItemCallback};
use crate::dom::{Container, Dom, Markup, NodeId};
use crate::error::ConfigError;
use crate::settings::Settings;

const COMPONENT: &str = "CardDisplay";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    #[default]
    View,
    /// Header, image and actions only
    Compact,
}

impl DisplayMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayMode::View => "view",
            DisplayMode::Compact => "compact",
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Replaces the standard body; structured fields inside still get widgets
pub type DisplayTemplate = Rc<dyn Fn(&Item, DisplayMode) -> Markup>;

pub struct DisplayConfig {
    pub fields: Vec<FieldSpec>,
    pub item: Option<Item>,
    pub mode: DisplayMode,
    pub layout: DisplayLayout,
    pub template: Option<DisplayTemplate>,
    pub settings: Settings,
    pub registry: Option<Rc<WidgetRegistry>>,
    pub on_edit: Option<ItemCallback>,
    pub on_delete: Option<ItemCallback>,
    /// Custom actions: called with the action name and the item
    pub on_action: Option<Box<dyn FnMut(&str, &Item)>>,
}

impl DisplayConfig {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self {
            fields,
            item: None,
            mode: DisplayMode::View,
            layout: DisplayLayout::default(),
            template: None,
            settings: Settings::default(),
            registry: None,
            on_edit: None,
            on_delete: None,
            on_action: None,
        }
    }

    pub fn with_item(mut self, item: Item) -> Self {
        self.item = Some(item);
        self
    }

    pub fn with_mode(mut self, mode: DisplayMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_layout(mut self, layout: DisplayLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_template(mut self, template: impl Fn(&Item, DisplayMode) -> Markup + 'static) -> Self {
        self.template = Some(Rc::new(template));
        self
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_registry(mut self, registry: Rc<WidgetRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn on_edit(mut self, f: impl FnMut(&Item) + 'static) -> Self {
        self.on_edit = Some(Box::new(f));
        self
    }

    pub fn on_delete(mut self, f: impl FnMut(&Item) + 'static) -> Self {
        self.on_delete = Some(Box::new(f));
        self
    }

    pub fn on_action(mut self, f: impl FnMut(&str, &Item) + 'static) -> Self {
        self.on_action = Some(Box::new(f));
        self
    }
}

pub struct CardDisplay {
    dom: Dom,
    container: NodeId,
    config: DisplayConfig,
    item: Option<Item>,
    mode: DisplayMode,
    widgets: FieldManager,
}

impl CardDisplay {
    pub fn new(dom: &Dom, container: impl Into<Container>, mut config: DisplayConfig) -> Result<Self, ConfigError> {
        let container = resolve_container(dom, COMPONENT, container.into())?;
        // A layout left at the default placeholder follows the settings
        if config.layout.placeholder == DisplayLayout::default().placeholder {
            config.layout.placeholder = config.settings.empty_placeholder.clone();
        }
        let registry = config
            .registry
            .clone()
            .unwrap_or_else(|| Rc::new(WidgetRegistry::with_builtins(&config.settings)));
        let item = config.item.take();
        let mode = config.mode;
        let mut display = Self {
            dom: dom.clone(),
            container,
            config,
            item,
            mode,
            widgets: FieldManager::new(container, registry),
        };
        display.render();
        Ok(display)
    }

    fn markup(&self) -> Markup {
        let item = match &self.item {
            Some(item) => item,
            None => return display_tpl::empty(&self.config.layout).into(),
        };
        let body = match (&self.config.template, self.mode) {
            (Some(template), mode) => template(item, mode),
            (None, DisplayMode::View) => {
                display_tpl::body(&self.config.layout, &self.config.fields, item, &self.config.settings.locale)
            }
            (None, DisplayMode::Compact) => {
                let id = super::item_id(item);
                crate::dom::fragment(vec![
                    display_tpl::header(&self.config.layout, item),
                    display_tpl::image(&self.config.layout, item),
                    display_tpl::actions(&self.config.layout, id.as_deref()),
                ])
            }
        };
        display_tpl::frame(item, self.mode.as_str(), body).into()
    }

    /// Replace the rendered card and re-run widget initialization
    pub fn render(&mut self) {
        let markup = self.markup();
        let mut doc = self.dom.borrow_mut();
        self.widgets.destroy_all(&mut doc);
        doc.set_content(self.container, &markup);
        let mounted = self.widgets.auto_init_fields(&mut doc);
        debug!(component = COMPONENT, mode = %self.mode, widgets = mounted, "display rendered");
    }

    pub fn get_item(&self) -> Option<&Item> {
        self.item.as_ref()
    }

    pub fn set_item(&mut self, item: Option<Item>) {
        self.item = item;
        self.render();
    }

    /// Merge `partial` into the shown item
    pub fn update_item(&mut self, partial: Item) -> bool {
        match self.item.as_mut() {
            Some(item) => {
                item.extend(partial);
                self.render();
                true
            }
            None => {
                warn!(component = COMPONENT, "update with no item shown");
                false
            }
        }
    }

    pub fn clear(&mut self) {
        self.set_item(None);
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: DisplayMode) {
        if self.mode != mode {
            self.mode = mode;
            self.render();
        }
    }

    pub fn widgets(&self) -> &FieldManager {
        &self.widgets
    }

    /// A click inside the card: widget chrome, then edit, delete or a
    /// custom action
    pub fn handle_action(&mut self, node: NodeId) -> bool {
        if self.widgets.dispatch_action(&mut self.dom.borrow_mut(), node) {
            return true;
        }
        let action = match action_target(&self.dom.borrow(), node) {
            Some((action, _, _)) => action,
            None => return false,
        };
        let item = match &self.item {
            Some(item) => item,
            None => return false,
        };
        match action.as_str() {
            "edit" => match self.config.on_edit.as_mut() {
                Some(cb) => {
                    cb(item);
                    true
                }
                None => false,
            },
            "delete" => match self.config.on_delete.as_mut() {
                Some(cb) => {
                    cb(item);
                    true
                }
                None => false,
            },
            other if self.config.layout.actions.iter().any(|a| a.action == other) => {
                match self.config.on_action.as_mut() {
                    Some(cb) => {
                        cb(other, item);
                        true
                    }
                    None => false,
                }
            }
            other => {
                debug!(component = COMPONENT, action = other, "unhandled action");
                false
            }
        }
    }

    pub fn destroy(&mut self) {
        let mut doc = self.dom.borrow_mut();
        self.widgets.destroy_all(&mut doc);
        doc.clear_children(self.container);
        drop(doc);
        self.item = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::field::FieldType;
    use crate::card::templates::display::CustomAction;
    use crate::card::{ACTION_ATTR, ITEM_ID_ATTR};
    use crate::dom::el;
    use serde_json::json;
    use std::cell::RefCell;

    fn fields() -> Vec<FieldSpec> {
        vec![
            FieldSpec::text("name").with_label("Nome"),
            FieldSpec::new("email", FieldType::Email),
            FieldSpec::new("bio", FieldType::Textarea),
            FieldSpec::new("primary_color", FieldType::Color).with_label("Cor primária"),
        ]
    }

    fn profile() -> Item {
        serde_json::from_value(json!({
            "id": "p1",
            "name": "Dra. Ana Souza",
            "email": "ana@exemplo.com",
            "bio": "",
            "primary_color": "#1a73e8"
        }))
        .unwrap()
    }

    fn layout() -> DisplayLayout {
        DisplayLayout {
            title_field: Some("name".to_string()),
            allow_edit: true,
            allow_delete: true,
            actions: vec![CustomAction::new("share", "Compartilhar")],
            ..Default::default()
        }
    }

    fn setup() -> (Dom, NodeId) {
        let dom = Dom::new();
        let c = dom.create_container("profile");
        (dom, c)
    }

    #[test]
    fn test_empty_state_without_item() {
        let (dom, c) = setup();
        let display = CardDisplay::new(&dom, c, DisplayConfig::new(fields())).unwrap();
        assert!(display.get_item().is_none());
        assert!(dom.borrow().inner_html(c).contains("Nenhum registro selecionado"));
    }

    #[test]
    fn test_renders_fields_and_skips_blank() {
        let (dom, c) = setup();
        let display = CardDisplay::new(
            &dom,
            c,
            DisplayConfig::new(fields()).with_item(profile()).with_layout(layout()),
        )
        .unwrap();
        let html = dom.borrow().inner_html(c);
        assert!(html.contains("Dra. Ana Souza"));
        assert!(html.contains("mailto:ana@exemplo.com"));
        assert!(!html.contains("data-field=\"bio\""));
        // The color field is upgraded into a live widget
        assert_eq!(display.widgets().len(), 1);
    }

    #[test]
    fn test_set_item_rebuilds_widgets_once() {
        let (dom, c) = setup();
        let mut display = CardDisplay::new(&dom, c, DisplayConfig::new(fields()).with_item(profile())).unwrap();
        display.update_item(serde_json::from_value(json!({"name": "Ana S."})).unwrap());
        display.render();
        assert_eq!(display.widgets().len(), 1);
        display.clear();
        assert!(display.widgets().is_empty());
        assert!(dom.borrow().find_first_by_attr(c, ITEM_ID_ATTR, "p1").is_none());
    }

    #[test]
    fn test_compact_mode_hides_field_list() {
        let (dom, c) = setup();
        let mut display = CardDisplay::new(
            &dom,
            c,
            DisplayConfig::new(fields()).with_item(profile()).with_layout(layout()),
        )
        .unwrap();
        display.set_mode(DisplayMode::Compact);
        let html = dom.borrow().inner_html(c);
        assert!(html.contains("mode-compact"));
        assert!(!html.contains("display-fields"));
        assert!(html.contains("Dra. Ana Souza"));
    }

    #[test]
    fn test_custom_template_still_gets_widgets() {
        let (dom, c) = setup();
        let color = FieldSpec::new("primary_color", FieldType::Color);
        let display = CardDisplay::new(
            &dom,
            c,
            DisplayConfig::new(fields()).with_item(profile()).with_template(move |item, _| {
                el("section")
                    .class("brand-card")
                    .child(display_tpl::format_value(
                        &color,
                        &item["primary_color"],
                        &Default::default(),
                        "-",
                    ))
                    .into()
            }),
        )
        .unwrap();
        assert!(dom.borrow().inner_html(c).contains("brand-card"));
        assert_eq!(display.widgets().len(), 1);
    }

    #[test]
    fn test_actions_reach_callbacks() {
        let (dom, c) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));
        let (edit_log, action_log) = (log.clone(), log.clone());
        let mut display = CardDisplay::new(
            &dom,
            c,
            DisplayConfig::new(fields())
                .with_item(profile())
                .with_layout(layout())
                .on_edit(move |item| edit_log.borrow_mut().push(format!("edit {}", item["id"])))
                .on_action(move |action, _| action_log.borrow_mut().push(action.to_string())),
        )
        .unwrap();
        let edit = dom.borrow().find_first_by_attr(c, ACTION_ATTR, "edit").unwrap();
        let share = dom.borrow().find_first_by_attr(c, ACTION_ATTR, "share").unwrap();
        let delete = dom.borrow().find_first_by_attr(c, ACTION_ATTR, "delete").unwrap();
        assert!(display.handle_action(edit));
        assert!(display.handle_action(share));
        // No delete callback configured
        assert!(!display.handle_action(delete));
        assert_eq!(*log.borrow(), vec!["edit \"p1\"".to_string(), "share".to_string()]);
    }
}
