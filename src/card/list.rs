//! Expandable list with inline create, edit and delete.
//!
//! Every item is either collapsed or expanded (editing), independently of
//! the others; a separate new-item form can be open at the same time. Each
//! open form gets its own [`FieldManager`] keyed by item id (`new` for the
//! create form) so widgets never leak between items or re-renders.

use futures::future::FutureExt;
use indexmap::IndexSet;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::rc::Rc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use super::field::FieldSpec;
use super::field_manager::FieldManager;
use super::form::{check_fields, make_backup, resolve_container};
use super::templates::list::{self as list_tpl, ListLayout, NEW_ITEM_KEY};
use super::validation::{self, FieldErrors, ValidatorMap, ValidatorSpec};
use super::widgets::WidgetRegistry;
use super::{
    action_target, apply_errors, ensure_id, extract_form_values, focus_first_error, focus_first_field, item_id, pause,
    populate_form, AsyncHook, ConfirmPrompt, ErrorCallback, Item, ItemCallback, ITEM_ID_ATTR,
};
use crate::backup::{list_backup_key, Backup, BackupStore};
use crate::dom::{nothing, Container, Document, Dom, Markup, NodeId};
use crate::error::{ConfigError, SubmitError};
use crate::settings::Settings;

const COMPONENT: &str = "CardList";

/// What a persistence hook is asked to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOperation {
    Create,
    Update,
    Delete,
}

/// Result of a create, save or delete
#[derive(Debug, Clone, PartialEq)]
pub enum ListOutcome {
    Created(String),
    Saved(String),
    Deleted(String),
    /// Validation failed; nothing was persisted
    Invalid(FieldErrors),
    /// The persistence hook rejected with this message
    Failed(String),
    /// The user declined the confirmation prompt
    Cancelled,
    /// No such item (or no open create form)
    NotFound,
    /// The item is already being persisted
    Busy,
}

pub struct ListConfig {
    pub list_type: String,
    pub fields: Vec<FieldSpec>,
    pub validators: ValidatorMap,
    pub items: Vec<Item>,
    pub layout: ListLayout,
    /// Keep items ordered by this field
    pub sort_by: Option<String>,
    pub settings: Settings,
    /// Overrides `settings.confirm_delete`
    pub confirm_delete: Option<bool>,
    pub confirm_message: String,
    pub confirm: Option<ConfirmPrompt>,
    pub backup_enabled: bool,
    pub store: Option<BackupStore>,
    pub registry: Option<Rc<WidgetRegistry>>,
    pub on_persist: Option<AsyncHook<ListOperation>>,
    pub on_item_created: Option<ItemCallback>,
    pub on_item_updated: Option<ItemCallback>,
    pub on_item_deleted: Option<ItemCallback>,
    pub on_error: Option<ErrorCallback>,
}

impl ListConfig {
    pub fn new(list_type: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        Self {
            list_type: list_type.into(),
            fields,
            validators: ValidatorMap::new(),
            items: Vec::new(),
            layout: ListLayout::default(),
            sort_by: None,
            settings: Settings::default(),
            confirm_delete: None,
            confirm_message: "Tem certeza que deseja excluir este item?".to_string(),
            confirm: None,
            backup_enabled: true,
            store: None,
            registry: None,
            on_persist: None,
            on_item_created: None,
            on_item_updated: None,
            on_item_deleted: None,
            on_error: None,
        }
    }

    pub fn with_items(mut self, items: Vec<Item>) -> Self {
        self.items = items;
        self
    }

    pub fn with_layout(mut self, layout: ListLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_validator(mut self, field: impl Into<String>, spec: impl Into<ValidatorSpec>) -> Self {
        self.validators.insert(field.into(), spec.into());
        self
    }

    pub fn with_sort_by(mut self, field: impl Into<String>) -> Self {
        self.sort_by = Some(field.into());
        self
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_confirm_delete(mut self, confirm: bool) -> Self {
        self.confirm_delete = Some(confirm);
        self
    }

    /// Blocking prompt used before deleting
    pub fn with_confirm(mut self, prompt: impl FnMut(&str) -> bool + 'static) -> Self {
        self.confirm = Some(Box::new(prompt));
        self
    }

    pub fn with_backup(mut self, enabled: bool) -> Self {
        self.backup_enabled = enabled;
        self
    }

    pub fn with_store(mut self, store: BackupStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_registry(mut self, registry: Rc<WidgetRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn on_persist<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(ListOperation, Item) -> Fut + 'static,
        Fut: Future<Output = Result<(), SubmitError>> + 'static,
    {
        self.on_persist = Some(Box::new(move |op, item| hook(op, item).boxed_local()));
        self
    }

    pub fn on_item_created(mut self, f: impl FnMut(&Item) + 'static) -> Self {
        self.on_item_created = Some(Box::new(f));
        self
    }

    pub fn on_item_updated(mut self, f: impl FnMut(&Item) + 'static) -> Self {
        self.on_item_updated = Some(Box::new(f));
        self
    }

    pub fn on_item_deleted(mut self, f: impl FnMut(&Item) + 'static) -> Self {
        self.on_item_deleted = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl FnMut(&str) + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            x.as_f64().partial_cmp(&y.as_f64()).unwrap_or(Ordering::Equal)
        }
        (Some(x), Some(y)) => super::value_to_string(x).cmp(&super::value_to_string(y)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub struct CardList {
    dom: Dom,
    container: NodeId,
    config: ListConfig,
    items: Vec<Item>,
    expanded: IndexSet<String>,
    loading: HashSet<String>,
    creating: bool,
    errors: HashMap<String, FieldErrors>,
    managers: HashMap<String, FieldManager>,
    registry: Rc<WidgetRegistry>,
    backup: Option<Backup>,
    destroyed: bool,
}

impl CardList {
    pub fn new(dom: &Dom, container: impl Into<Container>, mut config: ListConfig) -> Result<Self, ConfigError> {
        check_fields(COMPONENT, &config.list_type, &config.fields)?;
        let container = resolve_container(dom, COMPONENT, container.into())?;

        let registry = config
            .registry
            .clone()
            .unwrap_or_else(|| Rc::new(WidgetRegistry::with_builtins(&config.settings)));
        let backup = config.backup_enabled.then(|| {
            make_backup(&config.settings, config.store.clone(), list_backup_key(&config.list_type))
        });
        let mut items = std::mem::take(&mut config.items);
        for item in items.iter_mut() {
            ensure_id(item);
        }

        let mut list = Self {
            dom: dom.clone(),
            container,
            config,
            items,
            expanded: IndexSet::new(),
            loading: HashSet::new(),
            creating: false,
            errors: HashMap::new(),
            managers: HashMap::new(),
            registry,
            backup,
            destroyed: false,
        };
        list.sort();
        list.render();
        list.restore_backup();
        debug!(component = COMPONENT, r#type = %list.config.list_type, items = list.items.len(), "list ready");
        Ok(list)
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    fn row(&self, item: &Item, id: &str) -> Markup {
        if self.expanded.contains(id) {
            let empty = FieldErrors::new();
            list_tpl::item_expanded(
                &self.config.layout,
                &self.config.fields,
                item,
                id,
                self.errors.get(id).unwrap_or(&empty),
                self.loading.contains(id),
            )
        } else {
            list_tpl::item_collapsed(
                &self.config.layout,
                &self.config.fields,
                item,
                id,
                &self.config.settings.locale,
            )
        }
    }

    fn create_markup(&self) -> Markup {
        if !self.creating {
            return nothing();
        }
        let defaults: Item = self
            .config
            .fields
            .iter()
            .filter_map(|f| f.default_value.clone().map(|v| (f.name.clone(), v)))
            .collect();
        let empty = FieldErrors::new();
        list_tpl::create_form(
            &self.config.fields,
            &defaults,
            self.errors.get(NEW_ITEM_KEY).unwrap_or(&empty),
            self.loading.contains(NEW_ITEM_KEY),
        )
    }

    /// Keys of the open forms: expanded items, then `new` if creating
    fn open_keys(&self) -> Vec<String> {
        let mut open: Vec<String> = self.expanded.iter().cloned().collect();
        if self.creating {
            open.push(NEW_ITEM_KEY.to_string());
        }
        open
    }

    /// Re-render the whole list and rebuild widgets for every open form.
    /// Unsaved values in forms that stay open are carried over.
    pub fn render(&mut self) {
        if self.destroyed {
            warn!(component = COMPONENT, "render after destroy ignored");
            return;
        }
        let drafts: HashMap<String, Item> = self
            .open_keys()
            .into_iter()
            .filter_map(|key| self.read_form(&key).map(|values| (key, values)))
            .collect();
        let rows: Vec<Markup> = self
            .items
            .iter()
            .filter_map(|item| item_id(item).map(|id| self.row(item, &id)))
            .collect();
        let markup = list_tpl::list(&self.config.layout, self.create_markup(), rows);

        let mut doc = self.dom.borrow_mut();
        for (_, mut manager) in self.managers.drain() {
            manager.destroy_all(&mut doc);
        }
        doc.set_content(self.container, &markup);
        // CSS height transition of expanding/collapsing rows
        if let Some(root) = doc.find_first(self.container, |_, e| e.has_class("card-list")) {
            let ms = self.config.settings.animation.expand_ms;
            doc.set_attr(root, "style", &format!("--expand-duration: {}ms", ms));
        }
        drop(doc);

        for key in self.open_keys() {
            self.init_widgets(&key, drafts.get(&key));
        }
    }

    fn item_node(&self, doc: &Document, key: &str) -> Option<NodeId> {
        doc.find_first_by_attr(self.container, ITEM_ID_ATTR, key)
    }

    /// Fresh widgets for one open form, then its values: the stored item
    /// overlaid with `draft` when one was captured
    fn init_widgets(&mut self, key: &str, draft: Option<&Item>) {
        let mut doc = self.dom.borrow_mut();
        if let Some(mut old) = self.managers.remove(key) {
            old.destroy_all(&mut doc);
        }
        let node = match self.item_node(&doc, key) {
            Some(n) => n,
            None => {
                warn!(component = COMPONENT, item_id = key, "item node missing, widgets not initialized");
                return;
            }
        };
        let mut manager = FieldManager::new(node, self.registry.clone());
        manager.auto_init_fields(&mut doc);
        let mut values = self.items.iter().find(|i| item_id(i).as_deref() == Some(key)).cloned();
        if let Some(draft) = draft {
            values.get_or_insert_with(Item::new).extend(draft.clone());
        }
        let form = doc.find_by_tag(node, "form").first().copied();
        if let (Some(form), Some(values)) = (form, values) {
            populate_form(&mut doc, form, &self.config.fields, &values, Some(&mut manager));
        }
        self.managers.insert(key.to_string(), manager);
    }

    /// Re-render one item in place, or the whole list if its node is gone
    fn render_item(&mut self, id: &str) {
        let markup = match self.items.iter().find(|i| item_id(i).as_deref() == Some(id)) {
            Some(item) => self.row(item, id),
            None => return self.render(),
        };
        let replaced = {
            let mut doc = self.dom.borrow_mut();
            if let Some(mut old) = self.managers.remove(id) {
                old.destroy_all(&mut doc);
            }
            match self.item_node(&doc, id) {
                Some(node) => doc.replace_node(node, &markup).is_some(),
                None => false,
            }
        };
        if !replaced {
            return self.render();
        }
        if self.expanded.contains(id) {
            self.init_widgets(id, None);
        }
    }

    fn sort(&mut self) {
        if let Some(key) = self.config.sort_by.clone() {
            self.items.sort_by(|a, b| compare_values(a.get(&key), b.get(&key)));
        }
    }

    fn flash(&self, key: &str, class: &str, on: bool) {
        let mut doc = self.dom.borrow_mut();
        if let Some(node) = self.item_node(&doc, key) {
            doc.toggle_class(node, class, on);
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

    pub fn set_items(&mut self, items: Vec<Item>) {
        self.items = items;
        for item in self.items.iter_mut() {
            ensure_id(item);
        }
        self.expanded.clear();
        self.errors.retain(|k, _| k == NEW_ITEM_KEY);
        self.loading.clear();
        self.sort();
        self.render();
    }

    /// Append an item, assigning an id if it has none. Returns the id.
    pub fn add_item(&mut self, mut item: Item) -> String {
        let id = ensure_id(&mut item);
        self.items.push(item);
        self.sort();
        self.render();
        id
    }

    /// Merge `partial` into an item
    pub fn update_item(&mut self, id: &str, partial: Item) -> bool {
        let index = match self.position(id) {
            Some(i) => i,
            None => {
                warn!(component = COMPONENT, item_id = id, "update of unknown item");
                return false;
            }
        };
        self.items[index].extend(partial);
        if self.config.sort_by.is_some() {
            self.sort();
            self.render();
        } else {
            self.render_item(id);
        }
        true
    }

    /// Remove an item immediately, without confirmation or animation
    pub fn remove_item(&mut self, id: &str) -> Option<Item> {
        let index = self.position(id)?;
        let item = self.items.remove(index);
        self.forget(id);
        self.render();
        Some(item)
    }

    fn forget(&mut self, id: &str) {
        self.expanded.shift_remove(id);
        self.loading.remove(id);
        self.errors.remove(id);
        if let Some(mut manager) = self.managers.remove(id) {
            manager.destroy_all(&mut self.dom.borrow_mut());
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.expanded.clear();
        self.loading.clear();
        self.errors.retain(|k, _| k == NEW_ITEM_KEY);
        self.render();
    }

    // ------------------------------------------------------------------
    // Expand / collapse
    // ------------------------------------------------------------------

    pub fn expanded_items(&self) -> Vec<String> {
        self.expanded.iter().cloned().collect()
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.expanded.contains(id)
    }

    /// Open the inline editor of an item and focus its first field
    pub fn edit_item(&mut self, id: &str) -> bool {
        if self.position(id).is_none() {
            warn!(component = COMPONENT, item_id = id, "edit of unknown item");
            return false;
        }
        self.expanded.insert(id.to_string());
        self.render_item(id);
        let mut doc = self.dom.borrow_mut();
        if let Some(node) = self.item_node(&doc, id) {
            focus_first_field(&mut doc, node);
        }
        true
    }

    /// Close an item's editor, discarding unsaved values and errors
    pub fn cancel_edit(&mut self, id: &str) -> bool {
        if !self.expanded.shift_remove(id) {
            return false;
        }
        self.errors.remove(id);
        self.render_item(id);
        true
    }

    pub fn toggle_item(&mut self, id: &str) -> bool {
        if self.expanded.contains(id) {
            self.cancel_edit(id)
        } else {
            self.edit_item(id)
        }
    }

    // ------------------------------------------------------------------
    // Create form
    // ------------------------------------------------------------------

    pub fn is_creating(&self) -> bool {
        self.creating
    }

    /// Open the new-item form (only one at a time)
    pub fn show_create_form(&mut self) {
        if !self.creating {
            self.creating = true;
            self.errors.remove(NEW_ITEM_KEY);
            self.render();
        }
        let mut doc = self.dom.borrow_mut();
        if let Some(node) = self.item_node(&doc, NEW_ITEM_KEY) {
            focus_first_field(&mut doc, node);
        }
    }

    pub fn cancel_create(&mut self) {
        if !self.creating {
            return;
        }
        self.creating = false;
        self.errors.remove(NEW_ITEM_KEY);
        self.render();
    }

    // ------------------------------------------------------------------
    // Loading and errors
    // ------------------------------------------------------------------

    /// Mark an item (or `new`) as busy: `loading` class and a disabled
    /// submit button
    pub fn set_loading(&mut self, key: &str, on: bool) {
        if on {
            self.loading.insert(key.to_string());
        } else {
            self.loading.remove(key);
        }
        let mut doc = self.dom.borrow_mut();
        let node = match self.item_node(&doc, key) {
            Some(n) => n,
            None => return,
        };
        doc.toggle_class(node, "loading", on);
        if let Some(button) = doc.find_first(node, |_, e| e.tag == "button" && e.attr("type") == Some("submit")) {
            if on {
                doc.set_attr(button, "disabled", "");
            } else {
                doc.remove_attr(button, "disabled");
            }
        }
    }

    pub fn is_loading(&self, key: &str) -> bool {
        self.loading.contains(key)
    }

    pub fn errors_for(&self, key: &str) -> Option<&FieldErrors> {
        self.errors.get(key)
    }

    fn show_errors(&self, key: &str, focus: bool) {
        let empty = FieldErrors::new();
        let errors = self.errors.get(key).unwrap_or(&empty);
        let mut doc = self.dom.borrow_mut();
        if let Some(node) = self.item_node(&doc, key) {
            apply_errors(&mut doc, node, errors);
            if focus {
                focus_first_error(&mut doc, node, errors);
            }
        }
    }

    fn report_error(&mut self, key: &str, message: &str) {
        self.errors.entry(key.to_string()).or_default().set_form_error(message);
        self.show_errors(key, false);
        if let Some(cb) = self.config.on_error.as_mut() {
            cb(message);
        }
    }

    /// Values of an open form, read from that item's subtree only
    fn read_form(&self, key: &str) -> Option<Item> {
        let doc = self.dom.borrow();
        let node = self.item_node(&doc, key)?;
        let form = doc.find_by_tag(node, "form").first().copied()?;
        Some(extract_form_values(&doc, form, &self.config.fields, self.managers.get(key)))
    }

    fn validate(&mut self, key: &str, values: &Item) -> Option<FieldErrors> {
        let errors = validation::validate_fields(&self.config.fields, &self.config.validators, values);
        if errors.is_empty() {
            self.errors.remove(key);
            self.show_errors(key, false);
            return None;
        }
        debug!(component = COMPONENT, item_id = key, errors = errors.len(), "item form invalid");
        self.errors.insert(key.to_string(), errors.clone());
        self.show_errors(key, true);
        Some(errors)
    }

    async fn persist(&mut self, key: &str, op: ListOperation, item: &Item) -> Result<(), String> {
        let pending = match self.config.on_persist.as_ref() {
            Some(hook) => hook(op, item.clone()),
            None => return Ok(()),
        };
        self.set_loading(key, true);
        let result = pending.await;
        self.set_loading(key, false);
        result.map_err(|e| {
            error!(component = COMPONENT, item_id = key, operation = ?op, error = %e, "persist failed");
            e.message
        })
    }

    // ------------------------------------------------------------------
    // Save / delete / create
    // ------------------------------------------------------------------

    /// Validate an expanded item's form and merge it into the item
    pub async fn save_item(&mut self, id: &str) -> ListOutcome {
        let index = match self.position(id) {
            Some(i) => i,
            None => return ListOutcome::NotFound,
        };
        if self.loading.contains(id) {
            return ListOutcome::Busy;
        }
        let values = match self.read_form(id) {
            Some(v) => v,
            None => {
                warn!(component = COMPONENT, item_id = id, "save without an open form");
                return ListOutcome::NotFound;
            }
        };
        if let Some(errors) = self.validate(id, &values) {
            return ListOutcome::Invalid(errors);
        }
        let mut merged = self.items[index].clone();
        merged.extend(values);
        if let Err(message) = self.persist(id, ListOperation::Update, &merged).await {
            self.report_error(id, &message);
            return ListOutcome::Failed(message);
        }

        // Let the collapse transition play before the row is replaced
        self.flash(id, "collapsing", true);
        pause(self.config.settings.animation.expand()).await;

        // The list may have changed while the hook ran
        match self.position(id) {
            Some(i) => self.items[i] = merged.clone(),
            None => return ListOutcome::NotFound,
        }
        self.expanded.shift_remove(id);
        self.errors.remove(id);
        if let Some(backup) = self.backup.as_mut() {
            backup.clear();
        }
        if self.config.sort_by.is_some() {
            self.sort();
            self.render();
        } else {
            self.render_item(id);
        }
        info!(component = COMPONENT, r#type = %self.config.list_type, item_id = id, "item saved");
        if let Some(cb) = self.config.on_item_updated.as_mut() {
            cb(&merged);
        }
        self.flash(id, "success", true);
        pause(self.config.settings.animation.success_flash()).await;
        self.flash(id, "success", false);
        ListOutcome::Saved(id.to_string())
    }

    fn confirm_delete(&mut self) -> bool {
        let required = self.config.confirm_delete.unwrap_or(self.config.settings.confirm_delete);
        if !required {
            return true;
        }
        match self.config.confirm.as_mut() {
            Some(prompt) => prompt(&self.config.confirm_message),
            None => true,
        }
    }

    /// Confirm, play the exit animation, then drop the item
    pub async fn delete_item(&mut self, id: &str) -> ListOutcome {
        if self.position(id).is_none() {
            return ListOutcome::NotFound;
        }
        if self.loading.contains(id) {
            return ListOutcome::Busy;
        }
        if !self.confirm_delete() {
            debug!(component = COMPONENT, item_id = id, "delete declined");
            return ListOutcome::Cancelled;
        }
        let item = match self.get_item(id) {
            Some(item) => item.clone(),
            None => return ListOutcome::NotFound,
        };
        if let Err(message) = self.persist(id, ListOperation::Delete, &item).await {
            self.report_error(id, &message);
            return ListOutcome::Failed(message);
        }

        self.flash(id, "removing", true);
        pause(self.config.settings.animation.item_exit()).await;
        let removed = match self.position(id) {
            Some(i) => self.items.remove(i),
            None => return ListOutcome::NotFound,
        };
        self.forget(id);
        self.render();
        info!(component = COMPONENT, r#type = %self.config.list_type, item_id = id, "item deleted");
        if let Some(cb) = self.config.on_item_deleted.as_mut() {
            cb(&removed);
        }
        ListOutcome::Deleted(id.to_string())
    }

    /// Validate the new-item form and append the result
    pub async fn create_item(&mut self) -> ListOutcome {
        if !self.creating {
            warn!(component = COMPONENT, "create without an open form");
            return ListOutcome::NotFound;
        }
        if self.loading.contains(NEW_ITEM_KEY) {
            return ListOutcome::Busy;
        }
        let values = match self.read_form(NEW_ITEM_KEY) {
            Some(v) => v,
            None => return ListOutcome::NotFound,
        };
        if let Some(errors) = self.validate(NEW_ITEM_KEY, &values) {
            return ListOutcome::Invalid(errors);
        }
        let mut item = values;
        let id = ensure_id(&mut item);
        item.entry("created_at")
            .or_insert_with(|| Value::String(chrono::Utc::now().to_rfc3339()));
        if let Err(message) = self.persist(NEW_ITEM_KEY, ListOperation::Create, &item).await {
            self.report_error(NEW_ITEM_KEY, &message);
            return ListOutcome::Failed(message);
        }

        self.items.push(item.clone());
        self.sort();
        self.creating = false;
        self.errors.remove(NEW_ITEM_KEY);
        if let Some(backup) = self.backup.as_mut() {
            backup.clear();
        }
        self.render();
        info!(component = COMPONENT, r#type = %self.config.list_type, item_id = %id, "item created");
        if let Some(cb) = self.config.on_item_created.as_mut() {
            cb(&item);
        }
        self.flash(&id, "entering", true);
        pause(self.config.settings.animation.item_enter()).await;
        self.flash(&id, "entering", false);
        ListOutcome::Created(id)
    }

    // ------------------------------------------------------------------
    // Backup
    // ------------------------------------------------------------------

    fn snapshot(&mut self, key: &str) {
        let values = match self.read_form(key) {
            Some(v) => v,
            None => return,
        };
        if let Some(backup) = self.backup.as_mut() {
            let mut entry = Map::new();
            entry.insert("item".to_string(), Value::String(key.to_string()));
            entry.insert("values".to_string(), Value::Object(values));
            backup.schedule(entry, Instant::now());
        }
    }

    /// Reopen the form a backup was taken from and refill it
    fn restore_backup(&mut self) -> bool {
        let saved = match self.backup.as_ref().and_then(Backup::load) {
            Some(saved) => saved,
            None => return false,
        };
        let (key, values) = match (saved.get("item").and_then(Value::as_str), saved.get("values")) {
            (Some(key), Some(Value::Object(values))) => (key.to_string(), values.clone()),
            _ => return false,
        };
        if key == NEW_ITEM_KEY {
            self.creating = true;
            self.render();
        } else if self.position(&key).is_some() {
            self.expanded.insert(key.clone());
            self.render_item(&key);
        } else {
            return false;
        }
        let mut doc = self.dom.borrow_mut();
        let form = self
            .item_node(&doc, &key)
            .and_then(|n| doc.find_by_tag(n, "form").first().copied());
        if let Some(form) = form {
            populate_form(&mut doc, form, &self.config.fields, &values, self.managers.get_mut(&key));
        }
        info!(component = COMPONENT, r#type = %self.config.list_type, item_id = %key, "restored list backup");
        true
    }

    /// Write a debounced backup whose window has elapsed
    pub fn tick(&mut self, now: Instant) -> bool {
        self.backup.as_mut().map(|b| b.poll(now)).unwrap_or(false)
    }

    /// Wait for the pending backup's debounce window and write it
    pub async fn settle_backup(&mut self) -> bool {
        match self.backup.as_mut() {
            Some(backup) => backup.settle().await,
            None => false,
        }
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    fn key_of(&self, doc: &Document, node: NodeId) -> Option<String> {
        let item = doc.closest_with_attr(node, ITEM_ID_ATTR)?;
        doc.attr(item, ITEM_ID_ATTR).map(String::from)
    }

    /// An input event inside one of the open forms
    pub fn handle_input(&mut self, node: NodeId) {
        let key = match self.key_of(&self.dom.borrow(), node) {
            Some(k) => k,
            None => return,
        };
        if let Some(manager) = self.managers.get_mut(&key) {
            manager.notify_input(&mut self.dom.borrow_mut(), node);
        }
        self.snapshot(&key);
    }

    /// Type `value` into field `name` of the form open for `key`
    pub fn set_input(&mut self, key: &str, name: &str, value: &str) -> bool {
        let control = {
            let mut doc = self.dom.borrow_mut();
            let control = self
                .item_node(&doc, key)
                .and_then(|n| doc.find_first_by_attr(n, "name", name));
            if let Some(c) = control {
                doc.set_value(c, value);
            }
            control
        };
        match control {
            Some(c) => {
                self.handle_input(c);
                true
            }
            None => {
                warn!(component = COMPONENT, item_id = key, field = name, "no control for input");
                false
            }
        }
    }

    /// A click anywhere in the list. Widget chrome first, then the
    /// `data-action` of the clicked element or its closest ancestor.
    pub async fn handle_action(&mut self, node: NodeId) -> bool {
        let key = self.key_of(&self.dom.borrow(), node);
        if let Some(key) = key.as_deref() {
            if let Some(manager) = self.managers.get_mut(key) {
                if manager.dispatch_action(&mut self.dom.borrow_mut(), node) {
                    self.snapshot(key);
                    return true;
                }
            }
        }
        let (action, id) = match action_target(&self.dom.borrow(), node) {
            Some((action, id, _)) => (action, id),
            None => return false,
        };
        let id = id.unwrap_or_default();
        match action.as_str() {
            "edit" => self.edit_item(&id),
            "toggle" => self.toggle_item(&id),
            "cancel" => self.cancel_edit(&id),
            "save" => {
                self.save_item(&id).await;
                true
            }
            "delete" => {
                self.delete_item(&id).await;
                true
            }
            "new" => {
                self.show_create_form();
                true
            }
            "create" => {
                self.create_item().await;
                true
            }
            "cancel-create" => {
                self.cancel_create();
                true
            }
            other => {
                debug!(component = COMPONENT, action = other, "unhandled action");
                false
            }
        }
    }

    /// Number of live widgets across every open form
    pub fn widget_count(&self) -> usize {
        self.managers.values().map(FieldManager::len).sum()
    }

    /// Tear down all widgets, empty the container and drop the backup
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        let mut doc = self.dom.borrow_mut();
        for (_, mut manager) in self.managers.drain() {
            manager.destroy_all(&mut doc);
        }
        doc.clear_children(self.container);
        drop(doc);
        if let Some(backup) = self.backup.as_mut() {
            backup.clear();
        }
        self.destroyed = true;
        debug!(component = COMPONENT, r#type = %self.config.list_type, "list destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::{KeyValueStore, MemoryStore};
    use crate::card::field::FieldType;
    use crate::card::{ACTION_ATTR, ID_ATTR};
    use serde_json::json;
    use std::cell::{Cell, RefCell};

    fn setup() -> (Dom, NodeId) {
        let dom = Dom::new();
        let c = dom.create_container("topics");
        (dom, c)
    }

    fn fields() -> Vec<FieldSpec> {
        vec![
            FieldSpec::text("title").required(),
            FieldSpec::new("notes", FieldType::Textarea),
        ]
    }

    fn item(value: Value) -> Item {
        serde_json::from_value(value).unwrap()
    }

    fn config() -> ListConfig {
        ListConfig::new("topic", fields())
            .with_settings(Settings::instant())
            .with_items(vec![
                item(json!({"id": "a", "title": "Alimentos", "notes": ""})),
                item(json!({"id": "b", "title": "Benefícios", "notes": ""})),
            ])
    }

    fn item_node(dom: &Dom, c: NodeId, id: &str) -> NodeId {
        dom.borrow().find_first_by_attr(c, ITEM_ID_ATTR, id).unwrap()
    }

    #[test]
    fn test_requires_type_and_fields() {
        let (dom, c) = setup();
        assert!(matches!(
            CardList::new(&dom, c, ListConfig::new("", fields())),
            Err(ConfigError::MissingType { .. })
        ));
        assert!(matches!(
            CardList::new(&dom, c, ListConfig::new("topic", Vec::new())),
            Err(ConfigError::MissingFields { .. })
        ));
        assert!(dom.borrow().children(c).is_empty());
    }

    #[test]
    fn test_add_item_generates_distinct_ids() {
        let (dom, c) = setup();
        let mut list = CardList::new(&dom, c, config()).unwrap();
        let first = list.add_item(item(json!({"title": "Um"})));
        let second = list.add_item(item(json!({"title": "Dois"})));
        assert_ne!(first, second);
        assert_eq!(list.get_items().len(), 4);
        assert!(dom.borrow().find_first_by_attr(c, ITEM_ID_ATTR, &second).is_some());
    }

    #[test]
    fn test_expanding_items_is_independent() {
        let (dom, c) = setup();
        let mut list = CardList::new(&dom, c, config()).unwrap();
        assert!(list.edit_item("a"));
        assert!(list.edit_item("b"));
        assert_eq!(list.expanded_items(), vec!["a".to_string(), "b".to_string()]);
        let doc = dom.borrow();
        let a = doc.find_first_by_attr(c, ITEM_ID_ATTR, "a").unwrap();
        assert!(doc.has_class(a, "expanded"));
        let input = doc.find_first_by_attr(a, "name", "title").unwrap();
        assert_eq!(doc.value(input).as_deref(), Some("Alimentos"));
        drop(doc);

        assert!(list.cancel_edit("a"));
        assert!(!list.is_expanded("a"));
        assert!(list.is_expanded("b"));
    }

    #[tokio::test]
    async fn test_save_reads_only_that_items_form() {
        let (dom, c) = setup();
        let updated = Rc::new(RefCell::new(Vec::new()));
        let sink = updated.clone();
        let mut list = CardList::new(
            &dom,
            c,
            config().on_item_updated(move |i| sink.borrow_mut().push(i.clone())),
        )
        .unwrap();
        list.edit_item("a");
        list.edit_item("b");
        list.set_input("a", "title", "Alimentos gravídicos");
        list.set_input("b", "title", "Benefício previdenciário");

        assert_eq!(list.save_item("b").await, ListOutcome::Saved("b".to_string()));
        assert_eq!(list.get_item("b").unwrap()["title"], json!("Benefício previdenciário"));
        assert_eq!(list.get_item("a").unwrap()["title"], json!("Alimentos"));
        assert!(!list.is_expanded("b"));
        assert!(list.is_expanded("a"));
        assert_eq!(updated.borrow().len(), 1);
        let b = item_node(&dom, c, "b");
        assert!(dom.borrow().has_class(b, "collapsed"));
    }

    #[tokio::test]
    async fn test_invalid_save_errors_stay_in_item() {
        let (dom, c) = setup();
        let mut list = CardList::new(&dom, c, config()).unwrap();
        list.edit_item("a");
        list.edit_item("b");
        list.set_input("a", "title", "");
        let outcome = list.save_item("a").await;
        assert!(matches!(outcome, ListOutcome::Invalid(ref e) if e.contains("title")));
        assert_eq!(list.get_item("a").unwrap()["title"], json!("Alimentos"));

        let doc = dom.borrow();
        let a = doc.find_first_by_attr(c, ITEM_ID_ATTR, "a").unwrap();
        let b = doc.find_first_by_attr(c, ITEM_ID_ATTR, "b").unwrap();
        assert_eq!(doc.find_by_class(a, "has-error").len(), 1);
        assert!(doc.find_by_class(b, "has-error").is_empty());
    }

    #[tokio::test]
    async fn test_create_then_delete() {
        let (dom, c) = setup();
        let created = Rc::new(Cell::new(0));
        let counter = created.clone();
        let mut list = CardList::new(
            &dom,
            c,
            config()
                .with_confirm_delete(false)
                .on_item_created(move |_| counter.set(counter.get() + 1)),
        )
        .unwrap();
        list.show_create_form();
        assert!(list.is_creating());
        list.set_input(NEW_ITEM_KEY, "title", "Consumidor");
        let id = match list.create_item().await {
            ListOutcome::Created(id) => id,
            other => panic!("expected created, got {:?}", other),
        };
        assert!(!list.is_creating());
        assert_eq!(list.get_items().len(), 3);
        let new_item = list.get_item(&id).unwrap();
        assert_eq!(new_item["title"], json!("Consumidor"));
        assert!(new_item.contains_key("created_at"));
        assert_eq!(created.get(), 1);

        assert_eq!(list.delete_item(&id).await, ListOutcome::Deleted(id.clone()));
        assert!(list.get_item(&id).is_none());
        assert!(dom.borrow().find_first_by_attr(c, ITEM_ID_ATTR, &id).is_none());
    }

    #[tokio::test]
    async fn test_declined_confirmation_keeps_item() {
        let (dom, c) = setup();
        let asked = Rc::new(RefCell::new(String::new()));
        let sink = asked.clone();
        let mut list = CardList::new(
            &dom,
            c,
            config().with_confirm(move |msg| {
                *sink.borrow_mut() = msg.to_string();
                false
            }),
        )
        .unwrap();
        assert_eq!(list.delete_item("a").await, ListOutcome::Cancelled);
        assert!(list.get_item("a").is_some());
        assert!(asked.borrow().contains("excluir"));
    }

    #[tokio::test]
    async fn test_rejected_persist_leaves_item_unchanged() {
        let (dom, c) = setup();
        let mut list = CardList::new(
            &dom,
            c,
            config().on_persist(|_, _| async { Err(SubmitError::from("Falha na API")) }),
        )
        .unwrap();
        list.edit_item("a");
        list.set_input("a", "title", "Alterado");
        assert_eq!(list.save_item("a").await, ListOutcome::Failed("Falha na API".to_string()));
        assert_eq!(list.get_item("a").unwrap()["title"], json!("Alimentos"));
        assert!(list.is_expanded("a"));
        assert!(!list.is_loading("a"));
        assert_eq!(list.errors_for("a").and_then(|e| e.form_error()), Some("Falha na API"));
    }

    #[test]
    fn test_widgets_rebuilt_per_render_without_leaks() {
        let (dom, c) = setup();
        let fields = vec![FieldSpec::text("title"), FieldSpec::new("body", FieldType::Markdown)];
        let mut list = CardList::new(
            &dom,
            c,
            ListConfig::new("post", fields)
                .with_settings(Settings::instant())
                .with_items(vec![item(json!({"id": "p1", "title": "Post", "body": "**oi**"}))]),
        )
        .unwrap();
        assert_eq!(list.widget_count(), 0);
        list.edit_item("p1");
        assert_eq!(list.widget_count(), 1);
        list.edit_item("p1");
        assert_eq!(list.widget_count(), 1);
        list.render();
        assert_eq!(list.widget_count(), 1);
        list.cancel_edit("p1");
        assert_eq!(list.widget_count(), 0);
    }

    #[test]
    fn test_sort_by_keeps_order() {
        let (dom, c) = setup();
        let mut list = CardList::new(&dom, c, config().with_sort_by("title")).unwrap();
        list.add_item(item(json!({"id": "z", "title": "Aaa"})));
        let ids: Vec<String> = list.get_items().iter().filter_map(item_id).collect();
        assert_eq!(ids, vec!["z", "a", "b"]);
    }

    #[tokio::test]
    async fn test_actions_dispatch_from_buttons() {
        let (dom, c) = setup();
        let mut list = CardList::new(&dom, c, config()).unwrap();
        let edit = dom
            .borrow()
            .find_first(c, |_, e| e.attr(ACTION_ATTR) == Some("edit") && e.attr(ID_ATTR) == Some("b"))
            .unwrap();
        assert!(list.handle_action(edit).await);
        assert!(list.is_expanded("b"));

        let new = dom.borrow().find_first_by_attr(c, ACTION_ATTR, "new").unwrap();
        assert!(list.handle_action(new).await);
        assert!(list.is_creating());
    }

    #[test]
    fn test_backup_reopens_edited_item() {
        let memory: Rc<dyn KeyValueStore> = MemoryStore::shared();
        let store = BackupStore::new(memory, Settings::instant().backup_expiration());
        let (dom, c) = setup();
        let mut list = CardList::new(&dom, c, config().with_store(store.clone())).unwrap();
        list.edit_item("b");
        list.set_input("b", "title", "Rascunho");
        list.destroy();
        // destroy drops the backup, so write it again the way an input would
        store
            .save(
                &list_backup_key("topic"),
                &item(json!({"item": "b", "values": {"title": "Rascunho"}})),
            )
            .unwrap();

        let other = dom.create_container("again");
        let restored = CardList::new(&dom, other, config().with_store(store)).unwrap();
        assert!(restored.is_expanded("b"));
        let doc = dom.borrow();
        let node = doc.find_first_by_attr(other, ITEM_ID_ATTR, "b").unwrap();
        let input = doc.find_first_by_attr(node, "name", "title").unwrap();
        assert_eq!(doc.value(input).as_deref(), Some("Rascunho"));
    }

    #[test]
    fn test_full_render_keeps_unsaved_edits_in_open_forms() {
        let (dom, c) = setup();
        let mut list = CardList::new(&dom, c, config()).unwrap();
        list.edit_item("a");
        list.set_input("a", "title", "Editado");
        list.show_create_form();
        list.set_input(NEW_ITEM_KEY, "title", "Novo tópico");
        list.add_item(item(json!({"id": "c", "title": "Contratos"})));

        let doc = dom.borrow();
        let a = doc.find_first_by_attr(c, ITEM_ID_ATTR, "a").unwrap();
        let title = doc.find_first_by_attr(a, "name", "title").unwrap();
        assert_eq!(doc.value(title).as_deref(), Some("Editado"));
        let new = doc.find_first_by_attr(c, ITEM_ID_ATTR, NEW_ITEM_KEY).unwrap();
        let title = doc.find_first_by_attr(new, "name", "title").unwrap();
        assert_eq!(doc.value(title).as_deref(), Some("Novo tópico"));
        drop(doc);
        // Nothing was saved
        assert_eq!(list.get_item("a").unwrap()["title"], json!("Alimentos"));
    }

    #[test]
    fn test_cancel_edit_discards_draft() {
        let (dom, c) = setup();
        let mut list = CardList::new(&dom, c, config()).unwrap();
        list.edit_item("a");
        list.set_input("a", "title", "Descartado");
        list.cancel_edit("a");
        list.edit_item("a");
        let doc = dom.borrow();
        let a = doc.find_first_by_attr(c, ITEM_ID_ATTR, "a").unwrap();
        let title = doc.find_first_by_attr(a, "name", "title").unwrap();
        assert_eq!(doc.value(title).as_deref(), Some("Alimentos"));
    }

    #[test]
    fn test_debounced_list_backup_flushes_on_drop() {
        let memory: Rc<dyn KeyValueStore> = MemoryStore::shared();
        let store = BackupStore::new(memory, Settings::default().backup_expiration());
        let (dom, c) = setup();
        let mut settings = Settings::instant();
        settings.backup_debounce_ms = 1000;
        let mut list = CardList::new(&dom, c, config().with_settings(settings).with_store(store.clone())).unwrap();
        list.edit_item("b");
        list.set_input("b", "title", "Sem pressa");
        assert!(store.load(&list_backup_key("topic")).is_none());
        drop(list);

        let saved = store.load(&list_backup_key("topic")).unwrap();
        assert_eq!(saved["item"], json!("b"));
        assert_eq!(saved["values"]["title"], json!("Sem pressa"));
    }

    #[tokio::test]
    async fn test_loading_item_rejects_save() {
        let (dom, c) = setup();
        let mut list = CardList::new(&dom, c, config()).unwrap();
        list.edit_item("a");
        list.set_loading("a", true);
        assert_eq!(list.save_item("a").await, ListOutcome::Busy);
        assert_eq!(list.delete_item("a").await, ListOutcome::Busy);
        list.set_loading("a", false);
        assert_eq!(list.save_item("a").await, ListOutcome::Saved("a".to_string()));
    }

    #[tokio::test]
    async fn test_expand_duration_follows_settings() {
        let (dom, c) = setup();
        let mut settings = Settings::instant();
        settings.animation.expand_ms = 5;
        let mut list = CardList::new(&dom, c, config().with_settings(settings)).unwrap();
        {
            let doc = dom.borrow();
            let root = doc.find_first(c, |_, e| e.has_class("card-list")).unwrap();
            assert_eq!(doc.attr(root, "style"), Some("--expand-duration: 5ms"));
        }
        list.edit_item("a");
        assert_eq!(list.save_item("a").await, ListOutcome::Saved("a".to_string()));
        assert!(!list.is_expanded("a"));
        assert!(!dom.borrow().has_class(item_node(&dom, c, "a"), "collapsing"));
    }
}
