//! Create/edit form for a single record.
//!
//! The form renders from `item` and `errors`, upgrades structured fields
//! through its [`FieldManager`], validates on submit and hands the
//! extracted values to the caller's async `on_submit` hook. In-progress
//! values are backed up under `card-form-{type}` and silently restored on
//! construction.

use futures::future::{self, FutureExt};
use std::cell::Cell;
use std::fmt;
use std::future::Future;
use std::rc::Rc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use super::field::{FieldSpec, Section};
use super::field_manager::FieldManager;
use super::templates::form::{self as form_tpl, FormActions};
use super::validation::{self, FieldErrors, ValidatorMap, ValidatorSpec};
use super::widgets::WidgetRegistry;
use super::{
    action_target, apply_errors, extract_form_values, focus_first_error, focus_first_field, populate_form, AsyncHook,
    ErrorCallback, Item, ItemCallback, FIELD_GROUP_ATTR, FIELD_NAME_ATTR, SECTION_ATTR,
};
use crate::backup::{form_backup_key, Backup, BackupStore, KeyValueStore, MemoryStore};
use crate::dom::{fragment, Container, Document, Dom, NodeId};
use crate::error::{ConfigError, SubmitError};
use crate::settings::Settings;

const COMPONENT: &str = "CardForm";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormMode {
    #[default]
    Create,
    Edit,
}

impl FormMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormMode::Create => "create",
            FormMode::Edit => "edit",
        }
    }

    fn submit_label(&self) -> &'static str {
        match self {
            FormMode::Create => "Criar",
            FormMode::Edit => "Salvar",
        }
    }

    fn loading_label(&self) -> &'static str {
        match self {
            FormMode::Create => "Criando...",
            FormMode::Edit => "Salvando...",
        }
    }
}

impl fmt::Display for FormMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one submit attempt
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Valid, and the hook (if any) resolved
    Submitted,
    /// Validation failed; the hook was not called
    Invalid(FieldErrors),
    /// The hook rejected with this message
    Failed(String),
}

/// Everything a [`CardForm`] is built from
pub struct FormConfig {
    pub form_type: String,
    pub fields: Vec<FieldSpec>,
    pub validators: ValidatorMap,
    pub sections: Vec<Section>,
    pub mode: FormMode,
    pub item: Item,
    pub title: Option<String>,
    pub submit_label: Option<String>,
    pub cancel_label: Option<String>,
    pub settings: Settings,
    pub backup_enabled: bool,
    /// Backup store; an in-memory store when absent
    pub store: Option<BackupStore>,
    pub registry: Option<Rc<WidgetRegistry>>,
    pub on_submit: Option<AsyncHook<FormMode>>,
    pub on_valid: Option<ItemCallback>,
    pub on_invalid: Option<Box<dyn FnMut(&FieldErrors, &Item)>>,
    /// Called with the dirty flag so the caller can confirm
    pub on_cancel: Option<Box<dyn FnMut(bool)>>,
    pub on_change: Option<ItemCallback>,
    pub on_error: Option<ErrorCallback>,
}

impl FormConfig {
    pub fn new(form_type: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        Self {
            form_type: form_type.into(),
            fields,
            validators: ValidatorMap::new(),
            sections: Vec::new(),
            mode: FormMode::Create,
            item: Item::new(),
            title: None,
            submit_label: None,
            cancel_label: Some("Cancelar".to_string()),
            settings: Settings::default(),
            backup_enabled: true,
            store: None,
            registry: None,
            on_submit: None,
            on_valid: None,
            on_invalid: None,
            on_cancel: None,
            on_change: None,
            on_error: None,
        }
    }

    pub fn with_validator(mut self, field: impl Into<String>, spec: impl Into<ValidatorSpec>) -> Self {
        self.validators.insert(field.into(), spec.into());
        self
    }

    pub fn with_sections(mut self, sections: Vec<Section>) -> Self {
        self.sections = sections;
        self
    }

    pub fn with_mode(mut self, mode: FormMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_item(mut self, item: Item) -> Self {
        self.item = item;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_submit_label(mut self, label: impl Into<String>) -> Self {
        self.submit_label = Some(label.into());
        self
    }

    /// `None` hides the cancel button
    pub fn with_cancel_label(mut self, label: Option<&str>) -> Self {
        self.cancel_label = label.map(String::from);
        self
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
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

    pub fn on_submit<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(FormMode, Item) -> Fut + 'static,
        Fut: Future<Output = Result<(), SubmitError>> + 'static,
    {
        self.on_submit = Some(Box::new(move |mode, data| hook(mode, data).boxed_local()));
        self
    }

    pub fn on_valid(mut self, f: impl FnMut(&Item) + 'static) -> Self {
        self.on_valid = Some(Box::new(f));
        self
    }

    pub fn on_invalid(mut self, f: impl FnMut(&FieldErrors, &Item) + 'static) -> Self {
        self.on_invalid = Some(Box::new(f));
        self
    }

    pub fn on_cancel(mut self, f: impl FnMut(bool) + 'static) -> Self {
        self.on_cancel = Some(Box::new(f));
        self
    }

    pub fn on_change(mut self, f: impl FnMut(&Item) + 'static) -> Self {
        self.on_change = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl FnMut(&str) + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }
}

/// Reject configurations that cannot render: no type, no fields or two
/// fields sharing a name
pub(crate) fn check_fields(component: &'static str, kind: &str, fields: &[FieldSpec]) -> Result<(), ConfigError> {
    if kind.trim().is_empty() {
        return Err(ConfigError::MissingType { component });
    }
    if fields.is_empty() {
        return Err(ConfigError::MissingFields { component });
    }
    for (i, field) in fields.iter().enumerate() {
        if fields[..i].iter().any(|f| f.name == field.name) {
            return Err(ConfigError::DuplicateField {
                component,
                name: field.name.clone(),
            });
        }
    }
    Ok(())
}

/// Resolve the mount point or fail with `ContainerNotFound`
pub(crate) fn resolve_container(dom: &Dom, component: &'static str, container: Container) -> Result<NodeId, ConfigError> {
    dom.resolve(&container).ok_or_else(|| ConfigError::ContainerNotFound {
        component,
        selector: container.describe(),
    })
}

/// Backup for a component: the configured store or a fresh in-memory one
pub(crate) fn make_backup(settings: &Settings, store: Option<BackupStore>, key: String) -> Backup {
    let store = store.unwrap_or_else(|| {
        let memory: Rc<dyn KeyValueStore> = MemoryStore::shared();
        BackupStore::new(memory, settings.backup_expiration())
    });
    Backup::new(store, key, settings.backup_debounce())
}

/// Move each field group into its section's container. Returns how many
/// groups moved.
pub(crate) fn apply_sections(doc: &mut Document, form: NodeId, fields: &[FieldSpec], sections: &[Section]) -> usize {
    if sections.is_empty() {
        return 0;
    }
    let host = match doc.find_by_class(form, "form-fields").first().copied() {
        Some(h) => h,
        None => {
            warn!("form has no field host, skipping section layout");
            return 0;
        }
    };
    let mut moved = 0;
    for section in sections {
        doc.append_markup(host, &form_tpl::section_container(section));
        let target = doc
            .find_first_by_attr(host, SECTION_ATTR, &section.id)
            .and_then(|s| doc.find_by_class(s, "section-fields").first().copied());
        let target = match target {
            Some(t) => t,
            None => continue,
        };
        let mut names: Vec<&str> = section.fields.iter().map(String::as_str).collect();
        names.extend(
            fields
                .iter()
                .filter(|f| f.section.as_deref() == Some(section.id.as_str()))
                .map(|f| f.name.as_str())
                .filter(|n| !section.fields.iter().any(|s| s == n)),
        );
        for name in names {
            match doc.find_first_by_attr(form, FIELD_GROUP_ATTR, name) {
                Some(group) if doc.move_node(group, target) => moved += 1,
                Some(_) => {}
                None => debug!(section = %section.id, field = name, "section field not rendered"),
            }
        }
    }
    moved
}

/// Resets the in-flight flag and the submit button however the submit
/// future ends, including when it is dropped mid-await
struct InFlight {
    flag: Rc<Cell<bool>>,
    dom: Dom,
    button: Option<NodeId>,
    label: String,
}

impl InFlight {
    fn start(flag: Rc<Cell<bool>>, dom: Dom, form: Option<NodeId>, loading: &str, label: String) -> Self {
        flag.set(true);
        let button = form.and_then(|f| {
            let mut doc = dom.borrow_mut();
            let button = doc.find_first(f, |_, e| e.tag == "button" && e.attr("type") == Some("submit"))?;
            doc.set_attr(button, "disabled", "");
            doc.add_class(button, "loading");
            doc.set_text(button, loading);
            Some(button)
        });
        Self {
            flag,
            dom,
            button,
            label,
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.flag.set(false);
        if let Some(button) = self.button {
            let mut doc = self.dom.borrow_mut();
            if doc.is_alive(button) {
                doc.remove_attr(button, "disabled");
                doc.remove_class(button, "loading");
                doc.set_text(button, &self.label);
            }
        }
    }
}

pub struct CardForm {
    dom: Dom,
    container: NodeId,
    form: Option<NodeId>,
    config: FormConfig,
    mode: FormMode,
    item: Item,
    initial: Item,
    /// Typed or restored values not yet submitted; survives re-renders
    draft: Item,
    errors: FieldErrors,
    dirty: bool,
    submitting: Rc<Cell<bool>>,
    manager: FieldManager,
    backup: Option<Backup>,
    destroyed: bool,
}

impl CardForm {
    /// Validate `config`, render into `container` and restore any backup.
    /// Configuration errors are returned before the document is touched.
    pub fn new(dom: &Dom, container: impl Into<Container>, config: FormConfig) -> Result<Self, ConfigError> {
        check_fields(COMPONENT, &config.form_type, &config.fields)?;
        let container = resolve_container(dom, COMPONENT, container.into())?;

        let registry = config
            .registry
            .clone()
            .unwrap_or_else(|| Rc::new(WidgetRegistry::with_builtins(&config.settings)));
        let backup = config.backup_enabled.then(|| {
            make_backup(&config.settings, config.store.clone(), form_backup_key(&config.form_type))
        });

        let mut form = Self {
            dom: dom.clone(),
            container,
            form: None,
            mode: config.mode,
            item: config.item.clone(),
            initial: config.item.clone(),
            draft: Item::new(),
            errors: FieldErrors::new(),
            dirty: false,
            submitting: Rc::new(Cell::new(false)),
            manager: FieldManager::new(container, registry),
            backup,
            destroyed: false,
            config,
        };
        form.render();
        form.restore_backup();
        debug!(component = COMPONENT, r#type = %form.config.form_type, mode = %form.mode, "form ready");
        Ok(form)
    }

    fn restore_backup(&mut self) {
        let saved = match self.backup.as_ref().and_then(Backup::load) {
            Some(saved) if !saved.is_empty() => saved,
            _ => return,
        };
        if let Some(form) = self.form {
            let mut doc = self.dom.borrow_mut();
            populate_form(&mut doc, form, &self.config.fields, &saved, Some(&mut self.manager));
        }
        self.draft.extend(saved.clone());
        self.dirty = true;
        info!(component = COMPONENT, r#type = %self.config.form_type, fields = saved.len(), "restored form backup");
    }

    fn actions(&self) -> FormActions {
        FormActions {
            submit_label: self
                .config
                .submit_label
                .clone()
                .unwrap_or_else(|| self.mode.submit_label().to_string()),
            cancel_label: self.config.cancel_label.clone(),
            loading_label: self.mode.loading_label().to_string(),
            ..Default::default()
        }
    }

    fn prefix(&self) -> String {
        format!("form-{}", self.config.form_type)
    }

    /// Regenerate the markup from `item`, unsubmitted edits and `errors`,
    /// then re-run widget initialization (again after section layout if
    /// groups moved)
    pub fn render(&mut self) {
        if self.destroyed {
            warn!(component = COMPONENT, "render after destroy ignored");
            return;
        }
        let mut values = self.item.clone();
        values.extend(self.draft.clone());
        let markup = fragment(vec![
            form_tpl::heading(self.config.title.as_deref().unwrap_or("")),
            form_tpl::form(
                &self.prefix(),
                &format!("form-{}", self.config.form_type),
                &self.config.fields,
                &values,
                &self.errors,
                &self.actions(),
                None,
                self.submitting.get(),
            )
            .attr("data-mode", self.mode.as_str())
            .into(),
        ]);

        let mut doc = self.dom.borrow_mut();
        self.manager.destroy_all(&mut doc);
        doc.set_content(self.container, &markup);
        self.form = doc.find_by_tag(self.container, "form").first().copied();
        let form = match self.form {
            Some(f) => f,
            None => return,
        };
        self.manager.auto_init_fields(&mut doc);
        let moved = apply_sections(&mut doc, form, &self.config.fields, &self.config.sections);
        if moved > 0 {
            // Wrappers were relocated: rebuild every widget
            self.manager.destroy_all(&mut doc);
            self.manager.auto_init_fields(&mut doc);
            debug!(component = COMPONENT, moved, "applied section layout");
        }
        populate_form(&mut doc, form, &self.config.fields, &values, Some(&mut self.manager));
    }

    // ------------------------------------------------------------------
    // Data
    // ------------------------------------------------------------------

    /// The record merged with the current values of every rendered field
    pub fn get_data(&self) -> Item {
        let mut data = self.item.clone();
        data.extend(self.draft.clone());
        if let Some(form) = self.form {
            let doc = self.dom.borrow();
            data.extend(extract_form_values(&doc, form, &self.config.fields, Some(&self.manager)));
        }
        data
    }

    /// Replace the record and re-render. Clears errors and the dirty flag.
    pub fn set_data(&mut self, data: Item) {
        self.item = data;
        self.draft.clear();
        self.errors.clear();
        self.dirty = false;
        self.render();
    }

    /// Back to the configured item, dropping errors and any backup
    pub fn reset(&mut self) {
        self.item = self.initial.clone();
        self.draft.clear();
        self.errors.clear();
        self.dirty = false;
        if let Some(backup) = self.backup.as_mut() {
            backup.clear();
        }
        self.render();
    }

    pub fn item(&self) -> &Item {
        &self.item
    }

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: FormMode) {
        if self.mode != mode {
            self.mode = mode;
            self.render();
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.get()
    }

    /// True when leaving now would lose edits that were never submitted
    pub fn before_unload_guard(&self) -> bool {
        self.dirty && !self.destroyed
    }

    pub fn form_node(&self) -> Option<NodeId> {
        self.form
    }

    pub fn widgets(&self) -> &FieldManager {
        &self.manager
    }

    // ------------------------------------------------------------------
    // Errors
    // ------------------------------------------------------------------

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    fn show_errors(&self) {
        if let Some(form) = self.form {
            let mut doc = self.dom.borrow_mut();
            apply_errors(&mut doc, form, &self.errors);
        }
    }

    pub fn set_errors(&mut self, errors: FieldErrors) {
        self.errors = errors;
        self.show_errors();
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
        self.show_errors();
    }

    pub fn set_field_error(&mut self, field: &str, message: &str) {
        self.errors.insert(field, message);
        self.show_errors();
    }

    /// Validate every field against the current values
    pub fn validate_all(&self) -> FieldErrors {
        validation::validate_fields(&self.config.fields, &self.config.validators, &self.get_data())
    }

    /// Blur-time validation of one field. Updates its error slot and
    /// returns the message, if any.
    pub fn validate_field(&mut self, name: &str) -> Option<String> {
        let field = self.config.fields.iter().find(|f| f.name == name)?;
        let data = self.get_data();
        let value = data.get(name).unwrap_or(&serde_json::Value::Null);
        match validation::validate_field(field, self.config.validators.get(name), value) {
            Ok(()) => {
                self.errors.remove(name);
            }
            Err(e) => self.errors.insert(name, e.to_string()),
        }
        self.show_errors();
        self.errors.get(name).map(String::from)
    }

    // ------------------------------------------------------------------
    // Submission
    // ------------------------------------------------------------------

    /// Validate and hand the values to `on_submit`.
    ///
    /// Submits cannot overlap: the future borrows the form mutably until
    /// the hook settles.
    ///
    /// Invalid input never reaches the hook. A rejected hook leaves the
    /// form populated and shows the message as the form-level error.
    pub async fn submit(&mut self) -> SubmitOutcome {
        if self.destroyed {
            warn!(component = COMPONENT, "submit after destroy ignored");
            return SubmitOutcome::Failed("form destroyed".to_string());
        }

        let data = self.get_data();
        let errors = validation::validate_fields(&self.config.fields, &self.config.validators, &data);
        if !errors.is_empty() {
            debug!(component = COMPONENT, r#type = %self.config.form_type, errors = errors.len(), "form invalid");
            self.errors = errors.clone();
            self.show_errors();
            if let Some(form) = self.form {
                focus_first_error(&mut self.dom.borrow_mut(), form, &self.errors);
            }
            if let Some(cb) = self.config.on_invalid.as_mut() {
                cb(&errors, &data);
            }
            return SubmitOutcome::Invalid(errors);
        }
        self.clear_errors();

        let pending = match self.config.on_submit.as_ref() {
            Some(hook) => hook(self.mode, data.clone()),
            None => future::ready(Ok(())).boxed_local(),
        };
        let in_flight = InFlight::start(
            self.submitting.clone(),
            self.dom.clone(),
            self.form,
            self.mode.loading_label(),
            self.actions().submit_label,
        );
        let result = pending.await;
        drop(in_flight);

        match result {
            Ok(()) => {
                if let Some(backup) = self.backup.as_mut() {
                    backup.clear();
                }
                self.dirty = false;
                self.item = data.clone();
                self.draft.clear();
                info!(component = COMPONENT, r#type = %self.config.form_type, mode = %self.mode, "form submitted");
                if let Some(cb) = self.config.on_valid.as_mut() {
                    cb(&data);
                }
                SubmitOutcome::Submitted
            }
            Err(e) => {
                error!(component = COMPONENT, r#type = %self.config.form_type, error = %e, "submit failed");
                self.errors.set_form_error(e.message.clone());
                self.show_errors();
                if let Some(cb) = self.config.on_error.as_mut() {
                    cb(&e.message);
                }
                SubmitOutcome::Failed(e.message)
            }
        }
    }

    /// Ask the caller to leave the form
    pub fn cancel(&mut self) {
        let dirty = self.dirty;
        if let Some(cb) = self.config.on_cancel.as_mut() {
            cb(dirty);
        }
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// A click inside the form. Widget chrome first, then `submit` and
    /// `cancel`. Returns true if something handled it.
    pub async fn handle_action(&mut self, node: NodeId) -> bool {
        if self.manager.dispatch_action(&mut self.dom.borrow_mut(), node) {
            self.after_change(node);
            return true;
        }
        let action = match action_target(&self.dom.borrow(), node) {
            Some((action, _, _)) => action,
            None => return false,
        };
        match action.as_str() {
            "submit" => {
                self.submit().await;
                true
            }
            "cancel" => {
                self.cancel();
                true
            }
            other => {
                debug!(component = COMPONENT, action = other, "unhandled action");
                false
            }
        }
    }

    /// An input event on `node` (whose value is already updated)
    pub fn handle_input(&mut self, node: NodeId) {
        self.manager.notify_input(&mut self.dom.borrow_mut(), node);
        self.after_change(node);
    }

    /// Type `value` into the control named `name` and dispatch the input
    pub fn set_input(&mut self, name: &str, value: &str) -> bool {
        let control = {
            let mut doc = self.dom.borrow_mut();
            let control = self.form.and_then(|f| doc.find_first_by_attr(f, "name", name));
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
                warn!(component = COMPONENT, field = name, "no control for input");
                false
            }
        }
    }

    fn after_change(&mut self, node: NodeId) {
        self.dirty = true;
        let name = {
            let doc = self.dom.borrow();
            doc.attr(node, "name")
                .map(String::from)
                .or_else(|| {
                    doc.closest_with_attr(node, FIELD_NAME_ATTR)
                        .and_then(|w| doc.attr(w, FIELD_NAME_ATTR))
                        .map(String::from)
                })
        };
        if let Some(name) = name {
            if self.errors.contains(&name) {
                self.validate_field(&name);
            }
        }
        let data = self.get_data();
        self.draft = data.clone();
        if let Some(backup) = self.backup.as_mut() {
            backup.schedule(data.clone(), Instant::now());
        }
        if let Some(cb) = self.config.on_change.as_mut() {
            cb(&data);
        }
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

    /// Put focus on the first editable control
    pub fn focus(&self) -> Option<NodeId> {
        let form = self.form?;
        focus_first_field(&mut self.dom.borrow_mut(), form)
    }

    /// Tear down widgets, empty the container and drop the backup
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        let mut doc = self.dom.borrow_mut();
        self.manager.destroy_all(&mut doc);
        doc.clear_children(self.container);
        drop(doc);
        if let Some(backup) = self.backup.as_mut() {
            backup.clear();
        }
        self.form = None;
        self.destroyed = true;
        debug!(component = COMPONENT, r#type = %self.config.form_type, "form destroyed");
    }
}
