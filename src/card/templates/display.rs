//! Read-only record markup

use serde_json::Value;

use super::{action_button, empty_state};
use crate::card::field::{FieldSpec, FieldType};
use crate::card::{is_truthy, value_to_string, Item, FIELD_NAME_ATTR, FIELD_TYPE_ATTR, ITEM_ID_ATTR, ROLE_ATTR};
use crate::dom::{el, nothing, text, El, Markup};
use crate::format::{format_currency, format_date, format_datetime, format_number, phone_href, value_as_f64};
use crate::settings::LocaleSettings;

/// A caller-supplied button in the actions row
#[derive(Debug, Clone, PartialEq)]
pub struct CustomAction {
    pub action: String,
    pub label: String,
    pub class: String,
}

impl CustomAction {
    pub fn new(action: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            label: label.into(),
            class: "btn-secondary".to_string(),
        }
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = class.into();
        self
    }
}

/// Which item fields play which part in a display card
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayLayout {
    pub title_field: Option<String>,
    pub subtitle_field: Option<String>,
    pub image_field: Option<String>,
    pub allow_edit: bool,
    pub allow_delete: bool,
    pub actions: Vec<CustomAction>,
    pub empty_message: String,
    pub empty_icon: String,
    pub placeholder: String,
}

impl Default for DisplayLayout {
    fn default() -> Self {
        Self {
            title_field: None,
            subtitle_field: None,
            image_field: None,
            allow_edit: false,
            allow_delete: false,
            actions: Vec::new(),
            empty_message: "Nenhum registro selecionado".to_string(),
            empty_icon: "inbox".to_string(),
            placeholder: "-".to_string(),
        }
    }
}

/// Whether a value counts as absent for display purposes. `false` on a
/// boolean field is a real answer and is shown.
pub fn is_blank(field: &FieldSpec, value: &Value) -> bool {
    match value {
        Value::Bool(false) => !matches!(field.field_type, FieldType::Boolean | FieldType::Checkbox),
        other => !is_truthy(other) && !matches!(other, Value::Number(_)),
    }
}

fn option_label<'a>(field: &'a FieldSpec, raw: &'a str) -> &'a str {
    field
        .options
        .iter()
        .find(|o| o.value == raw)
        .map(|o| o.label.as_str())
        .unwrap_or(raw)
}

/// Presentation of one value according to its field type
pub fn format_value(field: &FieldSpec, value: &Value, locale: &LocaleSettings, placeholder: &str) -> Markup {
    if is_blank(field, value) {
        let empty = field.empty_text.as_deref().unwrap_or(placeholder);
        return el("span").class("empty-value").text(empty).into();
    }
    let raw = value_to_string(value);
    match field.field_type {
        FieldType::Date => text(format_date(&raw, locale)),
        FieldType::Datetime => text(format_datetime(&raw, locale)),
        FieldType::Currency => match value_as_f64(value) {
            Some(amount) => text(format_currency(amount, locale)),
            None => text(raw),
        },
        FieldType::Number => match value_as_f64(value) {
            Some(n) => text(format_number(n, locale)),
            None => text(raw),
        },
        FieldType::Email => el("a").attr("href", format!("mailto:{}", raw)).text(raw).into(),
        FieldType::Url => el("a")
            .attr("href", raw.as_str())
            .attr("target", "_blank")
            .attr("rel", "noopener")
            .text(raw)
            .into(),
        FieldType::Phone => el("a").attr("href", phone_href(&raw)).text(raw).into(),
        FieldType::Boolean | FieldType::Checkbox if field.options.is_empty() => {
            let on = is_truthy(value);
            el("span")
                .class("bool-value")
                .class(if on { "yes" } else { "no" })
                .text(if on { locale.yes.as_str() } else { locale.no.as_str() })
                .into()
        }
        // The color picker widget adds the swatch once mounted
        FieldType::Color | FieldType::ColorPicker => el("span")
            .class("color-display")
            .attr(FIELD_TYPE_ATTR, FieldType::ColorPicker.as_str())
            .attr(FIELD_NAME_ATTR, field.name.as_str())
            .child(
                el("input")
                    .attr("type", "text")
                    .class("color-readonly")
                    .attr("value", raw)
                    .flag("readonly", true),
            )
            .into(),
        FieldType::Json => el("pre")
            .class("json-value")
            .text(serde_json::to_string_pretty(value).unwrap_or(raw))
            .into(),
        FieldType::Image => el("img").class("image-value").attr("src", raw).attr("alt", field.label()).into(),
        FieldType::Markdown => el("div")
            .class("markdown-value")
            .child(crate::card::widgets::render_markdown(&raw))
            .into(),
        FieldType::Select | FieldType::Radio | FieldType::Checkbox => match value {
            Value::Array(items) => {
                let labels: Vec<&str> = items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(|v| option_label(field, v))
                    .collect();
                text(labels.join(", "))
            }
            _ => text(option_label(field, &raw)),
        },
        _ => text(raw),
    }
}

/// Label + formatted value; omitted for blank values unless the field
/// opts into showing them
pub fn field_row(field: &FieldSpec, value: &Value, locale: &LocaleSettings, placeholder: &str) -> Markup {
    if field.hidden || (is_blank(field, value) && !field.show_empty) {
        return nothing();
    }
    el("div")
        .class("display-field")
        .class(&format!("field-{}", field.field_type))
        .attr("data-field", field.name.as_str())
        .child(el("dt").class("field-label").text(field.label()))
        .child(el("dd").class("field-value").child(format_value(field, value, locale, placeholder)))
        .into()
}

fn item_text(item: &Item, field: Option<&String>) -> Option<String> {
    let value = item.get(field?.as_str())?;
    let s = value_to_string(value);
    (!s.is_empty()).then_some(s)
}

/// Primary and secondary line
pub fn header(layout: &DisplayLayout, item: &Item) -> Markup {
    let title = item_text(item, layout.title_field.as_ref());
    let subtitle = item_text(item, layout.subtitle_field.as_ref());
    if title.is_none() && subtitle.is_none() {
        return nothing();
    }
    el("div")
        .class("display-header")
        .child(match title {
            Some(t) => el("h3").class("display-title").attr(ROLE_ATTR, "title").text(t).into(),
            None => nothing(),
        })
        .child(match subtitle {
            Some(s) => el("p").class("display-subtitle").attr(ROLE_ATTR, "subtitle").text(s).into(),
            None => nothing(),
        })
        .into()
}

pub fn image(layout: &DisplayLayout, item: &Item) -> Markup {
    match item_text(item, layout.image_field.as_ref()) {
        Some(src) => {
            let alt = item_text(item, layout.title_field.as_ref()).unwrap_or_default();
            el("div")
                .class("display-image")
                .child(el("img").attr("src", src).attr("alt", alt))
                .into()
        }
        None => nothing(),
    }
}

/// Edit and delete first, then custom actions
pub fn actions(layout: &DisplayLayout, id: Option<&str>) -> Markup {
    let mut buttons: Vec<Markup> = Vec::new();
    if layout.allow_edit {
        buttons.push(action_button("edit", id, "Editar", "btn-secondary").into());
    }
    if layout.allow_delete {
        buttons.push(action_button("delete", id, "Excluir", "btn-danger").into());
    }
    buttons.extend(
        layout
            .actions
            .iter()
            .map(|a| Markup::from(action_button(&a.action, id, &a.label, &a.class))),
    );
    if buttons.is_empty() {
        return nothing();
    }
    el("div").class("display-actions").children(buttons).into()
}

pub fn empty(layout: &DisplayLayout) -> Markup {
    el("div")
        .class("card-display")
        .class("is-empty")
        .child(empty_state(&layout.empty_icon, &layout.empty_message))
        .into()
}

/// Wrapper carrying the item id around a rendered body
pub fn frame(item: &Item, mode: &str, body: Markup) -> El {
    let id = crate::card::item_id(item);
    el("div")
        .class("card-display")
        .class(&format!("mode-{}", mode))
        .attr_opt(ITEM_ID_ATTR, id)
        .child(body)
}

/// Standard body: header, image, fields, actions
pub fn body(layout: &DisplayLayout, fields: &[FieldSpec], item: &Item, locale: &LocaleSettings) -> Markup {
    let id = crate::card::item_id(item);
    let rows = fields.iter().map(|f| {
        let value = item.get(&f.name).unwrap_or(&Value::Null);
        field_row(f, value, locale, &layout.placeholder)
    });
    crate::dom::fragment(vec![
        header(layout, item),
        image(layout, item),
        el("dl").class("display-fields").children(rows).into(),
        actions(layout, id.as_deref()),
    ])
}
