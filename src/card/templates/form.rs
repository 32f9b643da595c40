//! Form markup: field groups, controls, sections and action rows

use serde_json::Value;

use super::action_button;
use crate::card::field::{FieldSpec, FieldType, Section};
use crate::card::validation::FORM_ERROR_KEY;
use crate::card::{
    is_truthy, value_to_string, ACTION_ATTR, ERROR_FOR_ATTR, FIELD_GROUP_ATTR, FIELD_NAME_ATTR, FIELD_TYPE_ATTR,
    SECTION_ATTR,
};
use crate::dom::{el, nothing, text, El, Markup};

const SELECT_PLACEHOLDER: &str = "Selecione...";

/// Labels of the submit/cancel row
#[derive(Debug, Clone, PartialEq)]
pub struct FormActions {
    pub submit_label: String,
    pub cancel_label: Option<String>,
    pub loading_label: String,
    pub submit_action: String,
    pub cancel_action: String,
}

impl Default for FormActions {
    fn default() -> Self {
        Self {
            submit_label: "Salvar".to_string(),
            cancel_label: Some("Cancelar".to_string()),
            loading_label: "Salvando...".to_string(),
            submit_action: "submit".to_string(),
            cancel_action: "cancel".to_string(),
        }
    }
}

/// DOM id of a field's control: `{prefix}-{name}`
pub fn control_id(prefix: &str, name: &str) -> String {
    format!("{}-{}", prefix, name)
}

// ============================================================================
// Field groups
// ============================================================================

/// Field group with the default `field` id prefix
pub fn field_group(field: &FieldSpec, value: &Value, error: Option<&str>) -> Markup {
    field_group_in("field", field, value, error)
}

/// Label, control, error slot and help line for one field. Ids are
/// prefixed so several forms with the same field names can coexist.
pub fn field_group_in(prefix: &str, field: &FieldSpec, value: &Value, error: Option<&str>) -> Markup {
    let value = match (value, &field.default_value) {
        (Value::Null, Some(default)) => default,
        _ => value,
    };
    let id = control_id(prefix, &field.name);
    if field.hidden {
        return el("input")
            .attr("type", "hidden")
            .attr("id", id)
            .attr("name", field.name.as_str())
            .attr("value", value_to_string(value))
            .into();
    }

    // Checkboxes carry their label inline
    let inline_label = matches!(field.field_type, FieldType::Checkbox | FieldType::Boolean) && field.options.is_empty();
    let label = if field.hide_label || inline_label {
        nothing()
    } else {
        el("label")
            .class("form-label")
            .attr("for", id.as_str())
            .text(field.label())
            .child(if field.required {
                el("span").class("required").text(" *").into()
            } else {
                nothing()
            })
            .into()
    };

    el("div")
        .class("form-group")
        .class(&format!("field-{}", field.field_type))
        .class_if(error.is_some(), "has-error")
        .attr(FIELD_GROUP_ATTR, field.name.as_str())
        .child(label)
        .child(control(field, value, &id))
        .child(error_slot(&field.name, error))
        .child(match &field.help {
            Some(help) => el("small").class("field-help").text(help.as_str()).into(),
            None => nothing(),
        })
        .into()
}

/// Error placeholder bound to a field name
pub fn error_slot(name: &str, error: Option<&str>) -> El {
    el("div")
        .class("field-error")
        .class_if(error.is_some(), "visible")
        .attr(ERROR_FOR_ATTR, name)
        .text(error.unwrap_or(""))
}

/// Form-level error banner
pub fn form_error_banner(error: Option<&str>) -> El {
    el("div")
        .class("form-error")
        .class_if(error.is_some(), "visible")
        .attr(ERROR_FOR_ATTR, FORM_ERROR_KEY)
        .attr("role", "alert")
        .text(error.unwrap_or(""))
}

// ============================================================================
// Controls
// ============================================================================

fn text_input(field: &FieldSpec, input_type: &str, value: &Value, id: &str) -> El {
    el("input")
        .class("form-control")
        .attr("type", input_type)
        .attr("id", id)
        .attr("name", field.name.as_str())
        .attr("value", value_to_string(value))
        .attr_opt("placeholder", field.placeholder.as_deref())
        .attr_opt("maxlength", field.max_length.map(|m| m.to_string()))
        .attr_opt("minlength", field.min_length.map(|m| m.to_string()))
        .flag("required", field.required)
}

fn selected_values(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().map(value_to_string).collect(),
        Value::Null => Vec::new(),
        other => vec![value_to_string(other)],
    }
}

fn select(field: &FieldSpec, value: &Value, id: &str) -> El {
    let selected = selected_values(value);
    let placeholder = if field.multiple {
        nothing()
    } else {
        el("option")
            .attr("value", "")
            .text(field.placeholder.as_deref().unwrap_or(SELECT_PLACEHOLDER))
            .into()
    };
    el("select")
        .class("form-control")
        .attr("id", id)
        .attr("name", field.name.as_str())
        .flag("multiple", field.multiple)
        .flag("required", field.required)
        .child(placeholder)
        .children(field.options.iter().map(|o| {
            el("option")
                .attr("value", o.value.as_str())
                .flag("selected", selected.contains(&o.value))
                .text(o.label.as_str())
                .into()
        }))
}

fn choice_group(field: &FieldSpec, input_type: &str, value: &Value, id: &str) -> El {
    let selected = selected_values(value);
    el("div")
        .class(&format!("{}-group", input_type))
        .children(field.options.iter().enumerate().map(|(i, o)| {
            let option_id = format!("{}-{}", id, i);
            el("label")
                .class(&format!("{}-label", input_type))
                .attr("for", option_id.as_str())
                .child(
                    el("input")
                        .attr("type", input_type)
                        .attr("id", option_id.as_str())
                        .attr("name", field.name.as_str())
                        .attr("value", o.value.as_str())
                        .flag("checked", selected.contains(&o.value)),
                )
                .text(o.label.as_str())
                .into()
        }))
}

fn single_checkbox(field: &FieldSpec, value: &Value, id: &str) -> El {
    el("label")
        .class("checkbox-label")
        .attr("for", id)
        .child(
            el("input")
                .attr("type", "checkbox")
                .attr("id", id)
                .attr("name", field.name.as_str())
                .attr("value", "true")
                .flag("checked", is_truthy(value)),
        )
        .text(field.label())
        .child(if field.required {
            el("span").class("required").text(" *").into()
        } else {
            nothing()
        })
}

/// Tagged wrapper plus a minimal native control for a widget-backed field
pub fn structured_field(kind: FieldType, field: &FieldSpec, value: &Value, id: &str) -> El {
    let wrapper = el("div")
        .class("special-field")
        .class(&format!("{}-field", kind))
        .attr(FIELD_TYPE_ATTR, kind.as_str())
        .attr(FIELD_NAME_ATTR, field.name.as_str());
    let native = match kind {
        FieldType::FileUpload => el("input")
            .attr("type", "file")
            .attr("id", id)
            .attr("name", field.name.as_str())
            .attr_opt("accept", field.accept.as_deref())
            .flag("multiple", field.multiple),
        FieldType::Markdown => el("textarea")
            .class("form-control")
            .attr("id", id)
            .attr("name", field.name.as_str())
            .attr("rows", field.rows.unwrap_or(8).to_string())
            .attr_opt("placeholder", field.placeholder.as_deref())
            .attr_opt("maxlength", field.max_length.map(|m| m.to_string()))
            .flag("required", field.required)
            .text(value_to_string(value)),
        FieldType::ColorPicker => text_input(field, "text", value, id).class("color-input"),
        FieldType::FontSelector => text_input(field, "text", value, id).class("font-input"),
        _ => text_input(field, "text", value, id),
    };
    wrapper.child(native)
}

/// The input control for `field`, dispatched on its type
pub fn control(field: &FieldSpec, value: &Value, id: &str) -> Markup {
    if let Some(kind) = field.field_type.widget_type() {
        return structured_field(kind, field, value, id).into();
    }
    let control = match field.field_type {
        FieldType::Text => text_input(field, "text", value, id),
        FieldType::Email => text_input(field, "email", value, id),
        FieldType::Url => text_input(field, "url", value, id),
        FieldType::Password => text_input(field, "password", value, id).attr("autocomplete", "new-password"),
        FieldType::Phone => text_input(field, "tel", value, id),
        FieldType::Date => text_input(field, "date", value, id),
        FieldType::Datetime => text_input(field, "datetime-local", value, id),
        FieldType::Number => text_input(field, "number", value, id),
        FieldType::Currency => text_input(field, "text", value, id)
            .class("currency-input")
            .attr("inputmode", "decimal"),
        FieldType::Textarea => el("textarea")
            .class("form-control")
            .attr("id", id)
            .attr("name", field.name.as_str())
            .attr("rows", field.rows.unwrap_or(4).to_string())
            .attr_opt("placeholder", field.placeholder.as_deref())
            .attr_opt("maxlength", field.max_length.map(|m| m.to_string()))
            .flag("required", field.required)
            .text(value_to_string(value)),
        FieldType::Json => el("textarea")
            .class("form-control")
            .class("json-input")
            .attr("id", id)
            .attr("name", field.name.as_str())
            .attr("rows", field.rows.unwrap_or(6).to_string())
            .text(match value {
                Value::Object(_) | Value::Array(_) => serde_json::to_string_pretty(value).unwrap_or_default(),
                other => value_to_string(other),
            }),
        FieldType::Select => select(field, value, id),
        FieldType::Radio => choice_group(field, "radio", value, id),
        FieldType::Checkbox | FieldType::Boolean if field.options.is_empty() => single_checkbox(field, value, id),
        FieldType::Checkbox | FieldType::Boolean => choice_group(field, "checkbox", value, id),
        FieldType::Custom => el("div")
            .class("custom-field")
            .attr(FIELD_NAME_ATTR, field.name.as_str())
            .child(text_input(field, "text", value, id)),
        // Widget-backed kinds returned above
        FieldType::FileUpload
        | FieldType::ColorPicker
        | FieldType::EmojiText
        | FieldType::Markdown
        | FieldType::FontSelector
        | FieldType::Color
        | FieldType::Image => text_input(field, "text", value, id),
    };
    control.into()
}

// ============================================================================
// Layout pieces
// ============================================================================

/// Empty container that section layout moves field groups into
pub fn section_container(section: &Section) -> Markup {
    el("fieldset")
        .class("form-section")
        .attr(SECTION_ATTR, section.id.as_str())
        .child(el("legend").class("section-title").text(section.title.as_str()))
        .child(match &section.description {
            Some(d) => el("p").class("section-description").text(d.as_str()).into(),
            None => nothing(),
        })
        .child(el("div").class("section-fields"))
        .into()
}

/// Submit/cancel row. While `loading` the submit button is disabled and
/// shows the loading label.
pub fn form_actions(actions: &FormActions, id: Option<&str>, loading: bool) -> Markup {
    let submit_label = if loading { &actions.loading_label } else { &actions.submit_label };
    let submit = el("button")
        .attr("type", "submit")
        .class("btn btn-primary")
        .class_if(loading, "loading")
        .attr(ACTION_ATTR, actions.submit_action.as_str())
        .attr_opt(crate::card::ID_ATTR, id)
        .flag("disabled", loading)
        .text(submit_label.as_str());
    let cancel = match &actions.cancel_label {
        Some(label) => action_button(&actions.cancel_action, id, label, "btn-secondary")
            .flag("disabled", loading)
            .into(),
        None => nothing(),
    };
    el("div").class("form-actions").child(cancel).child(submit).into()
}

/// A complete form: banner, field groups and actions
#[allow(clippy::too_many_arguments)]
pub fn form(
    prefix: &str,
    class: &str,
    fields: &[FieldSpec],
    values: &serde_json::Map<String, Value>,
    errors: &crate::card::FieldErrors,
    actions: &FormActions,
    action_id: Option<&str>,
    loading: bool,
) -> El {
    let groups = fields.iter().map(|f| {
        let value = values.get(&f.name).unwrap_or(&Value::Null);
        field_group_in(prefix, f, value, errors.get(&f.name))
    });
    el("form")
        .class("card-form")
        .class(class)
        .attr("novalidate", "")
        .child(form_error_banner(errors.form_error()))
        .child(el("div").class("form-fields").children(groups))
        .child(form_actions(actions, action_id, loading))
}

/// Form title, omitted when empty
pub fn heading(title: &str) -> Markup {
    if title.is_empty() {
        return nothing();
    }
    el("h3").class("form-title").child(text(title)).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::field::SelectOption;
    use serde_json::json;

    #[test]
    fn test_text_group_with_error_and_help() {
        let field = FieldSpec::text("title")
            .with_label("Título")
            .required()
            .with_max_length(80)
            .with_help("Aparece no card");
        let html = field_group(&field, &json!("Olá"), Some("Este campo é obrigatório")).to_string();
        assert!(html.starts_with("<div class=\"form-group field-text has-error\" data-field-group=\"title\">"));
        assert!(html.contains("<label class=\"form-label\" for=\"field-title\">Título<span class=\"required\"> *</span></label>"));
        assert!(html.contains("maxlength=\"80\""));
        assert!(html.contains("value=\"Olá\""));
        assert!(html.contains("<div class=\"field-error visible\" data-error-for=\"title\">Este campo é obrigatório</div>"));
        assert!(html.contains("<small class=\"field-help\">Aparece no card</small>"));
    }

    #[test]
    fn test_structured_field_is_tagged_wrapper() {
        let field = FieldSpec::new("logo", FieldType::FileUpload).with_accept("image/*");
        let html = control(&field, &Value::Null, "field-logo").to_string();
        assert_eq!(
            html,
            "<div class=\"special-field file-upload-field\" data-field-type=\"file-upload\" data-field-name=\"logo\">\
             <input type=\"file\" id=\"field-logo\" name=\"logo\" accept=\"image/*\"></div>"
        );
        // Display-only color edits through the color picker
        let color = control(&FieldSpec::new("accent", FieldType::Color), &json!("#fff"), "c").to_string();
        assert!(color.contains("data-field-type=\"color-picker\""));
    }

    #[test]
    fn test_select_marks_selected_option() {
        let field = FieldSpec::new("status", FieldType::Select)
            .with_options(vec![SelectOption::new("draft", "Rascunho"), SelectOption::new("live", "Publicado")]);
        let html = control(&field, &json!("live"), "s").to_string();
        assert!(html.contains("<option value>Selecione...</option>"));
        assert!(html.contains("<option value=\"live\" selected>Publicado</option>"));
        assert!(!html.contains("<option value=\"draft\" selected>"));
    }

    #[test]
    fn test_checkbox_has_inline_label() {
        let field = FieldSpec::new("published", FieldType::Checkbox).with_label("Publicado");
        let html = field_group(&field, &json!(true), None).to_string();
        assert!(!html.contains("form-label"));
        assert!(html.contains("type=\"checkbox\""));
        assert!(html.contains("checked"));
    }

    #[test]
    fn test_hidden_field_and_default_value() {
        let hidden = FieldSpec::text("tenant").hidden();
        assert_eq!(
            field_group(&hidden, &json!("t1"), None).to_string(),
            "<input type=\"hidden\" id=\"field-tenant\" name=\"tenant\" value=\"t1\">"
        );
        let with_default = FieldSpec::text("tone").with_default(json!("formal"));
        assert!(field_group(&with_default, &Value::Null, None).to_string().contains("value=\"formal\""));
    }

    #[test]
    fn test_form_actions_loading_state() {
        let html = form_actions(&FormActions::default(), None, true).to_string();
        assert!(html.contains("Salvando..."));
        assert!(html.contains("disabled"));
    }
}
