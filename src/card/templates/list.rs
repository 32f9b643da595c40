//! Expandable list markup: collapsed rows, inline edit forms and the
//! new-item form

use serde_json::Value;

use super::form::{self, FormActions};
use super::{action_button, empty_state, icon};
use crate::card::field::FieldSpec;
use crate::card::validation::FieldErrors;
use crate::card::{Item, ACTION_ATTR, ID_ATTR, ITEM_ID_ATTR, ROLE_ATTR};
use crate::dom::{el, nothing, El, Markup};
use crate::settings::LocaleSettings;

/// Key of the new-item form wherever a per-item key is needed
pub const NEW_ITEM_KEY: &str = "new";

#[derive(Debug, Clone, PartialEq)]
pub struct ListLayout {
    pub title_field: String,
    pub subtitle_field: Option<String>,
    /// Fields summarized on the collapsed row
    pub summary_fields: Vec<String>,
    pub allow_edit: bool,
    pub allow_delete: bool,
    pub allow_create: bool,
    pub create_label: String,
    pub empty_message: String,
    pub empty_icon: String,
    pub placeholder: String,
}

impl Default for ListLayout {
    fn default() -> Self {
        Self {
            title_field: "title".to_string(),
            subtitle_field: None,
            summary_fields: Vec::new(),
            allow_edit: true,
            allow_delete: true,
            allow_create: true,
            create_label: "Novo item".to_string(),
            empty_message: "Nenhum item cadastrado".to_string(),
            empty_icon: "list".to_string(),
            placeholder: "-".to_string(),
        }
    }
}

/// Id prefix of the controls inside an item's form
pub fn form_prefix(key: &str) -> String {
    format!("item-{}", key)
}

fn title_of(layout: &ListLayout, item: &Item) -> String {
    item.get(&layout.title_field)
        .map(crate::card::value_to_string)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "Sem título".to_string())
}

fn item_header(layout: &ListLayout, item: &Item, id: &str, expanded: bool) -> El {
    let subtitle = layout
        .subtitle_field
        .as_ref()
        .and_then(|f| item.get(f))
        .map(crate::card::value_to_string)
        .filter(|s| !s.is_empty());
    let mut buttons: Vec<Markup> = Vec::new();
    if layout.allow_edit && !expanded {
        buttons.push(action_button("edit", Some(id), "Editar", "btn-icon").into());
    }
    if layout.allow_delete {
        buttons.push(action_button("delete", Some(id), "Excluir", "btn-icon btn-danger").into());
    }
    el("div")
        .class("item-header")
        .child(
            el("div")
                .class("item-heading")
                .attr(ACTION_ATTR, "toggle")
                .attr(ID_ATTR, id)
                .child(icon(if expanded { "chevron-down" } else { "chevron-right" }))
                .child(el("span").class("item-title").attr(ROLE_ATTR, "title").text(title_of(layout, item)))
                .child(match subtitle {
                    Some(s) => el("span").class("item-subtitle").attr(ROLE_ATTR, "subtitle").text(s).into(),
                    None => nothing(),
                }),
        )
        .child(el("div").class("item-actions").children(buttons))
}

fn summary(layout: &ListLayout, fields: &[FieldSpec], item: &Item, locale: &LocaleSettings) -> Markup {
    let rows: Vec<Markup> = layout
        .summary_fields
        .iter()
        .filter_map(|name| fields.iter().find(|f| &f.name == name))
        .map(|f| {
            let value = item.get(&f.name).unwrap_or(&Value::Null);
            super::display::field_row(f, value, locale, &layout.placeholder)
        })
        .collect();
    if rows.iter().all(Markup::is_empty) {
        return nothing();
    }
    el("dl").class("item-summary").children(rows).into()
}

/// Collapsed row: header, summary and row actions
pub fn item_collapsed(
    layout: &ListLayout,
    fields: &[FieldSpec],
    item: &Item,
    id: &str,
    locale: &LocaleSettings,
) -> Markup {
    el("div")
        .class("card-list-item")
        .class("collapsed")
        .attr(ITEM_ID_ATTR, id)
        .child(item_header(layout, item, id, false))
        .child(summary(layout, fields, item, locale))
        .into()
}

/// Expanded row: header plus an inline edit form scoped to this item
pub fn item_expanded(
    layout: &ListLayout,
    fields: &[FieldSpec],
    item: &Item,
    id: &str,
    errors: &FieldErrors,
    loading: bool,
) -> Markup {
    let actions = FormActions {
        submit_action: "save".to_string(),
        cancel_action: "cancel".to_string(),
        ..Default::default()
    };
    el("div")
        .class("card-list-item")
        .class("expanded")
        .class_if(loading, "loading")
        .attr(ITEM_ID_ATTR, id)
        .child(item_header(layout, item, id, true))
        .child(
            el("div")
                .class("item-body")
                .child(form::form(&form_prefix(id), "item-form", fields, item, errors, &actions, Some(id), loading)),
        )
        .into()
}

/// The dedicated new-item form
pub fn create_form(fields: &[FieldSpec], values: &Item, errors: &FieldErrors, loading: bool) -> Markup {
    let actions = FormActions {
        submit_label: "Criar".to_string(),
        loading_label: "Criando...".to_string(),
        submit_action: "create".to_string(),
        cancel_action: "cancel-create".to_string(),
        ..Default::default()
    };
    el("div")
        .class("card-list-item")
        .class("card-list-create")
        .class_if(loading, "loading")
        .attr(ITEM_ID_ATTR, NEW_ITEM_KEY)
        .child(form::form(
            &form_prefix(NEW_ITEM_KEY),
            "create-form",
            fields,
            values,
            errors,
            &actions,
            None,
            loading,
        ))
        .into()
}

/// Toolbar with the new-item button (hidden while creating)
pub fn toolbar(layout: &ListLayout, creating: bool) -> Markup {
    if !layout.allow_create || creating {
        return nothing();
    }
    el("div")
        .class("card-list-toolbar")
        .child(action_button("new", None, &layout.create_label, "btn-primary").child(icon("plus")))
        .into()
}

/// Whole list: toolbar, optional create form, then rows or the empty state
pub fn list(layout: &ListLayout, create: Markup, rows: Vec<Markup>) -> Markup {
    let creating = !create.is_empty();
    let body: Markup = if rows.is_empty() && !creating {
        empty_state(&layout.empty_icon, &layout.empty_message).into()
    } else {
        el("div").class("card-list-items").children(rows).into()
    };
    el("div")
        .class("card-list")
        .child(toolbar(layout, creating))
        .child(create)
        .child(body)
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::field::FieldType;
    use serde_json::json;

    fn fields() -> Vec<FieldSpec> {
        vec![
            FieldSpec::text("title").required(),
            FieldSpec::new("area", FieldType::Text),
        ]
    }

    fn item() -> Item {
        serde_json::from_value(json!({"id": "t1", "title": "Férias", "area": "Trabalhista"})).unwrap()
    }

    #[test]
    fn test_collapsed_row() {
        let layout = ListLayout {
            summary_fields: vec!["area".to_string()],
            ..Default::default()
        };
        let html = item_collapsed(&layout, &fields(), &item(), "t1", &LocaleSettings::default()).to_string();
        assert!(html.starts_with("<div class=\"card-list-item collapsed\" data-item-id=\"t1\">"));
        assert!(html.contains("data-action=\"toggle\" data-id=\"t1\""));
        assert!(html.contains("data-action=\"edit\""));
        assert!(html.contains("Trabalhista"));
    }

    #[test]
    fn test_expanded_row_scopes_ids_to_item() {
        let mut errors = FieldErrors::new();
        errors.insert("title", "Este campo é obrigatório");
        let html = item_expanded(&ListLayout::default(), &fields(), &item(), "t1", &errors, false).to_string();
        assert!(html.contains("id=\"item-t1-title\""));
        assert!(html.contains("data-action=\"save\""));
        assert!(html.contains("Este campo é obrigatório"));
        // No edit button on the row being edited
        assert!(!html.contains("data-action=\"edit\""));
    }

    #[test]
    fn test_list_shell_empty_and_creating() {
        let layout = ListLayout::default();
        let empty = list(&layout, nothing(), Vec::new()).to_string();
        assert!(empty.contains("Nenhum item cadastrado"));
        assert!(empty.contains("data-action=\"new\""));

        let creating = list(
            &layout,
            create_form(&fields(), &Item::new(), &FieldErrors::new(), false),
            Vec::new(),
        )
        .to_string();
        assert!(!creating.contains("data-action=\"new\""));
        assert!(creating.contains("data-action=\"create\""));
        assert!(creating.contains("id=\"item-new-title\""));
    }
}
