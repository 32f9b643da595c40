//! Content topics: an editable list of legal subjects

use serde_json::json;

use super::items_from;
use crate::backup::BackupStore;
use crate::card::templates::list::ListLayout;
use crate::card::validation::Rules;
use crate::card::{CardList, FieldSpec, FieldType, Item, ListConfig, SelectOption};
use crate::dom::{Dom, NodeId};
use crate::error::ConfigError;
use crate::settings::Settings;

pub const LIST_TYPE: &str = "topic";

pub fn fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::text("title")
            .with_label("Título")
            .with_placeholder("Ex.: Direitos do consumidor em compras online")
            .required()
            .with_max_length(120),
        FieldSpec::new("area", FieldType::Select)
            .with_label("Área do direito")
            .with_options(vec![
                SelectOption::new("civil", "Cível"),
                SelectOption::new("trabalhista", "Trabalhista"),
                SelectOption::new("familia", "Família"),
                SelectOption::new("consumidor", "Consumidor"),
                SelectOption::new("previdenciario", "Previdenciário"),
            ]),
        FieldSpec::new("description", FieldType::Textarea)
            .with_label("Descrição")
            .with_rows(3)
            .with_max_length(500),
        FieldSpec::new("active", FieldType::Checkbox).with_label("Ativo"),
    ]
}

pub fn mock_items() -> Vec<Item> {
    items_from(json!([
        {
            "id": "top-1",
            "title": "Direitos do consumidor em compras online",
            "area": "consumidor",
            "description": "Prazo de arrependimento, trocas e devoluções.",
            "active": true
        },
        {
            "id": "top-2",
            "title": "Rescisão indireta do contrato de trabalho",
            "area": "trabalhista",
            "description": "Quando o empregado pode considerar o contrato rescindido.",
            "active": true
        },
        {
            "id": "top-3",
            "title": "Guarda compartilhada",
            "area": "familia",
            "description": "",
            "active": false
        }
    ]))
}

pub fn mount(dom: &Dom, container: NodeId, settings: &Settings, store: Option<BackupStore>) -> Result<CardList, ConfigError> {
    let layout = ListLayout {
        summary_fields: vec!["area".to_string(), "active".to_string()],
        create_label: "Novo tópico".to_string(),
        empty_message: "Nenhum tópico cadastrado".to_string(),
        ..Default::default()
    };
    let mut config = ListConfig::new(LIST_TYPE, fields())
        .with_items(mock_items())
        .with_layout(layout)
        .with_settings(settings.clone())
        .with_sort_by("title")
        .with_validator("title", Rules::required().with_min_length(5));
    if let Some(store) = store {
        config = config.with_store(store);
    }
    CardList::new(dom, container, config)
}
