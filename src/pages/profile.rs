//! Lawyer profile card

use serde_json::json;
use tracing::info;

use crate::card::templates::display::{CustomAction, DisplayLayout};
use crate::card::{CardDisplay, DisplayConfig, FieldSpec, FieldType, Item};
use crate::dom::{Dom, NodeId};
use crate::error::ConfigError;
use crate::settings::Settings;

pub fn fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::new("oab", FieldType::Text).with_label("OAB"),
        FieldSpec::new("email", FieldType::Email).with_label("E-mail"),
        FieldSpec::new("phone", FieldType::Phone).with_label("Telefone"),
        FieldSpec::new("website", FieldType::Url).with_label("Site"),
        FieldSpec::new("consultation_fee", FieldType::Currency).with_label("Valor da consulta"),
        FieldSpec::new("member_since", FieldType::Date).with_label("Cliente desde"),
        FieldSpec::new("accepts_new_clients", FieldType::Boolean).with_label("Aceita novos clientes"),
        FieldSpec::new("bio", FieldType::Markdown)
            .with_label("Biografia")
            .show_empty()
            .with_empty_text("Sem biografia"),
    ]
}

pub fn mock_profile() -> Item {
    let value = json!({
        "id": "profile-1",
        "name": "Dra. Marina Albuquerque",
        "headline": "Advogada cível e do consumidor",
        "oab": "OAB/SP 123.456",
        "email": "marina@albuquerque.adv.br",
        "phone": "+55 (11) 98765-4321",
        "website": "https://albuquerque.adv.br",
        "consultation_fee": 350,
        "member_since": "2023-02-14",
        "accepts_new_clients": false,
        "bio": ""
    });
    match value {
        serde_json::Value::Object(map) => map,
        _ => Item::new(),
    }
}

pub fn mount(dom: &Dom, container: NodeId, settings: &Settings) -> Result<CardDisplay, ConfigError> {
    let layout = DisplayLayout {
        title_field: Some("name".to_string()),
        subtitle_field: Some("headline".to_string()),
        allow_edit: true,
        actions: vec![CustomAction::new("share", "Compartilhar")],
        ..Default::default()
    };
    let config = DisplayConfig::new(fields())
        .with_item(mock_profile())
        .with_layout(layout)
        .with_settings(settings.clone())
        .on_edit(|item| info!(item_id = ?item.get("id"), "profile edit requested"));
    CardDisplay::new(dom, container, config)
}
