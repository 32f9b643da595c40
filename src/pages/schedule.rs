//! Scheduled posts as a selectable grid

use serde_json::json;
use tracing::info;

use super::items_from;
use crate::card::templates::grid::GridLayout;
use crate::card::{value_to_string, CardGrid, GridConfig, Item, SelectionMode};
use crate::dom::{Dom, NodeId};
use crate::error::ConfigError;
use crate::format::format_datetime;
use crate::settings::Settings;

pub fn mock_items(settings: &Settings) -> Vec<Item> {
    let mut items = items_from(json!([
        {
            "id": "post-1",
            "title": "5 direitos de quem compra pela internet",
            "scheduled_at": "2024-07-01T09:00",
            "channels": ["instagram", "blog"]
        },
        {
            "id": "post-2",
            "title": "Horas extras: como calcular",
            "scheduled_at": "2024-07-03T18:30",
            "channels": ["linkedin"]
        },
        {
            "id": "post-3",
            "title": "Pensão alimentícia para maiores de 18",
            "scheduled_at": "2024-07-05T12:00",
            "channels": ["instagram"]
        }
    ]));
    // Cards show the localized date as their subtitle
    for item in items.iter_mut() {
        let when = item.get("scheduled_at").map(value_to_string).unwrap_or_default();
        item.insert("when".to_string(), json!(format_datetime(&when, &settings.locale)));
    }
    items
}

pub fn mount(dom: &Dom, container: NodeId, settings: &Settings) -> Result<CardGrid, ConfigError> {
    let layout = GridLayout {
        subtitle_field: Some("when".to_string()),
        badge_fields: vec!["channels".to_string()],
        icon: Some("calendar".to_string()),
        columns: 3,
        empty_message: "Nenhuma publicação agendada".to_string(),
        ..Default::default()
    };
    let config = GridConfig::new(mock_items(settings))
        .with_layout(layout)
        .with_selection(SelectionMode::Multiple)
        .on_selection_changed(|selected| info!(selected = selected.len(), "schedule selection changed"));
    CardGrid::new(dom, container, config)
}
