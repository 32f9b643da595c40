//! Selectable card grid markup

use serde_json::Value;

use super::{empty_state, icon};
use crate::card::{value_to_string, Item, ACTION_ATTR, ID_ATTR, ITEM_ID_ATTR, ROLE_ATTR};
use crate::dom::{el, nothing, Markup};
use crate::util::truncate_str;

const SUBTITLE_MAX_CHARS: usize = 120;

/// Which item fields feed each part of a grid card
#[derive(Debug, Clone, PartialEq)]
pub struct GridLayout {
    pub title_field: String,
    pub subtitle_field: Option<String>,
    pub image_field: Option<String>,
    /// Icon shown when there is no image
    pub icon: Option<String>,
    pub badge_fields: Vec<String>,
    pub columns: u32,
    pub selectable: bool,
    pub empty_message: String,
    pub empty_icon: String,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self {
            title_field: "title".to_string(),
            subtitle_field: None,
            image_field: None,
            icon: None,
            badge_fields: Vec::new(),
            columns: 3,
            selectable: true,
            empty_message: "Nenhum item encontrado".to_string(),
            empty_icon: "grid".to_string(),
        }
    }
}

fn text_of(item: &Item, field: &str) -> Option<String> {
    let s = value_to_string(item.get(field)?);
    (!s.is_empty()).then_some(s)
}

fn badges(layout: &GridLayout, item: &Item) -> Markup {
    let values: Vec<String> = layout
        .badge_fields
        .iter()
        .filter_map(|f| item.get(f))
        .flat_map(|v| match v {
            Value::Array(items) => items.iter().map(value_to_string).collect(),
            other => vec![value_to_string(other)],
        })
        .filter(|s| !s.is_empty())
        .collect();
    if values.is_empty() {
        return nothing();
    }
    el("div")
        .class("item-badges")
        .children(values.into_iter().map(|v| Markup::from(el("span").class("badge").text(v))))
        .into()
}

/// One card. Clicking anywhere on it dispatches `select` (or `click` when
/// the grid is not selectable).
pub fn grid_item(layout: &GridLayout, item: &Item, id: &str, selected: bool) -> Markup {
    let media = match layout.image_field.as_deref().and_then(|f| text_of(item, f)) {
        Some(src) => el("div")
            .class("item-image")
            .child(
                el("img")
                    .attr("src", src)
                    .attr("alt", text_of(item, &layout.title_field).unwrap_or_default())
                    .attr("loading", "lazy"),
            )
            .into(),
        None => match &layout.icon {
            Some(name) => el("div").class("item-icon").child(icon(name)).into(),
            None => nothing(),
        },
    };
    let subtitle = match layout.subtitle_field.as_deref().and_then(|f| text_of(item, f)) {
        Some(s) => el("p")
            .class("item-subtitle")
            .attr(ROLE_ATTR, "subtitle")
            .text(truncate_str(&s, SUBTITLE_MAX_CHARS))
            .into(),
        None => nothing(),
    };
    el("div")
        .class("card-grid-item")
        .class_if(selected, "selected")
        .attr(ITEM_ID_ATTR, id)
        .attr(ACTION_ATTR, if layout.selectable { "select" } else { "click" })
        .attr(ID_ATTR, id)
        .attr("aria-selected", if selected { "true" } else { "false" })
        .child(media)
        .child(
            el("div")
                .class("item-body")
                .child(
                    el("h4")
                        .class("item-title")
                        .attr(ROLE_ATTR, "title")
                        .text(text_of(item, &layout.title_field).unwrap_or_default()),
                )
                .child(subtitle)
                .child(badges(layout, item)),
        )
        .into()
}

/// Grid container around rendered cards, or the empty state
pub fn grid(layout: &GridLayout, cards: Vec<Markup>) -> Markup {
    if cards.is_empty() {
        return el("div")
            .class("card-grid")
            .class("is-empty")
            .child(empty_state(&layout.empty_icon, &layout.empty_message))
            .into();
    }
    el("div")
        .class("card-grid")
        .attr("style", format!("--columns: {}", layout.columns.max(1)))
        .children(cards)
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item() -> Item {
        serde_json::from_value(json!({
            "id": "a1",
            "title": "Direito do Consumidor",
            "area": "Cível",
            "tags": ["blog", "instagram"]
        }))
        .unwrap()
    }

    #[test]
    fn test_grid_item_markup() {
        let layout = GridLayout {
            subtitle_field: Some("area".to_string()),
            badge_fields: vec!["tags".to_string()],
            icon: Some("scale".to_string()),
            ..Default::default()
        };
        let html = grid_item(&layout, &item(), "a1", true).to_string();
        assert!(html.starts_with(
            "<div class=\"card-grid-item selected\" data-item-id=\"a1\" data-action=\"select\" data-id=\"a1\""
        ));
        assert!(html.contains("<h4 class=\"item-title\" data-role=\"title\">Direito do Consumidor</h4>"));
        assert!(html.contains("<p class=\"item-subtitle\" data-role=\"subtitle\">Cível</p>"));
        assert!(html.contains("<span class=\"badge\">instagram</span>"));
        assert!(html.contains("icon-scale"));
    }

    #[test]
    fn test_empty_grid_shows_empty_state() {
        let html = grid(&GridLayout::default(), Vec::new()).to_string();
        assert!(html.contains("Nenhum item encontrado"));
        let full = grid(&GridLayout::default(), vec![grid_item(&GridLayout::default(), &item(), "a1", false)]);
        assert!(full.to_string().contains("style=\"--columns: 3\""));
    }
}
