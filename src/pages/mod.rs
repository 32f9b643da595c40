//! Page glue: each page builds one card component from mock data.
//!
//! Pages only assemble configuration; the components own all behavior.

pub mod brand;
pub mod profile;
pub mod schedule;
pub mod topics;

use serde_json::Value;
use std::time::Instant;
use tracing::warn;

use crate::backup::BackupStore;
use crate::card::{CardDisplay, CardForm, CardGrid, CardList, Item};
use crate::dom::markup::escape_text;
use crate::dom::{Dom, NodeId};
use crate::error::ConfigError;
use crate::settings::Settings;

/// Items from a JSON array literal. Non-object entries are skipped.
pub(crate) fn items_from(value: Value) -> Vec<Item> {
    match value {
        Value::Array(entries) => entries
            .into_iter()
            .filter_map(|entry| match entry {
                Value::Object(map) => Some(map),
                other => {
                    warn!(entry = %other, "mock entry is not an object");
                    None
                }
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Every page mounted into one document
pub struct Pages {
    pub topics: CardList,
    pub schedule: CardGrid,
    pub profile: CardDisplay,
    pub brand: CardForm,
}

impl Pages {
    /// Write every debounced backup whose window has elapsed
    pub fn tick(&mut self, now: Instant) -> bool {
        let topics = self.topics.tick(now);
        let brand = self.brand.tick(now);
        topics || brand
    }

    /// Wait for and write every pending backup
    pub async fn settle_backups(&mut self) {
        self.topics.settle_backup().await;
        self.brand.settle_backup().await;
    }
}

/// Page id, heading
pub const PAGE_TITLES: &[(&str, &str)] = &[
    ("topics", "Tópicos"),
    ("schedule", "Agendamentos"),
    ("profile", "Perfil"),
    ("brand", "Identidade visual"),
];

fn section(dom: &Dom, id: &str, title: &str) -> NodeId {
    let mut doc = dom.borrow_mut();
    let page = doc.create_container(&format!("page-{}", id));
    doc.add_class(page, "page");
    doc.set_attr(page, "data-title", title);
    page
}

/// Mount the four preview pages, in [`PAGE_TITLES`] order
pub fn mount_all(dom: &Dom, settings: &Settings, store: Option<BackupStore>) -> Result<Pages, ConfigError> {
    let containers: Vec<NodeId> = PAGE_TITLES.iter().map(|(id, title)| section(dom, id, title)).collect();
    Ok(Pages {
        topics: topics::mount(dom, containers[0], settings, store.clone())?,
        schedule: schedule::mount(dom, containers[1], settings)?,
        profile: profile::mount(dom, containers[2], settings)?,
        brand: brand::mount(dom, containers[3], settings, store)?,
    })
}

/// Standalone HTML page around the rendered document body
pub fn render_document(dom: &Dom, title: &str) -> String {
    let doc = dom.borrow();
    let body = doc.inner_html(doc.body());
    format!(
        "<!DOCTYPE html>\n<html lang=\"pt-BR\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        escape_text(title),
        body
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::{form_backup_key, KeyValueStore, MemoryStore};
    use serde_json::json;
    use std::rc::Rc;
    use std::time::Duration;

    #[test]
    fn test_items_from_skips_non_objects() {
        let items = items_from(json!([{"id": 1}, "stray", {"id": 2}]));
        assert_eq!(items.len(), 2);
        assert!(items_from(json!({"id": 1})).is_empty());
    }

    #[test]
    fn test_mount_all_renders_every_page() {
        let dom = Dom::new();
        let pages = mount_all(&dom, &Settings::instant(), None).unwrap();
        assert!(!pages.topics.get_items().is_empty());
        assert!(!pages.schedule.get_items().is_empty());
        assert!(pages.profile.get_item().is_some());
        assert!(pages.brand.form_node().is_some());

        let html = render_document(&dom, "Ialum");
        assert!(html.starts_with("<!DOCTYPE html>"));
        for (id, _) in PAGE_TITLES {
            assert!(html.contains(&format!("id=\"page-{}\"", id)));
        }
    }

    #[test]
    fn test_tick_writes_due_backups() {
        let memory: Rc<dyn KeyValueStore> = MemoryStore::shared();
        let settings = Settings::default();
        let store = BackupStore::new(memory, settings.backup_expiration());
        let dom = Dom::new();
        let mut pages = mount_all(&dom, &settings, Some(store.clone())).unwrap();
        pages.brand.set_input("brand_name", "Nova marca");
        assert!(!pages.tick(Instant::now()));
        assert!(pages.tick(Instant::now() + Duration::from_secs(2)));
        let saved = store.load(&form_backup_key(brand::FORM_TYPE)).unwrap();
        assert_eq!(saved["brand_name"], json!("Nova marca"));
    }
}
