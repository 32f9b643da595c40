//! Brand identity form: colors, fonts, logo and slogan

use serde_json::json;
use tracing::info;

use crate::backup::BackupStore;
use crate::card::validation::{validators, ValidatorSpec};
use crate::card::{CardForm, FieldSpec, FieldType, FormConfig, FormMode, Item, Section};
use crate::dom::{Dom, NodeId};
use crate::error::ConfigError;
use crate::settings::Settings;

pub const FORM_TYPE: &str = "brand";

pub fn fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::text("brand_name").with_label("Nome da marca").required().in_section("identity"),
        FieldSpec::new("slogan", FieldType::EmojiText)
            .with_label("Slogan")
            .with_max_length(80)
            .in_section("identity"),
        FieldSpec::new("logo", FieldType::FileUpload)
            .with_label("Logotipo")
            .with_accept("image/png,image/svg+xml")
            .in_section("identity"),
        FieldSpec::new("primary_color", FieldType::ColorPicker)
            .with_label("Cor primária")
            .required()
            .in_section("visual"),
        FieldSpec::new("secondary_color", FieldType::ColorPicker)
            .with_label("Cor secundária")
            .in_section("visual"),
        FieldSpec::new("heading_font", FieldType::FontSelector)
            .with_label("Fonte dos títulos")
            .in_section("visual"),
        FieldSpec::new("about", FieldType::Markdown)
            .with_label("Sobre o escritório")
            .with_help("Aceita **negrito**, _itálico_ e listas.")
            .in_section("voice"),
        FieldSpec::new("website", FieldType::Url).with_label("Site").in_section("voice"),
    ]
}

pub fn sections() -> Vec<Section> {
    vec![
        Section::new("identity", "Identidade").with_fields(&["brand_name", "slogan", "logo"]),
        Section::new("visual", "Visual")
            .with_description("Cores e tipografia usadas nas publicações")
            .with_fields(&["primary_color", "secondary_color", "heading_font"]),
        Section::new("voice", "Comunicação").with_fields(&["about", "website"]),
    ]
}

pub fn mock_brand() -> Item {
    match json!({
        "id": "brand-1",
        "brand_name": "Albuquerque Advocacia",
        "slogan": "Seu direito, sem complicação ⚖️",
        "primary_color": "#1a3d6d",
        "secondary_color": "#c9a227",
        "heading_font": "Playfair Display",
        "about": "Escritório focado em **direito do consumidor**.",
        "website": "https://albuquerque.adv.br"
    }) {
        serde_json::Value::Object(map) => map,
        _ => Item::new(),
    }
}

pub fn mount(dom: &Dom, container: NodeId, settings: &Settings, store: Option<BackupStore>) -> Result<CardForm, ConfigError> {
    let mut config = FormConfig::new(FORM_TYPE, fields())
        .with_sections(sections())
        .with_mode(FormMode::Edit)
        .with_item(mock_brand())
        .with_title("Identidade visual")
        .with_settings(settings.clone())
        .with_validator("website", ValidatorSpec::from(validators::url()))
        .on_valid(|data| info!(fields = data.len(), "brand form valid"));
    if let Some(store) = store {
        config = config.with_store(store);
    }
    CardForm::new(dom, container, config)
}
