//! Field declarations shared by every card component

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::util::humanize_name;

// ============================================================================
// Field Types
// ============================================================================

/// Every kind of field a card component knows how to render
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    #[default]
    Text,
    Email,
    Url,
    Password,
    Textarea,
    Select,
    Checkbox,
    Radio,
    FileUpload,
    ColorPicker,
    EmojiText,
    Markdown,
    FontSelector,
    Phone,
    Currency,
    Date,
    Datetime,
    Custom,
    // Display-only kinds
    Number,
    Boolean,
    Color,
    Json,
    Image,
}

impl FieldType {
    /// Parse a type name. Unknown names fall back to `Text`.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "email" => Self::Email,
            "url" => Self::Url,
            "password" => Self::Password,
            "textarea" => Self::Textarea,
            "select" => Self::Select,
            "checkbox" => Self::Checkbox,
            "radio" => Self::Radio,
            "file-upload" | "file" => Self::FileUpload,
            "color-picker" => Self::ColorPicker,
            "emoji-text" => Self::EmojiText,
            "markdown" => Self::Markdown,
            "font-selector" | "font" => Self::FontSelector,
            "phone" | "tel" => Self::Phone,
            "currency" => Self::Currency,
            "date" => Self::Date,
            "datetime" | "datetime-local" => Self::Datetime,
            "custom" => Self::Custom,
            "number" => Self::Number,
            "boolean" => Self::Boolean,
            "color" => Self::Color,
            "json" => Self::Json,
            "image" => Self::Image,
            _ => Self::Text,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Email => "email",
            Self::Url => "url",
            Self::Password => "password",
            Self::Textarea => "textarea",
            Self::Select => "select",
            Self::Checkbox => "checkbox",
            Self::Radio => "radio",
            Self::FileUpload => "file-upload",
            Self::ColorPicker => "color-picker",
            Self::EmojiText => "emoji-text",
            Self::Markdown => "markdown",
            Self::FontSelector => "font-selector",
            Self::Phone => "phone",
            Self::Currency => "currency",
            Self::Date => "date",
            Self::Datetime => "datetime",
            Self::Custom => "custom",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Color => "color",
            Self::Json => "json",
            Self::Image => "image",
        }
    }

    /// Rendered as a tagged wrapper and upgraded into a live widget
    pub fn is_structured(&self) -> bool {
        matches!(
            self,
            Self::FileUpload | Self::ColorPicker | Self::EmojiText | Self::Markdown | Self::FontSelector
        )
    }

    /// The structured kind used when this field is edited in a form
    pub fn widget_type(&self) -> Option<FieldType> {
        match self {
            Self::Color => Some(Self::ColorPicker),
            Self::Image => Some(Self::FileUpload),
            t if t.is_structured() => Some(*t),
            _ => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for FieldType {
    fn from(name: String) -> Self {
        Self::parse(&name)
    }
}

impl From<&str> for FieldType {
    fn from(name: &str) -> Self {
        Self::parse(name)
    }
}

impl From<FieldType> for String {
    fn from(kind: FieldType) -> Self {
        kind.as_str().to_string()
    }
}

// ============================================================================
// Options and sections
// ============================================================================

/// Option for select and radio fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }

    /// Create an option where value and label are the same
    pub fn simple(value: impl Into<String>) -> Self {
        let v = value.into();
        Self {
            label: v.clone(),
            value: v,
        }
    }
}

/// Named group of fields rendered under its own heading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Section {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    /// Field names, in display order
    pub fields: Vec<String>,
}

impl Default for Section {
    fn default() -> Self {
        Self {
            id: String::new(),
            title: String::new(),
            description: None,
            fields: Vec::new(),
        }
    }
}

impl Section {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_fields(mut self, names: &[&str]) -> Self {
        self.fields = names.iter().map(|n| n.to_string()).collect();
        self
    }
}

// ============================================================================
// Field definition
// ============================================================================

/// One field of a component's configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub label: Option<String>,
    pub placeholder: Option<String>,
    pub required: bool,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub options: Vec<SelectOption>,
    /// Accepted file types for uploads
    pub accept: Option<String>,
    pub multiple: bool,
    pub rows: Option<u32>,
    pub help: Option<String>,
    /// Id of the section this field belongs to
    pub section: Option<String>,
    pub hidden: bool,
    pub hide_label: bool,
    /// Show the field in displays even when its value is empty
    pub show_empty: bool,
    /// Placeholder for an empty value in displays
    pub empty_text: Option<String>,
    pub default_value: Option<Value>,
}

impl Default for FieldSpec {
    fn default() -> Self {
        Self {
            name: String::new(),
            field_type: FieldType::Text,
            label: None,
            placeholder: None,
            required: false,
            min_length: None,
            max_length: None,
            options: Vec::new(),
            accept: None,
            multiple: false,
            rows: None,
            help: None,
            section: None,
            hidden: false,
            hide_label: false,
            show_empty: false,
            empty_text: None,
            default_value: None,
        }
    }
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            ..Default::default()
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Text)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_min_length(mut self, min: usize) -> Self {
        self.min_length = Some(min);
        self
    }

    pub fn with_max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    pub fn with_options(mut self, options: Vec<SelectOption>) -> Self {
        self.options = options;
        self
    }

    pub fn with_accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    pub fn with_rows(mut self, rows: u32) -> Self {
        self.rows = Some(rows);
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn in_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn hide_label(mut self) -> Self {
        self.hide_label = true;
        self
    }

    pub fn show_empty(mut self) -> Self {
        self.show_empty = true;
        self
    }

    pub fn with_empty_text(mut self, text: impl Into<String>) -> Self {
        self.empty_text = Some(text.into());
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Configured label, or one derived from the field name
    pub fn label(&self) -> String {
        match &self.label {
            Some(l) => l.clone(),
            None => humanize_name(&self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names_and_aliases() {
        assert_eq!(FieldType::parse("emoji-text"), FieldType::EmojiText);
        assert_eq!(FieldType::parse("file"), FieldType::FileUpload);
        assert_eq!(FieldType::parse("font"), FieldType::FontSelector);
        assert_eq!(FieldType::parse("Color-Picker"), FieldType::ColorPicker);
        assert_eq!(FieldType::parse("hologram"), FieldType::Text);
        assert_eq!(FieldType::ColorPicker.as_str(), "color-picker");
    }

    #[test]
    fn test_structured_kinds() {
        let structured: Vec<FieldType> = [
            FieldType::FileUpload,
            FieldType::ColorPicker,
            FieldType::EmojiText,
            FieldType::Markdown,
            FieldType::FontSelector,
        ]
        .to_vec();
        assert!(structured.iter().all(|t| t.is_structured()));
        assert!(!FieldType::Textarea.is_structured());
        assert_eq!(FieldType::Color.widget_type(), Some(FieldType::ColorPicker));
        assert_eq!(FieldType::Email.widget_type(), None);
    }

    #[test]
    fn test_field_spec_from_json() {
        let spec: FieldSpec = serde_json::from_str(
            r#"{"name": "title", "type": "emoji-text", "required": true, "maxLength": 80, "hideLabel": true}"#,
        )
        .unwrap();
        assert_eq!(spec.field_type, FieldType::EmojiText);
        assert!(spec.required);
        assert_eq!(spec.max_length, Some(80));
        assert!(spec.hide_label);

        let fallback: FieldSpec = serde_json::from_str(r#"{"name": "x", "type": "mystery"}"#).unwrap();
        assert_eq!(fallback.field_type, FieldType::Text);
    }

    #[test]
    fn test_label_defaults_to_humanized_name() {
        assert_eq!(FieldSpec::text("publish_date").label(), "Publish date");
        assert_eq!(FieldSpec::text("x").with_label("Título").label(), "Título");
    }
}
