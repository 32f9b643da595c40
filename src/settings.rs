//! Product tuning constants loaded from a JSON settings file.
//!
//! Every field has a default so a partial (or missing) file is valid.
//! Components receive the settings through their config and may override
//! individual values per instance.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::SettingsError;

/// Durations used purely for CSS transition sequencing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnimationSettings {
    /// Expand/collapse height animation
    pub expand_ms: u64,
    /// How long the success flash class stays on a saved item
    pub success_flash_ms: u64,
    /// Delay between applying the exit class and removing a deleted item
    pub item_exit_ms: u64,
    /// How long a newly created item keeps its enter highlight
    pub item_enter_ms: u64,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            expand_ms: 300,
            success_flash_ms: 1500,
            item_exit_ms: 300,
            item_enter_ms: 1000,
        }
    }
}

impl AnimationSettings {
    /// All delays zeroed (tests, headless rendering)
    pub fn instant() -> Self {
        Self {
            expand_ms: 0,
            success_flash_ms: 0,
            item_exit_ms: 0,
            item_enter_ms: 0,
        }
    }

    pub fn expand(&self) -> Duration {
        Duration::from_millis(self.expand_ms)
    }

    pub fn success_flash(&self) -> Duration {
        Duration::from_millis(self.success_flash_ms)
    }

    pub fn item_exit(&self) -> Duration {
        Duration::from_millis(self.item_exit_ms)
    }

    pub fn item_enter(&self) -> Duration {
        Duration::from_millis(self.item_enter_ms)
    }
}

/// Presentation rules for dates, money and booleans
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LocaleSettings {
    pub code: String,
    pub currency_symbol: String,
    pub decimal_separator: String,
    pub thousands_separator: String,
    /// chrono format string for plain dates
    pub date_format: String,
    /// chrono format string for date + time
    pub datetime_format: String,
    pub yes: String,
    pub no: String,
}

impl Default for LocaleSettings {
    fn default() -> Self {
        Self {
            code: "pt-BR".to_string(),
            currency_symbol: "R$".to_string(),
            decimal_separator: ",".to_string(),
            thousands_separator: ".".to_string(),
            date_format: "%d/%m/%Y".to_string(),
            datetime_format: "%d/%m/%Y %H:%M".to_string(),
            yes: "Sim".to_string(),
            no: "Não".to_string(),
        }
    }
}

/// Top-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Debounce window between an input event and the backup write
    pub backup_debounce_ms: u64,
    /// Backups older than this are discarded on load
    pub backup_expiration_days: u64,
    pub animation: AnimationSettings,
    /// Whether destructive actions prompt by default
    pub confirm_delete: bool,
    pub locale: LocaleSettings,
    /// Shown for empty values in read-only displays
    pub empty_placeholder: String,
    /// Override for the backup store location
    pub data_dir: Option<PathBuf>,
    /// Catalog offered by the font selector widget
    pub fonts: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backup_debounce_ms: 1000,
            backup_expiration_days: 7,
            animation: AnimationSettings::default(),
            confirm_delete: true,
            locale: LocaleSettings::default(),
            empty_placeholder: "-".to_string(),
            data_dir: None,
            fonts: default_fonts(),
        }
    }
}

fn default_fonts() -> Vec<String> {
    [
        "Inter",
        "Roboto",
        "Open Sans",
        "Lato",
        "Montserrat",
        "Playfair Display",
        "Merriweather",
        "Source Serif Pro",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Settings {
    /// Settings with no debounce and no animation delays
    pub fn instant() -> Self {
        Self {
            backup_debounce_ms: 0,
            animation: AnimationSettings::instant(),
            ..Default::default()
        }
    }

    /// Load settings from a JSON file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "settings file not found, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(SettingsError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        let settings = Self::parse(&content).map_err(|source| SettingsError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        info!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    /// Parse settings from JSON text
    pub fn parse(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    pub fn backup_debounce(&self) -> Duration {
        Duration::from_millis(self.backup_debounce_ms)
    }

    pub fn backup_expiration(&self) -> Duration {
        Duration::from_secs(self.backup_expiration_days * 24 * 60 * 60)
    }

    /// Directory holding the persistent backup store
    pub fn data_dir(&self) -> PathBuf {
        if let Some(dir) = &self.data_dir {
            return dir.clone();
        }
        dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ialum")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings = Settings::parse(r#"{"backupDebounceMs": 250, "locale": {"currencySymbol": "$"}}"#).unwrap();
        assert_eq!(settings.backup_debounce(), Duration::from_millis(250));
        assert_eq!(settings.locale.currency_symbol, "$");
        assert_eq!(settings.locale.decimal_separator, ",");
        assert_eq!(settings.backup_expiration_days, 7);
        assert!(settings.confirm_delete);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("nope.json")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Settings::load(&path), Err(SettingsError::Parse { .. })));
    }

    #[test]
    fn test_data_dir_override() {
        let settings = Settings {
            data_dir: Some(PathBuf::from("/tmp/ialum-test")),
            ..Default::default()
        };
        assert_eq!(settings.data_dir(), PathBuf::from("/tmp/ialum-test"));
    }

    #[test]
    fn test_instant_zeroes_delays() {
        let settings = Settings::instant();
        assert_eq!(settings.backup_debounce(), Duration::ZERO);
        assert_eq!(settings.animation.item_exit(), Duration::ZERO);
        assert_eq!(settings.backup_expiration_days, 7);
    }
}
