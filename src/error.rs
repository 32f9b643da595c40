//! Error types shared by the card components and their collaborators.
//!
//! Only configuration problems are surfaced as hard errors at construction.
//! Validation failures are plain values (see `card::validation`), and
//! missing-DOM conditions are logged and turned into no-ops.

use thiserror::Error;

/// Invalid component configuration, raised before any DOM mutation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{component}: configuration requires a non-empty `type`")]
    MissingType { component: &'static str },

    #[error("{component}: configuration requires at least one field")]
    MissingFields { component: &'static str },

    #[error("{component}: duplicate field name `{name}`")]
    DuplicateField { component: &'static str, name: String },

    #[error("{component}: container `{selector}` not found")]
    ContainerNotFound { component: &'static str, selector: String },
}

/// A widget could not be mounted on its element.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WidgetError {
    #[error("element is not attached to the document")]
    Detached,

    #[error("widget already initialized on this element")]
    AlreadyMounted,

    #[error("no widget registered for field type `{0}`")]
    UnknownType(String),

    #[error("{0}")]
    Invalid(String),
}

/// Failure reading or writing the local key/value store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store contents are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure loading the settings file.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot read settings file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse settings file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Rejection from a caller-supplied submit/save hook.
///
/// The message is shown verbatim in the form-level error banner.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct SubmitError {
    pub message: String,
}

impl SubmitError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for SubmitError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for SubmitError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<anyhow::Error> for SubmitError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(format!("{:#}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_messages_name_component() {
        let err = ConfigError::DuplicateField {
            component: "CardForm",
            name: "title".to_string(),
        };
        assert_eq!(err.to_string(), "CardForm: duplicate field name `title`");
    }

    #[test]
    fn test_submit_error_conversions() {
        let from_str: SubmitError = "offline".into();
        let from_anyhow: SubmitError = anyhow::anyhow!("webhook returned 500").into();
        assert_eq!(from_str.message, "offline");
        assert_eq!(from_anyhow.to_string(), "webhook returned 500");
    }
}
