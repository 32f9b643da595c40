//! Config-driven card components for the Ialum dashboard.
//!
//! A page builds a configuration (fields, validators, callbacks, items) and
//! hands it to one of [`CardList`], [`CardGrid`], [`CardForm`] or
//! [`CardDisplay`] together with a container in a shared [`Dom`].

pub mod backup;
pub mod card;
pub mod dom;
pub mod error;
pub mod format;
pub mod pages;
pub mod settings;
pub mod util;

pub use backup::{Backup, BackupStore, FileStore, KeyValueStore, MemoryStore};
pub use card::{
    CardDisplay, CardForm, CardGrid, CardList, DisplayConfig, DisplayMode, FieldErrors, FieldManager, FieldSpec,
    FieldType, FormConfig, FormMode, GridConfig, Item, ListConfig, ListOutcome, Section, SelectOption, SelectionMode,
    SubmitOutcome,
};
pub use dom::{Container, Dom, NodeId};
pub use error::{ConfigError, SettingsError, StoreError, SubmitError, WidgetError};
pub use settings::Settings;
