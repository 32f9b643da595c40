//! Field validation
//!
//! Validators return `Ok(())` or a [`ValidationError`] whose `Display` is the
//! message shown under the field. Nothing here panics or throws; failures are
//! collected into [`FieldErrors`].

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::OnceLock;
use thiserror::Error;

use super::field::FieldSpec;
use crate::format::{parse_date, value_as_f64};

/// Key of the form-level (non-field) error
pub const FORM_ERROR_KEY: &str = "_form";

/// A single rule failure
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Este campo é obrigatório")]
    Required,
    #[error("Mínimo de {min} caracteres")]
    TooShort { min: usize },
    #[error("Máximo de {max} caracteres")]
    TooLong { max: usize },
    #[error("E-mail inválido")]
    InvalidEmail,
    #[error("URL inválida")]
    InvalidUrl,
    #[error("Telefone inválido")]
    InvalidPhone,
    #[error("Número inválido")]
    InvalidNumber,
    #[error("Data inválida")]
    InvalidDate,
    #[error("{0}")]
    Custom(String),
}

impl ValidationError {
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }
}

pub type Validator = Box<dyn Fn(&Value) -> Result<(), ValidationError>>;

// ============================================================================
// Value helpers
// ============================================================================

/// Empty for the purpose of `required`: null, blank text, empty list, false
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Bool(b) => !b,
        Value::Object(o) => o.is_empty(),
        Value::Number(_) => false,
    }
}

fn text_len(value: &Value) -> usize {
    match value {
        Value::String(s) => s.chars().count(),
        Value::Array(a) => a.len(),
        Value::Null => 0,
        other => other.to_string().chars().count(),
    }
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap())
}

fn phone_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\+?[\d\s().-]{8,24}$").unwrap())
}

// ============================================================================
// Built-in validators
// ============================================================================

pub mod validators {
    use super::*;

    pub fn required() -> Validator {
        Box::new(|v| if is_empty_value(v) { Err(ValidationError::Required) } else { Ok(()) })
    }

    pub fn min_length(min: usize) -> Validator {
        Box::new(move |v| check_min_length(v, min))
    }

    pub fn max_length(max: usize) -> Validator {
        Box::new(move |v| check_max_length(v, max))
    }

    pub fn email() -> Validator {
        Box::new(check_email)
    }

    pub fn url() -> Validator {
        Box::new(check_url)
    }

    pub fn phone() -> Validator {
        Box::new(check_phone)
    }

    /// Match the whole value against `pattern`, failing with `message`
    pub fn pattern(pattern: &str, message: impl Into<String>) -> Result<Validator, regex::Error> {
        let re = Regex::new(pattern)?;
        let message = message.into();
        Ok(Box::new(move |v| match v {
            Value::String(s) if !s.is_empty() && !re.is_match(s) => Err(ValidationError::Custom(message.clone())),
            _ => Ok(()),
        }))
    }
}

// Rule checks skip empty values; emptiness is `required`'s concern.

fn check_min_length(value: &Value, min: usize) -> Result<(), ValidationError> {
    if !is_empty_value(value) && text_len(value) < min {
        return Err(ValidationError::TooShort { min });
    }
    Ok(())
}

fn check_max_length(value: &Value, max: usize) -> Result<(), ValidationError> {
    if text_len(value) > max {
        return Err(ValidationError::TooLong { max });
    }
    Ok(())
}

fn as_text(value: &Value) -> Option<&str> {
    value.as_str().map(str::trim).filter(|s| !s.is_empty())
}

fn check_email(value: &Value) -> Result<(), ValidationError> {
    match as_text(value) {
        Some(s) if !email_regex().is_match(s) => Err(ValidationError::InvalidEmail),
        _ => Ok(()),
    }
}

fn check_url(value: &Value) -> Result<(), ValidationError> {
    let s = match as_text(value) {
        Some(s) => s,
        None => return Ok(()),
    };
    match url::Url::parse(s) {
        Ok(u) if matches!(u.scheme(), "http" | "https") && u.host().is_some() => Ok(()),
        _ => Err(ValidationError::InvalidUrl),
    }
}

fn check_phone(value: &Value) -> Result<(), ValidationError> {
    let s = match as_text(value) {
        Some(s) => s,
        None => return Ok(()),
    };
    let digits = s.chars().filter(|c| c.is_ascii_digit()).count();
    if phone_regex().is_match(s) && (10..=13).contains(&digits) {
        Ok(())
    } else {
        Err(ValidationError::InvalidPhone)
    }
}

fn check_number(value: &Value) -> Result<(), ValidationError> {
    match value {
        Value::Null => Ok(()),
        Value::String(s) if s.trim().is_empty() => Ok(()),
        other if value_as_f64(other).is_some() => Ok(()),
        _ => Err(ValidationError::InvalidNumber),
    }
}

fn check_date(value: &Value) -> Result<(), ValidationError> {
    match as_text(value) {
        Some(s) if parse_date(s).is_none() => Err(ValidationError::InvalidDate),
        _ => Ok(()),
    }
}

// ============================================================================
// Declarative rules
// ============================================================================

/// Format check for [`Rules::kind`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    Email,
    Url,
    Phone,
    Number,
    Date,
}

/// `{ required, minLength, maxLength, type }`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Rules {
    pub required: bool,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    #[serde(rename = "type")]
    pub kind: Option<RuleKind>,
}

impl Rules {
    pub fn required() -> Self {
        Self {
            required: true,
            ..Default::default()
        }
    }

    pub fn with_min_length(mut self, min: usize) -> Self {
        self.min_length = Some(min);
        self
    }

    pub fn with_max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    pub fn with_kind(mut self, kind: RuleKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn validate(&self, value: &Value) -> Result<(), ValidationError> {
        if is_empty_value(value) {
            return if self.required { Err(ValidationError::Required) } else { Ok(()) };
        }
        if let Some(min) = self.min_length {
            check_min_length(value, min)?;
        }
        if let Some(max) = self.max_length {
            check_max_length(value, max)?;
        }
        match self.kind {
            Some(RuleKind::Email) => check_email(value),
            Some(RuleKind::Url) => check_url(value),
            Some(RuleKind::Phone) => check_phone(value),
            Some(RuleKind::Number) => check_number(value),
            Some(RuleKind::Date) => check_date(value),
            None => Ok(()),
        }
    }
}

/// How one field is validated
pub enum ValidatorSpec {
    Func(Validator),
    /// Run in order, first failure wins
    Chain(Vec<Validator>),
    Rules(Rules),
}

impl ValidatorSpec {
    pub fn func(f: impl Fn(&Value) -> Result<(), ValidationError> + 'static) -> Self {
        Self::Func(Box::new(f))
    }

    pub fn validate(&self, value: &Value) -> Result<(), ValidationError> {
        match self {
            Self::Func(f) => f(value),
            Self::Chain(chain) => chain.iter().try_for_each(|f| f(value)),
            Self::Rules(rules) => rules.validate(value),
        }
    }
}

impl From<Rules> for ValidatorSpec {
    fn from(rules: Rules) -> Self {
        Self::Rules(rules)
    }
}

impl From<Validator> for ValidatorSpec {
    fn from(f: Validator) -> Self {
        Self::Func(f)
    }
}

impl From<Vec<Validator>> for ValidatorSpec {
    fn from(chain: Vec<Validator>) -> Self {
        Self::Chain(chain)
    }
}

impl std::fmt::Debug for ValidatorSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Func(_) => f.write_str("Func(..)"),
            Self::Chain(chain) => write!(f, "Chain({} validators)", chain.len()),
            Self::Rules(rules) => f.debug_tuple("Rules").field(rules).finish(),
        }
    }
}

pub type ValidatorMap = IndexMap<String, ValidatorSpec>;

// ============================================================================
// Error collection
// ============================================================================

/// Ordered field name -> message map
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(IndexMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.insert(field.into(), message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(|s| s.as_str())
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn remove(&mut self, field: &str) -> Option<String> {
        self.0.shift_remove(field)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Field names with errors, excluding the form-level entry
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|k| k.as_str()).filter(|k| *k != FORM_ERROR_KEY)
    }

    pub fn form_error(&self) -> Option<&str> {
        self.get(FORM_ERROR_KEY)
    }

    pub fn set_form_error(&mut self, message: impl Into<String>) {
        self.insert(FORM_ERROR_KEY, message);
    }
}

impl FromIterator<(String, String)> for FieldErrors {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ============================================================================
// Bulk validation
// ============================================================================

/// Validate `data` against a rules map. `None` when everything passes.
pub fn validate_object(data: &Map<String, Value>, rules: &ValidatorMap) -> Option<FieldErrors> {
    let mut errors = FieldErrors::new();
    for (name, spec) in rules {
        let value = data.get(name).unwrap_or(&Value::Null);
        if let Err(e) = spec.validate(value) {
            errors.insert(name.clone(), e.to_string());
        }
    }
    if errors.is_empty() {
        None
    } else {
        Some(errors)
    }
}

/// Validate one field: the rules its spec implies first, then its validator
pub fn validate_field(field: &FieldSpec, validator: Option<&ValidatorSpec>, value: &Value) -> Result<(), ValidationError> {
    if field.required && is_empty_value(value) {
        return Err(ValidationError::Required);
    }
    if let Some(min) = field.min_length {
        check_min_length(value, min)?;
    }
    if let Some(max) = field.max_length {
        check_max_length(value, max)?;
    }
    match validator {
        Some(spec) => spec.validate(value),
        None => Ok(()),
    }
}

/// Validate every declared field of a component against `data`
pub fn validate_fields(fields: &[FieldSpec], validators: &ValidatorMap, data: &Map<String, Value>) -> FieldErrors {
    let mut errors = FieldErrors::new();
    for field in fields.iter().filter(|f| !f.hidden) {
        let value = data.get(&field.name).unwrap_or(&Value::Null);
        if let Err(e) = validate_field(field, validators.get(&field.name), value) {
            errors.insert(field.name.clone(), e.to_string());
        }
    }
    // Validators for names outside the field list still run
    for (name, spec) in validators {
        if fields.iter().any(|f| &f.name == name) {
            continue;
        }
        let value = data.get(name).unwrap_or(&Value::Null);
        if let Err(e) = spec.validate(value) {
            errors.insert(name.clone(), e.to_string());
        }
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_required_rejects_blank_values() {
        let v = validators::required();
        assert_eq!(v(&json!("")), Err(ValidationError::Required));
        assert_eq!(v(&json!("   ")), Err(ValidationError::Required));
        assert_eq!(v(&json!(false)), Err(ValidationError::Required));
        assert!(v(&json!("ok")).is_ok());
        assert_eq!(ValidationError::Required.to_string(), "Este campo é obrigatório");
    }

    #[test]
    fn test_format_validators() {
        assert!(validators::email()(&json!("ana@escritorio.adv.br")).is_ok());
        assert_eq!(validators::email()(&json!("ana@")), Err(ValidationError::InvalidEmail));
        assert!(validators::url()(&json!("https://ialum.com.br")).is_ok());
        assert_eq!(validators::url()(&json!("ialum")), Err(ValidationError::InvalidUrl));
        assert_eq!(validators::url()(&json!("ftp://x.com")), Err(ValidationError::InvalidUrl));
        assert!(validators::phone()(&json!("(11) 91234-5678")).is_ok());
        assert_eq!(validators::phone()(&json!("123")), Err(ValidationError::InvalidPhone));
        // Empty values are left to `required`
        assert!(validators::email()(&json!("")).is_ok());
    }

    #[test]
    fn test_chain_first_failure_wins() {
        let spec = ValidatorSpec::Chain(vec![validators::required(), validators::min_length(5)]);
        assert_eq!(spec.validate(&json!("")), Err(ValidationError::Required));
        assert_eq!(spec.validate(&json!("abc")), Err(ValidationError::TooShort { min: 5 }));
        assert!(spec.validate(&json!("abcdef")).is_ok());
    }

    #[test]
    fn test_rules_from_json() {
        let rules: Rules = serde_json::from_str(r#"{"required": true, "maxLength": 3, "type": "number"}"#).unwrap();
        assert_eq!(rules.validate(&json!("")), Err(ValidationError::Required));
        assert_eq!(rules.validate(&json!("1234")), Err(ValidationError::TooLong { max: 3 }));
        assert_eq!(rules.validate(&json!("abc")), Err(ValidationError::InvalidNumber));
        assert!(rules.validate(&json!("12")).is_ok());
    }

    #[test]
    fn test_validate_object() {
        let mut rules = ValidatorMap::new();
        rules.insert("title".into(), Rules::required().into());
        rules.insert("site".into(), Rules::default().with_kind(RuleKind::Url).into());
        let mut data = Map::new();
        data.insert("title".into(), json!(""));
        data.insert("site".into(), json!("https://a.com"));
        let errors = validate_object(&data, &rules).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get("title"), Some("Este campo é obrigatório"));

        data.insert("title".into(), json!("ok"));
        assert!(validate_object(&data, &rules).is_none());
    }

    #[test]
    fn test_validate_fields_applies_spec_rules() {
        let fields = vec![
            FieldSpec::text("title").required(),
            FieldSpec::text("summary").with_max_length(4),
            FieldSpec::text("internal").required().hidden(),
        ];
        let mut validators_map = ValidatorMap::new();
        validators_map.insert(
            "slug".into(),
            validators::pattern("^[a-z-]+$", "Use letras minúsculas").unwrap().into(),
        );
        let mut data = Map::new();
        data.insert("summary".into(), json!("longo demais"));
        data.insert("slug".into(), json!("Com Espaço"));
        let errors = validate_fields(&fields, &validators_map, &data);
        assert_eq!(errors.get("title"), Some("Este campo é obrigatório"));
        assert_eq!(errors.get("summary"), Some("Máximo de 4 caracteres"));
        assert_eq!(errors.get("slug"), Some("Use letras minúsculas"));
        assert!(!errors.contains("internal"));
    }

    #[test]
    fn test_field_errors_form_key() {
        let mut errors = FieldErrors::new();
        errors.insert("title", "x");
        errors.set_form_error("Falha ao salvar");
        assert_eq!(errors.form_error(), Some("Falha ao salvar"));
        assert_eq!(errors.field_names().collect::<Vec<_>>(), vec!["title"]);
    }
}
