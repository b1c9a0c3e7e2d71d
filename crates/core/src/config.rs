//! Wire model of a training configuration.
//!
//! Outgoing configs ([`TrainingConfig`]) are built from the form and carry only
//! strings, checkbox booleans and repeated-field lists. Incoming configs
//! ([`StoredConfig`]) are whatever the backend persisted, so their sections are
//! kept as loose JSON and matched against the form on reconciliation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::form::Section;

/// Name reserved for the backend's built-in configuration.
pub const DEFAULT_CONFIG: &str = "default";

/// Suffix of the pseudo-entry that marks unsaved edits to a loaded config.
pub const UNSAVED_SUFFIX: &str = " ~unsaved~";

/// Selector value used when the default config has unsaved edits.
pub const UNSAVED_DEFAULT: &str = "unsaved";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Flag(value)
    }
}

pub type SectionValues = BTreeMap<String, FieldValue>;

/// Configuration collected from the form and sent to the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingConfig {
    #[serde(default)]
    pub training_config: SectionValues,
    #[serde(default)]
    pub hyperparameters: SectionValues,
    #[serde(default)]
    pub wrapper_settings: SectionValues,
    #[serde(default)]
    pub env_settings: SectionValues,
    #[serde(default)]
    pub wrappers: Vec<String>,
    #[serde(default)]
    pub callbacks: Vec<String>,
}

impl TrainingConfig {
    pub fn section(&self, section: Section) -> &SectionValues {
        match section {
            Section::TrainingConfig => &self.training_config,
            Section::Hyperparameters => &self.hyperparameters,
            Section::EnvSettings => &self.env_settings,
            Section::WrapperSettings => &self.wrapper_settings,
        }
    }

    pub fn section_mut(&mut self, section: Section) -> &mut SectionValues {
        match section {
            Section::TrainingConfig => &mut self.training_config,
            Section::Hyperparameters => &mut self.hyperparameters,
            Section::EnvSettings => &mut self.env_settings,
            Section::WrapperSettings => &mut self.wrapper_settings,
        }
    }
}

/// Configuration as returned by the backend (saved, default or active).
///
/// The backend stores checked wrappers and callbacks as `enabled_*`; the
/// `wrappers`/`callbacks` aliases let a config that was just saved in the
/// outgoing shape load back unchanged. Missing or null sections read as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredConfig {
    #[serde(default, deserialize_with = "or_null")]
    pub training_config: BTreeMap<String, Value>,
    #[serde(default, deserialize_with = "or_null")]
    pub hyperparameters: BTreeMap<String, Value>,
    #[serde(default, deserialize_with = "or_null")]
    pub wrapper_settings: BTreeMap<String, Value>,
    #[serde(default, deserialize_with = "or_null")]
    pub env_settings: BTreeMap<String, Value>,
    #[serde(default, alias = "wrappers", deserialize_with = "or_null")]
    pub enabled_wrappers: Vec<String>,
    #[serde(default, alias = "callbacks", deserialize_with = "or_null")]
    pub enabled_callbacks: Vec<String>,
}

fn or_null<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl StoredConfig {
    pub fn section(&self, section: Section) -> &BTreeMap<String, Value> {
        match section {
            Section::TrainingConfig => &self.training_config,
            Section::Hyperparameters => &self.hyperparameters,
            Section::EnvSettings => &self.env_settings,
            Section::WrapperSettings => &self.wrapper_settings,
        }
    }
}

impl From<&TrainingConfig> for StoredConfig {
    fn from(config: &TrainingConfig) -> Self {
        fn loosen(values: &SectionValues) -> BTreeMap<String, Value> {
            values
                .iter()
                .map(|(k, v)| {
                    let v = serde_json::to_value(v).unwrap_or(Value::Null);
                    (k.clone(), v)
                })
                .collect()
        }

        Self {
            training_config: loosen(&config.training_config),
            hyperparameters: loosen(&config.hyperparameters),
            wrapper_settings: loosen(&config.wrapper_settings),
            env_settings: loosen(&config.env_settings),
            enabled_wrappers: config.wrappers.clone(),
            enabled_callbacks: config.callbacks.clone(),
        }
    }
}

/// Renders a loose JSON scalar the way a text input shows it.
///
/// Booleans use the backend's `True`/`False` vocabulary; `None` means the
/// value has no scalar rendering (null, arrays, objects).
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(true) => Some("True".to_string()),
        Value::Bool(false) => Some("False".to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Parses a value as a float for a numeric input, the way `parseFloat` would
/// treat the leading numeric part of a string.
pub fn numeric_text(value: &Value) -> Option<String> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_leading_float(s),
        Value::Bool(_) | Value::Null | Value::Array(_) | Value::Object(_) => None,
    }?;
    Some(format_number(parsed))
}

fn parse_leading_float(raw: &str) -> Option<f64> {
    let trimmed = raw.trim_start();
    let candidate_len = trimmed
        .find(|c: char| !(c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E')))
        .unwrap_or(trimmed.len());
    (1..=candidate_len)
        .rev()
        .find_map(|len| trimmed[..len].parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Formats a float without a trailing `.0` for integral values.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
