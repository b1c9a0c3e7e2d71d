//! Typed model of the training form.
//!
//! The form is the single shared mutable store of the dashboard: config sync,
//! the environment binder and the status poller all read and write it. Hosts
//! (the browser front end, the CLI, tests) build it once per mounted fragment
//! and keep their own widgets in step with it.

mod checklist;
mod name;

pub use checklist::{Checklist, ChecklistEntry};
pub use name::{FieldName, Section};

use serde_json::Value;

use crate::config::{
    numeric_text, scalar_text, FieldValue, SectionValues, StoredConfig, TrainingConfig,
};

/// Key of the repeated filter-key field inside `wrapper_settings`.
pub const FILTER_KEYS: &str = "filter_keys";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub disabled: bool,
}

impl SelectOption {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            label: value.clone(),
            value,
            disabled: false,
        }
    }

    pub fn labelled(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            disabled: false,
        }
    }

    pub fn placeholder(label: impl Into<String>) -> Self {
        Self {
            value: String::new(),
            label: label.into(),
            disabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Control {
    Text(String),
    Number(String),
    Select {
        options: Vec<SelectOption>,
        value: String,
    },
    Checkbox(bool),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Config slot this control is bound to; unbound controls are never
    /// collected or restored.
    pub name: Option<FieldName>,
    pub id: Option<String>,
    pub control: Control,
    /// Collected into configs and watched for unsaved edits.
    pub tracked: bool,
}

impl Field {
    pub fn text(name: FieldName, value: impl Into<String>) -> Self {
        Self::bound(name, Control::Text(value.into()))
    }

    pub fn number(name: FieldName, value: impl Into<String>) -> Self {
        Self::bound(name, Control::Number(value.into()))
    }

    pub fn checkbox(name: FieldName, checked: bool) -> Self {
        Self::bound(name, Control::Checkbox(checked))
    }

    pub fn select(name: FieldName, options: Vec<SelectOption>) -> Self {
        let value = options
            .iter()
            .find(|o| !o.disabled)
            .map(|o| o.value.clone())
            .unwrap_or_default();
        Self::bound(name, Control::Select { options, value })
    }

    fn bound(name: FieldName, control: Control) -> Self {
        Self {
            name: Some(name),
            id: None,
            control,
            tracked: true,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn untracked(mut self) -> Self {
        self.tracked = false;
        self
    }

    /// Current value as the browser would report `input.value`.
    pub fn value(&self) -> &str {
        match &self.control {
            Control::Text(v) | Control::Number(v) => v,
            Control::Select { value, .. } => value,
            Control::Checkbox(true) => "True",
            Control::Checkbox(false) => "False",
        }
    }

    pub fn field_value(&self) -> FieldValue {
        match &self.control {
            Control::Checkbox(checked) => FieldValue::Flag(*checked),
            _ => FieldValue::Text(self.value().to_string()),
        }
    }

    pub fn is_select(&self) -> bool {
        matches!(self.control, Control::Select { .. })
    }

    /// Assigns a raw value. Selects only accept one of their options; a
    /// checkbox reads the value as a flag. Returns whether anything changed.
    pub fn set_value(&mut self, raw: &str) -> bool {
        match &mut self.control {
            Control::Text(v) | Control::Number(v) => replace(v, raw),
            Control::Select { options, value } => {
                if !options.iter().any(|o| o.value == raw) {
                    return false;
                }
                replace(value, raw)
            }
            Control::Checkbox(checked) => {
                let next = is_truthy_text(raw);
                let changed = *checked != next;
                *checked = next;
                changed
            }
        }
    }

    pub fn set_checked(&mut self, next: bool) -> bool {
        match &mut self.control {
            Control::Checkbox(checked) => {
                let changed = *checked != next;
                *checked = next;
                changed
            }
            _ => false,
        }
    }

    /// Replaces a select's option list; the first enabled option becomes the
    /// value. No-op for other controls.
    pub fn replace_options(&mut self, next: Vec<SelectOption>) -> bool {
        let Control::Select { options, value } = &mut self.control else {
            return false;
        };
        *value = next
            .iter()
            .find(|o| !o.disabled)
            .map(|o| o.value.clone())
            .unwrap_or_default();
        *options = next;
        true
    }

    pub fn options(&self) -> &[SelectOption] {
        match &self.control {
            Control::Select { options, .. } => options,
            _ => &[],
        }
    }

    /// Restores this control from a stored config value.
    fn restore(&mut self, value: &Value) {
        match &mut self.control {
            Control::Select { options, value: current } => {
                let next = if value.is_null() {
                    "False".to_string()
                } else {
                    text_for_input(value)
                };
                if options.iter().any(|o| o.value == next) {
                    *current = next;
                } else {
                    tracing::debug!(
                        field = ?self.name,
                        value = %next,
                        "stored value is not among the select options; keeping current"
                    );
                }
            }
            Control::Number(current) => *current = numeric_text(value).unwrap_or_default(),
            Control::Text(current) => *current = text_for_input(value),
            Control::Checkbox(checked) => *checked = is_truthy(value),
        }
    }
}

fn replace(slot: &mut String, raw: &str) -> bool {
    if slot == raw {
        return false;
    }
    *slot = raw.to_string();
    true
}

fn text_for_input(value: &Value) -> String {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(scalar_text)
            .collect::<Vec<_>>()
            .join(","),
        other => scalar_text(other).unwrap_or_default(),
    }
}

fn is_truthy_text(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => is_truthy_text(s),
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::Null | Value::Array(_) | Value::Object(_) => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToggleGroup {
    Wrappers,
    Callbacks,
}

/// One optional training-pipeline extension checkbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toggle {
    pub group: ToggleGroup,
    pub value: String,
    pub label: String,
    pub checked: bool,
    /// Disabled in the page: always checked, whatever the config says.
    pub locked: bool,
}

impl Toggle {
    pub fn new(group: ToggleGroup, value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            group,
            label: value.clone(),
            value,
            checked: false,
            locked: false,
        }
    }

    pub fn locked(mut self) -> Self {
        self.locked = true;
        self.checked = true;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Form {
    fields: Vec<Field>,
    toggles: Vec<Toggle>,
    filter_keys: Checklist,
}

impl Form {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_toggle(mut self, toggle: Toggle) -> Self {
        self.toggles.push(toggle);
        self
    }

    pub fn push_field(&mut self, field: Field) {
        self.fields.push(field);
    }

    pub fn push_toggle(&mut self, toggle: Toggle) {
        self.toggles.push(toggle);
    }

    /// Text inputs for every key of a stored config, for hosts that have no
    /// page markup to scan.
    pub fn from_stored(stored: &StoredConfig) -> Self {
        let mut form = Form::new();
        for section in Section::all() {
            for key in stored.section(*section).keys() {
                let id = (*section == Section::EnvSettings).then(|| format!("env-setting-{key}"));
                let mut field = Field::text(FieldName::new(*section, key.clone()), "");
                field.id = id;
                form.push_field(field);
            }
        }
        for wrapper in &stored.enabled_wrappers {
            form.push_toggle(Toggle::new(ToggleGroup::Wrappers, wrapper.clone()));
        }
        for callback in &stored.enabled_callbacks {
            form.push_toggle(Toggle::new(ToggleGroup::Callbacks, callback.clone()));
        }
        form.apply_stored(stored);
        form
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn toggles(&self) -> &[Toggle] {
        &self.toggles
    }

    pub fn filter_keys(&self) -> &Checklist {
        &self.filter_keys
    }

    pub fn filter_keys_mut(&mut self) -> &mut Checklist {
        &mut self.filter_keys
    }

    pub fn field(&self, name: &FieldName) -> Option<&Field> {
        self.fields.iter().find(|f| f.name.as_ref() == Some(name))
    }

    pub fn field_mut(&mut self, name: &FieldName) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.name.as_ref() == Some(name))
    }

    pub fn field_by_id(&self, id: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.id.as_deref() == Some(id))
    }

    pub fn field_by_id_mut(&mut self, id: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.id.as_deref() == Some(id))
    }

    pub fn value(&self, name: &FieldName) -> Option<&str> {
        self.field(name).map(Field::value)
    }

    /// Sets a toggle's checked state. Locked toggles stay checked.
    pub fn set_toggle(&mut self, group: ToggleGroup, value: &str, checked: bool) -> bool {
        let Some(toggle) = self
            .toggles
            .iter_mut()
            .find(|t| t.group == group && t.value == value)
        else {
            return false;
        };
        let next = checked || toggle.locked;
        let changed = toggle.checked != next;
        toggle.checked = next;
        changed
    }

    /// Builds the config the backend expects from every tracked control.
    pub fn collect(&self) -> TrainingConfig {
        let mut config = TrainingConfig::default();
        for field in self.fields.iter().filter(|f| f.tracked) {
            let Some(name) = &field.name else { continue };
            let section = config.section_mut(name.section);
            if name.repeated {
                push_repeated(section, &name.key, field.value());
            } else {
                section.insert(name.key.clone(), field.field_value());
            }
        }

        if !self.filter_keys.is_empty() {
            config.wrapper_settings.insert(
                FILTER_KEYS.to_string(),
                FieldValue::List(self.filter_keys.checked_keys()),
            );
        }

        for toggle in self.toggles.iter().filter(|t| t.checked) {
            match toggle.group {
                ToggleGroup::Wrappers => config.wrappers.push(toggle.value.clone()),
                ToggleGroup::Callbacks => config.callbacks.push(toggle.value.clone()),
            }
        }
        config
    }

    /// Reconciles the form against a stored config.
    ///
    /// Controls whose key is present are overwritten; controls the config
    /// does not mention keep their value. Wrapper and callback groups are
    /// replaced outright.
    pub fn apply_stored(&mut self, stored: &StoredConfig) {
        for section in Section::all() {
            for (key, value) in stored.section(*section) {
                let name = FieldName::new(*section, key.clone());
                if let Some(field) = self.field_mut(&name) {
                    field.restore(value);
                    continue;
                }
                if self.restore_repeated(&FieldName::repeated(*section, key.clone()), value) {
                    continue;
                }
                if *section == Section::WrapperSettings && key == FILTER_KEYS {
                    if let Value::Array(items) = value {
                        let keys: Vec<String> = items.iter().filter_map(scalar_text).collect();
                        self.filter_keys.restore(&keys);
                    }
                }
            }
        }

        for toggle in &mut self.toggles {
            let enabled = match toggle.group {
                ToggleGroup::Wrappers => &stored.enabled_wrappers,
                ToggleGroup::Callbacks => &stored.enabled_callbacks,
            };
            toggle.checked = toggle.locked || enabled.contains(&toggle.value);
        }
    }

    /// Spreads a stored list over the controls sharing a repeated name, in
    /// form order. Controls past the end of the list are cleared. Returns
    /// whether any control carries the name.
    fn restore_repeated(&mut self, name: &FieldName, value: &Value) -> bool {
        let items = match value {
            Value::Array(items) => items.as_slice(),
            other => std::slice::from_ref(other),
        };
        let mut items = items.iter();
        let mut matched = false;
        for field in self.fields.iter_mut().filter(|f| f.name.as_ref() == Some(name)) {
            matched = true;
            field.restore(items.next().unwrap_or(&Value::Null));
        }
        matched
    }
}

fn push_repeated(section: &mut SectionValues, key: &str, value: &str) {
    let entry = section
        .entry(key.to_string())
        .or_insert_with(|| FieldValue::List(Vec::new()));
    if let FieldValue::List(items) = entry {
        items.push(value.to_string());
    }
}
