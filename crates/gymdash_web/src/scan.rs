//! Builds the typed [`Form`] from the controls of a freshly mounted fragment.
//!
//! The browser side reads every `input`, `select` and `textarea` of the
//! content container into a [`ScannedControl`]; everything after that is
//! plain data and runs on any target.

use gymdash::config_sync::CONFIG_SELECT_ID;
use gymdash::form::{Control, Field, FieldName, Form, SelectOption, Toggle, ToggleGroup, FILTER_KEYS};

/// Controls with this class are collected into configs and mark the
/// selection unsaved when edited.
pub const CONFIG_INPUT: &str = "config-input";
pub const WRAPPER_CHECKBOX: &str = "wrapper-checkbox";
pub const CALLBACK_CHECKBOX: &str = "callback-checkbox";
pub const FILTER_KEY_CHECKBOX: &str = "filter-key-checkbox";
pub const SELECT_ALL_KEYS_ID: &str = "select-all-keys";
pub const FILTER_KEYS_DROPDOWN_ID: &str = "filter-keys-dropdown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlKind {
    Text,
    Number,
    Checkbox,
    Select(Vec<SelectOption>),
    /// Buttons, radios and anything else the form does not model.
    Other,
}

/// One form control as read from the DOM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedControl {
    pub kind: ControlKind,
    pub name: Option<String>,
    pub id: Option<String>,
    pub value: String,
    pub checked: bool,
    pub disabled: bool,
    pub classes: Vec<String>,
}

impl ScannedControl {
    pub fn new(kind: ControlKind) -> Self {
        Self {
            kind,
            name: None,
            id: None,
            value: String::new(),
            checked: false,
            disabled: false,
            classes: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// The typed binding, if the name attribute has the `section[key]` shape.
    pub fn field_name(&self) -> Option<FieldName> {
        let raw = self.name.as_deref()?;
        match raw.parse() {
            Ok(name) => Some(name),
            Err(e) => {
                tracing::trace!(name = raw, error = %e, "control name is not a config binding");
                None
            }
        }
    }
}

/// Maps the scanned controls of one fragment onto a form.
///
/// Wrapper and callback checkboxes become toggles (disabled ones stay
/// checked). Filter-key checkboxes form the checklist. Named controls bind to
/// their config slot; unnamed controls with an id are kept unbound so
/// components can still address them. The config selector is owned by the
/// session and skipped.
pub fn build_form<I>(controls: I) -> Form
where
    I: IntoIterator<Item = ScannedControl>,
{
    let mut form = Form::new();
    let mut filter_keys: Vec<(String, bool)> = Vec::new();

    for control in controls {
        if control.kind == ControlKind::Other {
            continue;
        }
        if let Some(group) = toggle_group(&control) {
            let mut toggle = Toggle::new(group, control.value.clone());
            if control.disabled {
                toggle = toggle.locked();
            } else {
                toggle.checked = control.checked;
            }
            form.push_toggle(toggle);
            continue;
        }
        if control.has_class(FILTER_KEY_CHECKBOX)
            || control.field_name().is_some_and(|n| n.key == FILTER_KEYS)
        {
            filter_keys.push((control.value.clone(), control.checked));
            continue;
        }
        match control.id.as_deref() {
            Some(SELECT_ALL_KEYS_ID) | Some(CONFIG_SELECT_ID) => continue,
            _ => {}
        }
        if let Some(field) = field_for(control) {
            form.push_field(field);
        }
    }

    if !filter_keys.is_empty() {
        let checklist = form.filter_keys_mut();
        checklist.rebuild(filter_keys.iter().map(|(key, _)| key.clone()));
        let checked: Vec<String> = filter_keys
            .into_iter()
            .filter(|(_, checked)| *checked)
            .map(|(key, _)| key)
            .collect();
        checklist.restore(&checked);
    }
    form
}

fn toggle_group(control: &ScannedControl) -> Option<ToggleGroup> {
    if control.has_class(WRAPPER_CHECKBOX) {
        Some(ToggleGroup::Wrappers)
    } else if control.has_class(CALLBACK_CHECKBOX) {
        Some(ToggleGroup::Callbacks)
    } else {
        None
    }
}

fn field_for(control: ScannedControl) -> Option<Field> {
    let tracked = control.has_class(CONFIG_INPUT);
    let name = control.field_name();
    if name.is_none() && control.id.is_none() {
        return None;
    }

    let ScannedControl {
        kind,
        id,
        value,
        checked,
        ..
    } = control;
    let control = match kind {
        ControlKind::Text => Control::Text(value),
        ControlKind::Number => Control::Number(value),
        ControlKind::Checkbox => Control::Checkbox(checked),
        ControlKind::Select(options) => {
            let value = if options.iter().any(|o| o.value == value) {
                value
            } else {
                options
                    .iter()
                    .find(|o| !o.disabled)
                    .map(|o| o.value.clone())
                    .unwrap_or_default()
            };
            Control::Select { options, value }
        }
        ControlKind::Other => return None,
    };

    Some(Field {
        tracked: tracked && name.is_some(),
        name,
        id,
        control,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gymdash::form::Section;

    fn config_input(kind: ControlKind, name: &str, value: &str) -> ScannedControl {
        ScannedControl::new(kind)
            .with_name(name)
            .with_value(value)
            .with_class(CONFIG_INPUT)
    }

    #[test]
    fn named_controls_bind_to_config_slots() {
        let form = build_form([
            config_input(ControlKind::Number, "hyperparameters[n_steps]", "2048"),
            config_input(ControlKind::Text, "training_config[total_timesteps]", "1e6"),
            config_input(
                ControlKind::Select(vec![SelectOption::new("True"), SelectOption::new("False")]),
                "hyperparameters[normalize_advantage]",
                "False",
            ),
        ]);

        assert_eq!(form.value(&FieldName::hyper("n_steps")), Some("2048"));
        assert_eq!(form.value(&FieldName::training("total_timesteps")), Some("1e6"));
        assert_eq!(
            form.value(&FieldName::hyper("normalize_advantage")),
            Some("False")
        );
        assert!(form.fields().iter().all(|f| f.tracked));
    }

    #[test]
    fn unnamed_controls_are_kept_by_id_only() {
        let form = build_form([
            ScannedControl::new(ControlKind::Select(vec![SelectOption::new("sfiii3n")]))
                .with_id("game-select"),
            ScannedControl::new(ControlKind::Text).with_id("token"),
            ScannedControl::new(ControlKind::Text),
            ScannedControl::new(ControlKind::Other).with_id("start-training"),
            ScannedControl::new(ControlKind::Select(Vec::new())).with_id(CONFIG_SELECT_ID),
        ]);

        assert_eq!(form.fields().len(), 2);
        let game = form.field_by_id("game-select").unwrap();
        assert_eq!(game.value(), "sfiii3n");
        assert!(game.name.is_none());
        assert!(!game.tracked);
    }

    #[test]
    fn select_value_outside_options_falls_back_to_first_enabled() {
        let placeholder = SelectOption::placeholder("Pick one");
        let form = build_form([config_input(
            ControlKind::Select(vec![placeholder, SelectOption::new("64"), SelectOption::new("128")]),
            "hyperparameters[batch_size]",
            "999",
        )]);
        assert_eq!(form.value(&FieldName::hyper("batch_size")), Some("64"));
    }

    #[test]
    fn checkbox_groups_become_toggles_and_checklist() {
        let form = build_form([
            ScannedControl::new(ControlKind::Checkbox)
                .with_value("frame_stack")
                .with_class(WRAPPER_CHECKBOX)
                .checked(true),
            ScannedControl::new(ControlKind::Checkbox)
                .with_value("monitor")
                .with_class(WRAPPER_CHECKBOX)
                .disabled(),
            ScannedControl::new(ControlKind::Checkbox)
                .with_value("checkpoint")
                .with_class(CALLBACK_CHECKBOX),
            ScannedControl::new(ControlKind::Checkbox)
                .with_id(SELECT_ALL_KEYS_ID)
                .checked(false),
            ScannedControl::new(ControlKind::Checkbox)
                .with_name("wrapper_settings[filter_keys][]")
                .with_value("stage")
                .with_class(FILTER_KEY_CHECKBOX)
                .checked(true),
            ScannedControl::new(ControlKind::Checkbox)
                .with_name("wrapper_settings[filter_keys][]")
                .with_value("timer")
                .with_class(FILTER_KEY_CHECKBOX),
        ]);

        assert!(form.fields().is_empty());
        let config = form.collect();
        assert_eq!(config.wrappers, vec!["frame_stack", "monitor"]);
        assert!(config.callbacks.is_empty());
        assert_eq!(form.filter_keys().checked_keys(), vec!["stage"]);
        assert!(!form.filter_keys().select_all_checked());
        assert!(form.toggles().iter().any(|t| t.value == "monitor" && t.locked));
    }

    #[test]
    fn controls_without_config_input_class_are_not_collected() {
        let form = build_form([
            ScannedControl::new(ControlKind::Text)
                .with_name("env_settings[characters]")
                .with_id("env-setting-characters"),
            config_input(ControlKind::Number, "training_config[num_envs]", "4"),
        ]);
        let config = form.collect();
        assert!(config.section(Section::EnvSettings).is_empty());
        assert_eq!(config.section(Section::TrainingConfig).len(), 1);
    }
}
