//! Per-game environment settings.
//!
//! Changing the game regenerates everything game-specific from the backend's
//! schema: the filter-key checklist is rebuilt from scratch and every
//! `env-setting-<key>` control is refilled. Nothing from the previous game
//! survives.

use std::rc::Rc;

use crate::api::{Backend, EnvSettingValue, EnvironmentSchema, OptionEntry};
use crate::config::scalar_text;
use crate::error::DashError;
use crate::form::{Form, SelectOption, FILTER_KEYS};
use crate::session::{Component, Session};

pub const GAME_SELECT_ID: &str = "game-select";
pub const CHARACTERS_ID: &str = "env-setting-characters";

pub fn env_field_id(key: &str) -> String {
    format!("env-setting-{key}")
}

fn option_for(entry: &OptionEntry) -> SelectOption {
    match entry {
        OptionEntry::Pair { value, label } => {
            SelectOption::labelled(scalar_text(value).unwrap_or_default(), label.clone())
        }
        OptionEntry::Bare(value) => SelectOption::new(scalar_text(value).unwrap_or_default()),
    }
}

/// Text assigned to a non-select control; falsy values clear it.
fn assigned_text(value: &EnvSettingValue) -> String {
    match value {
        EnvSettingValue::Options(entries) => entries
            .iter()
            .map(|e| option_for(e).value)
            .collect::<Vec<_>>()
            .join(","),
        EnvSettingValue::Scalar(v) => {
            let falsy = match v {
                serde_json::Value::Null => true,
                serde_json::Value::Bool(b) => !b,
                serde_json::Value::Number(n) => n.as_f64() == Some(0.0),
                serde_json::Value::String(s) => s.is_empty(),
                serde_json::Value::Array(_) | serde_json::Value::Object(_) => false,
            };
            if falsy {
                String::new()
            } else {
                scalar_text(v).unwrap_or_default()
            }
        }
    }
}

/// Applies a game's schema to the form. Returns the number of controls
/// updated; keys without a matching control are logged and skipped.
pub fn apply_schema(form: &mut Form, schema: &EnvironmentSchema) -> usize {
    form.filter_keys_mut()
        .rebuild(schema.filter_keys.iter().cloned());

    let mut updated = 0;
    for (key, value) in &schema.env_settings {
        if key == FILTER_KEYS {
            continue;
        }
        let id = env_field_id(key);
        let Some(field) = form.field_by_id_mut(&id) else {
            tracing::warn!(key, id, "no control for environment setting");
            continue;
        };

        if field.is_select() {
            match value {
                EnvSettingValue::Options(entries) => {
                    field.replace_options(entries.iter().map(option_for).collect());
                }
                EnvSettingValue::Scalar(other) => {
                    tracing::warn!(key, value = %other, "expected a list of options");
                    field.replace_options(Vec::new());
                }
            }
        } else {
            field.set_value(&assigned_text(value));
        }
        updated += 1;
    }
    updated
}

pub struct EnvironmentBinder<B> {
    session: Session,
    backend: Rc<B>,
}

impl<B> Clone for EnvironmentBinder<B> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            backend: Rc::clone(&self.backend),
        }
    }
}

impl<B: Backend> EnvironmentBinder<B> {
    pub fn new(session: Session, backend: Rc<B>) -> Self {
        Self { session, backend }
    }

    pub fn attach(&self) {
        self.session.borrow_mut().attach(Component::EnvironmentBinder);
    }

    pub fn detach(&self) {
        self.session.borrow_mut().detach(Component::EnvironmentBinder);
    }

    /// The selected game, falling back to the first listed one.
    pub fn current_game(&self) -> Option<String> {
        self.session.update(|s| {
            let field = s.form.field_by_id_mut(GAME_SELECT_ID)?;
            if field.value().is_empty() {
                let first = field.options().iter().find(|o| !o.disabled)?.value.clone();
                tracing::debug!(game = %first, "no game selected; defaulting to the first");
                field.set_value(&first);
            }
            Some(field.value().to_string()).filter(|g| !g.is_empty())
        })
    }

    /// Switches to `game_id` and regenerates its settings.
    pub async fn change_game(&self, game_id: &str) -> Result<(), DashError> {
        self.session.update(|s| {
            if let Some(select) = s.form.field_by_id_mut(GAME_SELECT_ID) {
                select.set_value(game_id);
            }
            if let Some(characters) = s.form.field_by_id_mut(CHARACTERS_ID) {
                characters.set_value("");
            }
        });

        match self.backend.update_game_environment(game_id).await {
            Ok(schema) => {
                let updated = self.session.update(|s| apply_schema(&mut s.form, &schema));
                tracing::debug!(
                    game = game_id,
                    updated,
                    filter_keys = schema.filter_keys.len(),
                    "environment settings updated"
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!(game = game_id, error = %e, "failed to fetch environment settings");
                Err(e.into())
            }
        }
    }
}
