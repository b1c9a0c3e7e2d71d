//! Named configurations: listing, loading, saving and deleting, plus the
//! selector that tracks unsaved edits to the loaded one.
//!
//! The selector is Clean while the form matches the selected entry. The first
//! tracked edit appends a pseudo-entry (`"<name> ~unsaved~"`, or `Unsaved` on
//! top of the default) and selects it; a successful save, a load or picking
//! another entry returns it to Clean.

use std::rc::Rc;

use crate::api::{Backend, SaveConfigRequest};
use crate::batch;
use crate::config::{StoredConfig, DEFAULT_CONFIG, UNSAVED_DEFAULT, UNSAVED_SUFFIX};
use crate::error::{ApiError, ConfigError, DashError};
use crate::form::{FieldName, Form, SelectOption};
use crate::session::{Component, NoticeLevel, Session};

pub const CONFIG_SELECT_ID: &str = "config-select";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSelector {
    names: Vec<String>,
    selected: String,
    unsaved: Option<String>,
}

impl Default for ConfigSelector {
    fn default() -> Self {
        Self {
            names: Vec::new(),
            selected: DEFAULT_CONFIG.to_string(),
            unsaved: None,
        }
    }
}

/// Where a save from the current selection goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveTarget {
    /// Overwrite the named config the edits were made to.
    Overwrite(String),
    /// A new config; the caller must supply a name.
    New,
}

impl ConfigSelector {
    pub fn selected(&self) -> &str {
        &self.selected
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_unsaved(&self) -> bool {
        self.unsaved.is_some()
    }

    /// Entries in display order: the default, saved names, then the unsaved
    /// pseudo-entry if any.
    pub fn options(&self) -> Vec<SelectOption> {
        let mut options = vec![SelectOption::labelled(DEFAULT_CONFIG, "Default")];
        options.extend(self.names.iter().map(SelectOption::new));
        if let Some(pseudo) = &self.unsaved {
            let label = if pseudo == UNSAVED_DEFAULT {
                "Unsaved".to_string()
            } else {
                pseudo.clone()
            };
            options.push(SelectOption::labelled(pseudo.clone(), label));
        }
        options
    }

    /// Replaces the saved names. The pseudo-entry is dropped, and a selection
    /// that no longer exists falls back to the default.
    pub fn set_names(&mut self, names: Vec<String>) {
        self.names = names
            .into_iter()
            .filter(|n| n != DEFAULT_CONFIG)
            .collect();
        self.unsaved = None;
        if !self.contains(&self.selected) {
            self.selected = DEFAULT_CONFIG.to_string();
        }
    }

    fn contains(&self, value: &str) -> bool {
        value == DEFAULT_CONFIG
            || self.names.iter().any(|n| n == value)
            || self.unsaved.as_deref() == Some(value)
    }

    /// Picks an entry. Leaving the pseudo-entry discards it.
    pub fn select(&mut self, value: &str) -> bool {
        if !self.contains(value) {
            return false;
        }
        if self.unsaved.as_deref() != Some(value) {
            self.unsaved = None;
        }
        self.selected = value.to_string();
        true
    }

    /// Moves to Unsaved on the first tracked edit. Returns whether the
    /// pseudo-entry was created.
    pub fn mark_unsaved(&mut self) -> bool {
        if self.unsaved.is_some() || self.selected.ends_with(UNSAVED_SUFFIX) {
            return false;
        }
        let pseudo = if self.selected == DEFAULT_CONFIG {
            UNSAVED_DEFAULT.to_string()
        } else {
            format!("{}{UNSAVED_SUFFIX}", self.selected)
        };
        self.unsaved = Some(pseudo.clone());
        self.selected = pseudo;
        true
    }

    /// The real config behind the selection: the pseudo-entry maps back to
    /// the entry it was created from.
    pub fn base_name(&self) -> &str {
        if self.selected == UNSAVED_DEFAULT && self.is_unsaved() {
            return DEFAULT_CONFIG;
        }
        self.selected
            .strip_suffix(UNSAVED_SUFFIX)
            .unwrap_or(&self.selected)
    }

    pub fn save_target(&self) -> Result<SaveTarget, ConfigError> {
        if self.selected == DEFAULT_CONFIG {
            return Err(ConfigError::OverwriteDefault);
        }
        Ok(match self.selected.strip_suffix(UNSAVED_SUFFIX) {
            Some(base) => SaveTarget::Overwrite(base.to_string()),
            None => SaveTarget::New,
        })
    }
}

/// Applies a stored config to the form, with the batch-size choices
/// recomputed for the restored rollout size before the stored batch size is
/// matched against them.
pub fn apply_config(form: &mut Form, stored: &StoredConfig) {
    form.apply_stored(stored);
    if batch::refresh(form).is_some() {
        form.apply_stored(stored);
    }
    let normalize = FieldName::hyper("normalize_advantage");
    if let Some(field) = form.field_mut(&normalize) {
        if field.value().is_empty() {
            field.set_value("True");
        }
    }
}

pub struct ConfigSync<B> {
    session: Session,
    backend: Rc<B>,
}

impl<B> Clone for ConfigSync<B> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            backend: Rc::clone(&self.backend),
        }
    }
}

impl<B: Backend> ConfigSync<B> {
    pub fn new(session: Session, backend: Rc<B>) -> Self {
        Self { session, backend }
    }

    /// Attaches and populates the selector.
    pub async fn attach(&self) {
        self.session.borrow_mut().attach(Component::ConfigSync);
        let _ = self.list().await;
    }

    pub fn detach(&self) {
        self.session.borrow_mut().detach(Component::ConfigSync);
    }

    pub async fn list(&self) -> Result<Vec<String>, DashError> {
        match self.backend.list_configs().await {
            Ok(names) => {
                tracing::debug!(count = names.len(), "fetched configurations");
                self.session
                    .update(|s| s.selector.set_names(names.clone()));
                Ok(names)
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to fetch configurations");
                Err(e.into())
            }
        }
    }

    /// Loads `name` (the default through its own endpoint) into the form and
    /// selects it.
    pub async fn load(&self, name: &str) -> Result<StoredConfig, DashError> {
        let is_default = name == DEFAULT_CONFIG;
        let result = if is_default {
            self.backend.load_default_config().await
        } else {
            self.backend.load_config(name).await
        };

        match result {
            Ok(stored) => {
                self.session.update(|s| {
                    apply_config(&mut s.form, &stored);
                    s.selector.select(name);
                    let text = if is_default {
                        "Default configuration loaded successfully.".to_string()
                    } else {
                        format!("Configuration '{name}' loaded successfully.")
                    };
                    s.notify(NoticeLevel::Success, text);
                });
                Ok(stored)
            }
            Err(e) => {
                tracing::debug!(name, error = %e, "failed to load configuration");
                let text = if is_default {
                    "Failed to load default configuration."
                } else {
                    "Failed to load configuration."
                };
                self.session.notify_failure(&e, || text.to_string());
                Err(e.into())
            }
        }
    }

    pub async fn load_selected(&self) -> Result<StoredConfig, DashError> {
        let name = self.session.with(|s| s.selector.base_name().to_string());
        self.load(&name).await
    }

    /// Saves the current form as `name`. The default is never written.
    pub async fn save(&self, name: &str, overwrite: bool) -> Result<(), DashError> {
        let name = name.trim();
        if name == DEFAULT_CONFIG {
            return Err(self.reject(ConfigError::OverwriteDefault));
        }
        if name.is_empty() {
            tracing::debug!("save cancelled: no configuration name");
            return Err(ConfigError::EmptyName.into());
        }

        let request = SaveConfigRequest {
            name: name.to_string(),
            overwrite,
            config: self.session.with(|s| s.form.collect()),
        };
        match self.backend.save_config(&request).await {
            Ok(reply) => {
                self.session.notify(
                    NoticeLevel::Success,
                    reply.message_or(&format!("Configuration '{name}' saved successfully.")),
                );
                let _ = self.list().await;
                self.session.update(|s| {
                    if !s.selector.select(name) {
                        tracing::warn!(name, "saved configuration missing from the list");
                    }
                });
                Ok(())
            }
            Err(e) => {
                self.notify_failure(&e, "Failed to save configuration.");
                Err(e.into())
            }
        }
    }

    /// Saves from the current selection: over the edited config when the
    /// pseudo-entry is selected, otherwise under `prompted_name`.
    pub async fn save_current(&self, prompted_name: Option<&str>) -> Result<(), DashError> {
        let target = self.session.with(|s| s.selector.save_target());
        match target {
            Err(e) => Err(self.reject(e)),
            Ok(SaveTarget::Overwrite(name)) => self.save(&name, true).await,
            Ok(SaveTarget::New) => self.save(prompted_name.unwrap_or_default(), false).await,
        }
    }

    pub async fn delete(&self, name: &str) -> Result<(), DashError> {
        if name == DEFAULT_CONFIG {
            return Err(self.reject(ConfigError::DeleteDefault));
        }
        match self.backend.delete_config(name).await {
            Ok(reply) => {
                self.session.notify(
                    NoticeLevel::Success,
                    reply.message_or(&format!("Configuration '{name}' deleted successfully.")),
                );
                let _ = self.list().await;
                Ok(())
            }
            Err(e) => {
                self.notify_failure(&e, "Failed to delete configuration.");
                Err(e.into())
            }
        }
    }

    pub async fn delete_selected(&self) -> Result<(), DashError> {
        let name = self.session.with(|s| s.selector.base_name().to_string());
        self.delete(&name).await
    }

    /// Called after any tracked control changed.
    pub fn on_tracked_change(&self) {
        let created = self.session.update(|s| s.selector.mark_unsaved());
        if created {
            tracing::debug!(
                selected = %self.session.with(|s| s.selector.selected().to_string()),
                "configuration marked unsaved"
            );
        }
    }

    /// Restores the backend's active config into a freshly mounted form.
    pub async fn restore_current(&self) {
        match self.backend.current_config().await {
            Ok(Some(stored)) => {
                self.session.update(|s| apply_config(&mut s.form, &stored));
                tracing::debug!("active configuration restored");
            }
            Ok(None) => tracing::warn!("no active configuration found"),
            Err(e) => tracing::error!(error = %e, "failed to fetch the active configuration"),
        }
    }

    pub async fn reset_to_default(&self) {
        match self.backend.reset_to_default().await {
            Ok(reply) => tracing::info!(
                "{}",
                reply.message_or("Configuration reset to default.")
            ),
            Err(e) => tracing::error!(error = %e, "failed to reset configuration"),
        }
    }

    fn reject(&self, error: ConfigError) -> DashError {
        self.session
            .notify(NoticeLevel::Warning, error.to_string());
        error.into()
    }

    fn notify_failure(&self, error: &ApiError, fallback: &str) {
        self.session
            .notify_failure(error, || error.server_message().unwrap_or(fallback).to_string());
    }
}
