//! CRT shader toggles of the live feed.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::api::{Backend, SuccessReply};
use crate::error::{ApiError, DashError};
use crate::session::{Component, Session};

pub const SHADER_KEYS: [&str; 5] = [
    "radial_distortion",
    "scanlines",
    "dot_mask",
    "rolling_lines",
    "gamma_correction",
];

/// Per-effect switches plus the "all" switch, which mirrors their
/// conjunction after every confirmed change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderPanel {
    effects: [bool; SHADER_KEYS.len()],
    all: bool,
}

fn index_of(key: &str) -> Option<usize> {
    SHADER_KEYS.iter().position(|k| *k == key)
}

impl ShaderPanel {
    /// Seeds the switches from the backend; unknown keys are ignored.
    pub fn seed(&mut self, settings: &BTreeMap<String, bool>) {
        for (key, enabled) in settings {
            match index_of(key) {
                Some(i) => self.effects[i] = *enabled,
                None => tracing::debug!(key, "ignoring unknown shader"),
            }
        }
        self.recompute_all();
    }

    pub fn get(&self, key: &str) -> Option<bool> {
        index_of(key).map(|i| self.effects[i])
    }

    pub fn set(&mut self, key: &str, enabled: bool) -> bool {
        match index_of(key) {
            Some(i) => {
                self.effects[i] = enabled;
                true
            }
            None => false,
        }
    }

    pub fn all(&self) -> bool {
        self.all
    }

    pub fn set_all_switch(&mut self, enabled: bool) {
        self.all = enabled;
    }

    pub fn recompute_all(&mut self) {
        self.all = self.effects.iter().all(|e| *e);
    }

    pub fn apply_all(&mut self, enabled: bool) {
        self.effects = [enabled; SHADER_KEYS.len()];
        self.all = enabled;
    }

    pub fn entries(&self) -> impl Iterator<Item = (&'static str, bool)> + '_ {
        SHADER_KEYS.iter().copied().zip(self.effects.iter().copied())
    }
}

fn confirmed(result: Result<SuccessReply, ApiError>, what: &str) -> Result<(), DashError> {
    match result {
        Ok(SuccessReply { success: true, .. }) => Ok(()),
        Ok(reply) => {
            let text = reply
                .error
                .unwrap_or_else(|| format!("Failed to toggle {what}."));
            tracing::error!(what, "{text}");
            Err(DashError::Rejected(text))
        }
        Err(e) => {
            tracing::error!(what, error = %e, "shader toggle failed");
            Err(e.into())
        }
    }
}

pub struct ShaderToggles<B> {
    session: Session,
    backend: Rc<B>,
}

impl<B> Clone for ShaderToggles<B> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            backend: Rc::clone(&self.backend),
        }
    }
}

impl<B: Backend> ShaderToggles<B> {
    pub fn new(session: Session, backend: Rc<B>) -> Self {
        Self { session, backend }
    }

    /// Attaches and seeds the switches from the backend.
    pub async fn attach(&self) -> Result<(), DashError> {
        self.session.borrow_mut().attach(Component::Shaders);
        match self.backend.shader_status().await {
            Ok(status) => {
                self.session
                    .update(|s| s.shaders.seed(&status.shader_settings));
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to fetch shader settings");
                Err(e.into())
            }
        }
    }

    pub fn detach(&self) {
        self.session.borrow_mut().detach(Component::Shaders);
    }

    /// Flips one effect right away and reverts it if the backend refuses.
    pub async fn toggle(&self, key: &str, enabled: bool) -> Result<(), DashError> {
        if !self.session.update(|s| s.shaders.set(key, enabled)) {
            tracing::warn!(key, "unknown shader");
            return Ok(());
        }
        let result = confirmed(
            self.backend.toggle_shader(key, enabled).await,
            &format!("shader \"{key}\""),
        );
        self.session.update(|s| match &result {
            Ok(()) => {
                tracing::info!(key, enabled, "shader toggled");
                s.shaders.recompute_all();
            }
            Err(_) => {
                s.shaders.set(key, !enabled);
            }
        });
        result
    }

    pub async fn toggle_all(&self, enabled: bool) -> Result<(), DashError> {
        self.session.update(|s| s.shaders.set_all_switch(enabled));
        let result = confirmed(self.backend.toggle_shader_all(enabled).await, "all shaders");
        self.session.update(|s| match &result {
            Ok(()) => {
                tracing::info!(enabled, "all shaders toggled");
                s.shaders.apply_all(enabled);
            }
            Err(_) => s.shaders.set_all_switch(!enabled),
        });
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::endpoints;
    use crate::testing::{Call, FakeBackend};
    use serde_json::json;

    fn setup() -> (Session, Rc<FakeBackend>, ShaderToggles<FakeBackend>) {
        let session = Session::new();
        let backend = Rc::new(FakeBackend::new());
        let toggles = ShaderToggles::new(session.clone(), Rc::clone(&backend));
        (session, backend, toggles)
    }

    #[tokio::test]
    async fn test_seed_derives_all_switch() {
        let (session, backend, toggles) = setup();
        backend.reply(
            endpoints::SHADER_STATUS,
            json!({"shaderSettings": {
                "radial_distortion": true, "scanlines": true, "dot_mask": true,
                "rolling_lines": true, "gamma_correction": false
            }}),
        );
        toggles.attach().await.unwrap();
        session.with(|s| {
            assert!(!s.shaders.all());
            assert_eq!(s.shaders.get("scanlines"), Some(true));
        });
    }

    #[tokio::test]
    async fn test_single_toggle_reverts_on_refusal() {
        let (session, backend, toggles) = setup();
        backend.reply(endpoints::TOGGLE_SHADER, json!({"success": false}));

        assert!(toggles.toggle("dot_mask", true).await.is_err());
        assert_eq!(session.with(|s| s.shaders.get("dot_mask")), Some(false));
        assert_eq!(backend.calls(), vec![Call::ToggleShader("dot_mask".into(), true)]);
    }

    #[tokio::test]
    async fn test_last_effect_on_turns_all_on() {
        let (session, backend, toggles) = setup();
        session.update(|s| {
            for key in &SHADER_KEYS[..4] {
                s.shaders.set(key, true);
            }
        });
        backend.reply(endpoints::TOGGLE_SHADER, json!({"success": true}));

        toggles.toggle("gamma_correction", true).await.unwrap();
        assert!(session.with(|s| s.shaders.all()));
    }

    #[tokio::test]
    async fn test_toggle_all_applies_or_reverts() {
        let (session, backend, toggles) = setup();
        backend
            .reply(endpoints::TOGGLE_SHADER_ALL, json!({"success": true}))
            .fail_transport(endpoints::TOGGLE_SHADER_ALL);

        toggles.toggle_all(true).await.unwrap();
        session.with(|s| {
            assert!(s.shaders.all());
            assert!(s.shaders.entries().all(|(_, on)| on));
        });

        assert!(toggles.toggle_all(false).await.is_err());
        session.with(|s| {
            assert!(s.shaders.all());
            assert!(s.shaders.entries().all(|(_, on)| on));
        });
    }
}
