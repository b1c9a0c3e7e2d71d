//! Settings page: credentials banner, token form and the open-folder
//! buttons.

use std::collections::BTreeSet;
use std::rc::Rc;
use std::time::Duration;

use crate::api::Backend;
use crate::error::{ApiError, DashError};
use crate::runtime::Runtime;
use crate::session::{Component, NoticeLevel, Session};

/// Open-folder buttons stay disabled this long after each request.
pub const FOLDER_LOCK: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Folder {
    Checkpoints,
    Logs,
}

impl Folder {
    pub fn label(self) -> &'static str {
        match self {
            Folder::Checkpoints => "checkpoints",
            Folder::Logs => "logs",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsView {
    /// Last valid credentials answer; `None` until one arrives.
    credentials: Option<bool>,
    locked: BTreeSet<Folder>,
}

impl SettingsView {
    pub fn set_credentials(&mut self, exist: bool) {
        self.credentials = Some(exist);
    }

    pub fn warning_visible(&self) -> bool {
        self.credentials == Some(false)
    }

    pub fn success_visible(&self) -> bool {
        self.credentials == Some(true)
    }

    pub fn is_locked(&self, folder: Folder) -> bool {
        self.locked.contains(&folder)
    }
}

fn token_failure_text(error: &ApiError) -> String {
    match error {
        ApiError::Status { message, .. } => message
            .clone()
            .unwrap_or_else(|| "An error occurred.".to_string()),
        ApiError::Transport { .. } | ApiError::Malformed { .. } => {
            "An error occurred while saving the token.".to_string()
        }
    }
}

pub struct SettingsPanel<B, R> {
    session: Session,
    backend: Rc<B>,
    runtime: R,
}

impl<B, R: Clone> Clone for SettingsPanel<B, R> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            backend: Rc::clone(&self.backend),
            runtime: self.runtime.clone(),
        }
    }
}

impl<B, R> SettingsPanel<B, R>
where
    B: Backend + 'static,
    R: Runtime,
{
    pub fn new(session: Session, backend: Rc<B>, runtime: R) -> Self {
        Self {
            session,
            backend,
            runtime,
        }
    }

    pub async fn attach(&self) {
        self.session.borrow_mut().attach(Component::Settings);
        self.check_credentials().await;
    }

    pub fn detach(&self) {
        self.session.borrow_mut().detach(Component::Settings);
    }

    /// Whether the backend has stored credentials. Any failure counts as
    /// missing and leaves the banners untouched.
    pub async fn check_credentials(&self) -> bool {
        match self.backend.check_credentials().await {
            Ok(exist) => {
                tracing::debug!(exist, "credentials checked");
                self.session.update(|s| s.settings.set_credentials(exist));
                exist
            }
            Err(e) => {
                tracing::error!(error = %e, "credentials check failed");
                false
            }
        }
    }

    pub async fn save_token(&self, token: &str) -> Result<(), DashError> {
        let token = token.trim();
        if token.is_empty() {
            let text = "Please enter a token.";
            self.session.notify(NoticeLevel::Warning, text);
            return Err(DashError::Rejected(text.to_string()));
        }

        match self.backend.save_token(token).await {
            Ok(reply) => {
                let text = reply
                    .message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "Token saved successfully.".to_string());
                self.session.update(|s| {
                    s.settings.set_credentials(true);
                    s.notify(NoticeLevel::Success, text);
                });
                Ok(())
            }
            Err(e) => {
                tracing::debug!(error = %e, "saving token failed");
                self.session.notify_failure(&e, || token_failure_text(&e));
                Err(e.into())
            }
        }
    }

    /// Asks the backend to open a folder on its host. Returns `false` without
    /// a request while the button is locked.
    pub async fn open_folder(&self, folder: Folder) -> bool {
        let locked = self.session.update(|s| !s.settings.locked.insert(folder));
        if locked {
            return false;
        }

        let result = match folder {
            Folder::Checkpoints => self.backend.open_checkpoints().await,
            Folder::Logs => self.backend.open_logs().await,
        };
        if let Err(e) = result {
            tracing::error!(folder = folder.label(), error = %e, "error opening folder");
        }

        let this = self.clone();
        self.runtime.spawn(async move {
            this.runtime.sleep(FOLDER_LOCK).await;
            this.session.update(|s| s.settings.locked.remove(&folder));
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::endpoints;
    use crate::runtime::TokioRuntime;
    use crate::testing::{advance, local, settle, Call, FakeBackend};
    use serde_json::json;

    fn setup() -> (Session, Rc<FakeBackend>, SettingsPanel<FakeBackend, TokioRuntime>) {
        let session = Session::new();
        let backend = Rc::new(FakeBackend::new());
        let panel = SettingsPanel::new(session.clone(), Rc::clone(&backend), TokioRuntime);
        (session, backend, panel)
    }

    #[tokio::test]
    async fn test_credentials_banner() {
        let (session, backend, panel) = setup();
        backend.reply(endpoints::CHECK_CREDENTIALS, json!(false));
        panel.attach().await;
        session.with(|s| {
            assert!(s.settings.warning_visible());
            assert!(!s.settings.success_visible());
        });
    }

    #[tokio::test]
    async fn test_failed_check_counts_as_missing() {
        let (session, _backend, panel) = setup();
        assert!(!panel.check_credentials().await);
        session.with(|s| {
            assert!(!s.settings.warning_visible());
            assert!(!s.settings.success_visible());
        });
    }

    #[tokio::test]
    async fn test_token_save_messages() {
        let (session, backend, panel) = setup();

        assert!(panel.save_token("   ").await.is_err());
        assert_eq!(session.take_notices()[0].text, "Please enter a token.");
        assert!(backend.calls().is_empty());

        backend.fail_status(endpoints::SAVE_TOKEN, 400, Some("Invalid token format."));
        assert!(panel.save_token("hf_abc").await.is_err());
        assert_eq!(session.take_notices()[0].text, "Invalid token format.");

        backend.clear_replies(endpoints::SAVE_TOKEN);
        backend.reply(endpoints::SAVE_TOKEN, json!({}));
        panel.save_token(" hf_abc ").await.unwrap();
        assert_eq!(session.take_notices()[0].text, "Token saved successfully.");
        assert!(session.with(|s| s.settings.success_visible()));
        assert_eq!(backend.calls().last(), Some(&Call::SaveToken("hf_abc".into())));

        backend.clear_replies(endpoints::SAVE_TOKEN);
        assert!(panel.save_token("hf_abc").await.is_err());
        assert_eq!(
            session.take_notices()[0].text,
            "An error occurred while saving the token."
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_folder_locks_for_half_a_second() {
        local(async {
            let (session, backend, panel) = setup();
            backend.reply(endpoints::OPEN_LOGS, json!({}));

            assert!(panel.open_folder(Folder::Logs).await);
            assert!(!panel.open_folder(Folder::Logs).await);
            assert!(session.with(|s| s.settings.is_locked(Folder::Logs)));
            settle().await;

            advance(FOLDER_LOCK).await;
            assert!(!session.with(|s| s.settings.is_locked(Folder::Logs)));
            assert!(panel.open_folder(Folder::Logs).await);
            assert_eq!(backend.count(|c| *c == Call::OpenLogs), 2);
        })
        .await;
    }
}
