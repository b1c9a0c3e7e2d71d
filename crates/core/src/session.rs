//! Per-tab dashboard state.
//!
//! One [`SessionState`] is owned by the dashboard controller and shared by
//! reference with every component. Components never keep state of their own
//! outside it, so a fragment swap is just detach, remount, attach.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::BTreeMap;
use std::rc::Rc;

use tokio_util::sync::CancellationToken;

use crate::characters::CharacterModal;
use crate::error::ApiError;
use crate::config_sync::ConfigSelector;
use crate::form::{FieldName, Form, ToggleGroup};
use crate::logs::LogView;
use crate::settings::SettingsView;
use crate::shaders::ShaderPanel;
use crate::status::StatusView;
use crate::tooltips::Tooltips;
use crate::ui_model::Page;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A user-facing message; the host decides how to show it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

/// Components with an attach/detach lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Component {
    StatusPoller,
    ConfigSync,
    EnvironmentBinder,
    CharacterPicker,
    Tooltips,
    LogStream,
    Shaders,
    Settings,
}

/// Background tasks, each independently cancellable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TaskSlot {
    TrainingPoll,
    RenderPoll,
    LogStream,
}

/// Cancellation handle of one armed slot. The id tells a finished task
/// whether it is still the current occupant when it releases the slot.
#[derive(Debug, Clone)]
pub struct Armed {
    pub id: u64,
    pub token: CancellationToken,
}

#[derive(Debug)]
struct Registry<K> {
    next_id: u64,
    slots: BTreeMap<K, Armed>,
}

impl<K> Default for Registry<K> {
    fn default() -> Self {
        Self {
            next_id: 0,
            slots: BTreeMap::new(),
        }
    }
}

impl<K: Ord + Copy> Registry<K> {
    /// Cancels the current occupant, if any, and arms a fresh token.
    fn arm(&mut self, key: K) -> Armed {
        self.next_id += 1;
        let armed = Armed {
            id: self.next_id,
            token: CancellationToken::new(),
        };
        if let Some(previous) = self.slots.insert(key, armed.clone()) {
            previous.token.cancel();
        }
        armed
    }

    fn disarm(&mut self, key: K) -> bool {
        match self.slots.remove(&key) {
            Some(armed) => {
                armed.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Removes `key` only if `id` still occupies it.
    fn release(&mut self, key: K, id: u64) {
        if self.slots.get(&key).is_some_and(|a| a.id == id) {
            self.slots.remove(&key);
        }
    }

    fn is_armed(&self, key: K) -> bool {
        self.slots
            .get(&key)
            .is_some_and(|a| !a.token.is_cancelled())
    }

    fn clear(&mut self) {
        for (_, armed) in std::mem::take(&mut self.slots) {
            armed.token.cancel();
        }
    }
}

/// What the content container currently shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Content {
    #[default]
    Empty,
    Page(Page),
    Error(String),
}

/// Reference to a form control: by typed binding or by element id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldRef {
    Name(FieldName),
    Id(String),
}

impl From<FieldName> for FieldRef {
    fn from(name: FieldName) -> Self {
        FieldRef::Name(name)
    }
}

impl From<&str> for FieldRef {
    fn from(id: &str) -> Self {
        FieldRef::Id(id.to_string())
    }
}

/// User interactions a host forwards to the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    SetField { field: FieldRef, value: String },
    SetChecked { field: FieldRef, checked: bool },
    SetToggle { group: ToggleGroup, value: String, checked: bool },
    FilterKey { key: String, checked: bool },
    FilterKeysAll(bool),
    GameChanged(String),
    SelectConfig(String),
    LoadConfig,
    SaveConfig { prompted_name: Option<String> },
    DeleteConfig,
    StartTraining,
    StopTraining,
    OpenCharacterModal,
    ToggleCharacter(String),
    ConfirmCharacters,
    CloseCharacterModal,
    OpenTooltip(String),
    CloseTooltip,
    LogScrolled { at_bottom: bool },
    ToggleShader { key: String, enabled: bool },
    ToggleAllShaders(bool),
    SaveToken(String),
    OpenCheckpoints,
    OpenLogs,
    Navigate(Page),
}

#[derive(Debug, Default)]
pub struct SessionState {
    pub form: Form,
    pub status: StatusView,
    pub selector: ConfigSelector,
    pub characters: CharacterModal,
    pub tooltips: Tooltips,
    pub logs: LogView,
    pub shaders: ShaderPanel,
    pub settings: SettingsView,
    pub content: Content,
    notices: Vec<Notice>,
    components: Registry<Component>,
    tasks: Registry<TaskSlot>,
}

impl SessionState {
    pub fn notify(&mut self, level: NoticeLevel, text: impl Into<String>) {
        let text = text.into();
        match level {
            NoticeLevel::Error => tracing::error!(notice = %text),
            NoticeLevel::Warning => tracing::warn!(notice = %text),
            NoticeLevel::Info | NoticeLevel::Success => tracing::info!(notice = %text),
        }
        self.notices.push(Notice { level, text });
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Attaches a component, detaching any previous attachment first. The
    /// returned token is cancelled on detach.
    pub fn attach(&mut self, component: Component) -> CancellationToken {
        if self.components.is_armed(component) {
            tracing::debug!(?component, "re-attaching; previous attachment detached");
        }
        self.components.arm(component).token
    }

    pub fn detach(&mut self, component: Component) -> bool {
        self.components.disarm(component)
    }

    pub fn is_attached(&self, component: Component) -> bool {
        self.components.is_armed(component)
    }

    pub fn arm(&mut self, slot: TaskSlot) -> Armed {
        self.tasks.arm(slot)
    }

    pub fn disarm(&mut self, slot: TaskSlot) -> bool {
        self.tasks.disarm(slot)
    }

    pub fn release(&mut self, slot: TaskSlot, id: u64) {
        self.tasks.release(slot, id);
    }

    pub fn is_armed(&self, slot: TaskSlot) -> bool {
        self.tasks.is_armed(slot)
    }

    /// Detaches every component and cancels every task.
    pub fn shutdown(&mut self) {
        self.components.clear();
        self.tasks.clear();
    }
}

/// Shared handle to the session. Borrows must never be held across an
/// `.await`.
#[derive(Debug, Clone, Default)]
pub struct Session(Rc<RefCell<SessionState>>);

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn borrow(&self) -> Ref<'_, SessionState> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, SessionState> {
        self.0.borrow_mut()
    }

    pub fn with<T>(&self, f: impl FnOnce(&SessionState) -> T) -> T {
        f(&self.0.borrow())
    }

    pub fn update<T>(&self, f: impl FnOnce(&mut SessionState) -> T) -> T {
        f(&mut self.0.borrow_mut())
    }

    pub fn notify(&self, level: NoticeLevel, text: impl Into<String>) {
        self.0.borrow_mut().notify(level, text);
    }

    pub fn take_notices(&self) -> Vec<Notice> {
        self.0.borrow_mut().take_notices()
    }

    /// Alerts `text` for a failed request. Malformed replies are logged and
    /// never shown.
    pub fn notify_failure(&self, error: &ApiError, text: impl FnOnce() -> String) {
        if let ApiError::Malformed { path, message } = error {
            tracing::warn!(path, message, "malformed reply; operation aborted");
            return;
        }
        self.notify(NoticeLevel::Error, text());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attach_detaches_previous_attachment() {
        let mut state = SessionState::default();
        let first = state.attach(Component::ConfigSync);
        let second = state.attach(Component::ConfigSync);
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        assert!(state.is_attached(Component::ConfigSync));

        assert!(state.detach(Component::ConfigSync));
        assert!(second.is_cancelled());
        assert!(!state.is_attached(Component::ConfigSync));
        assert!(!state.detach(Component::ConfigSync));
    }

    #[test]
    fn stale_release_keeps_the_new_occupant() {
        let mut state = SessionState::default();
        let old = state.arm(TaskSlot::RenderPoll);
        let new = state.arm(TaskSlot::RenderPoll);
        state.release(TaskSlot::RenderPoll, old.id);
        assert!(state.is_armed(TaskSlot::RenderPoll));
        state.release(TaskSlot::RenderPoll, new.id);
        assert!(!state.is_armed(TaskSlot::RenderPoll));
    }

    #[test]
    fn shutdown_cancels_everything() {
        let mut state = SessionState::default();
        let poll = state.arm(TaskSlot::TrainingPoll);
        let sync = state.attach(Component::ConfigSync);
        state.shutdown();
        assert!(poll.token.is_cancelled());
        assert!(sync.is_cancelled());
    }

    #[test]
    fn notices_queue_in_order() {
        let session = Session::new();
        session.notify(NoticeLevel::Warning, "first");
        session.notify(NoticeLevel::Success, "second");
        let texts: Vec<_> = session.take_notices().into_iter().map(|n| n.text).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert!(session.borrow().notices().is_empty());
    }
}
