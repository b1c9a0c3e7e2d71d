//! Dashboard controller: page navigation, component lifecycle and input
//! routing.
//!
//! The controller owns the [`Session`] and hands it to every component. A
//! navigation detaches the page components, mounts the new fragment, brings
//! the form up to date (batch sizes, environment schema, then the stored
//! config, each awaited in that order) and only then attaches the page's
//! components. The header status poller lives for the whole session.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::api::Backend;
use crate::batch::{self, n_steps_field, num_envs_field};
use crate::characters::CharacterPicker;
use crate::config_sync::ConfigSync;
use crate::environment::{EnvironmentBinder, GAME_SELECT_ID};
use crate::error::{ApiError, DashError};
use crate::form::{Field, Form};
use crate::logs::LogStreamer;
use crate::runtime::Runtime;
use crate::session::{Component, Content, FieldRef, Input, Session};
use crate::settings::{Folder, SettingsPanel};
use crate::shaders::ShaderToggles;
use crate::status::StatusPoller;
use crate::tooltips::TooltipLoader;
use crate::ui_model::Page;

pub const LOAD_FAILED: &str = "Error loading content. Please try again later.";
pub const CONNECTION_FAILED: &str = "Error loading content. Please check your connection.";

/// Where page fragments are mounted: the DOM in the browser, a stand-in
/// elsewhere.
pub trait FragmentHost {
    /// Replaces the content container with `html` and returns the form
    /// scanned from the mounted controls.
    fn mount(&mut self, page: Page, html: &str) -> Form;

    /// Replaces the content container with an error message.
    fn show_error(&mut self, text: &str);
}

/// Components detached on every navigation.
const PAGE_COMPONENTS: [Component; 7] = [
    Component::ConfigSync,
    Component::EnvironmentBinder,
    Component::CharacterPicker,
    Component::Tooltips,
    Component::LogStream,
    Component::Shaders,
    Component::Settings,
];

fn resolve<'a>(form: &'a mut Form, field: &FieldRef) -> Option<&'a mut Field> {
    match field {
        FieldRef::Name(name) => form.field_mut(name),
        FieldRef::Id(id) => form.field_by_id_mut(id),
    }
}

/// What a single field edit touched.
struct Edit {
    changed: bool,
    tracked: bool,
    rollout: bool,
}

pub struct Dashboard<B, R, H> {
    session: Session,
    host: RefCell<H>,
    navigation: Cell<u64>,
    status: StatusPoller<B, R>,
    configs: ConfigSync<B>,
    environment: EnvironmentBinder<B>,
    characters: CharacterPicker<B>,
    tooltips: TooltipLoader<B>,
    logs: LogStreamer<B, R>,
    shaders: ShaderToggles<B>,
    settings: SettingsPanel<B, R>,
    backend: Rc<B>,
}

impl<B, R, H> Dashboard<B, R, H>
where
    B: Backend + 'static,
    R: Runtime,
    H: FragmentHost,
{
    pub fn new(backend: Rc<B>, runtime: R, host: H) -> Self {
        let session = Session::new();
        let b = || Rc::clone(&backend);
        Self {
            status: StatusPoller::new(session.clone(), b(), runtime.clone()),
            configs: ConfigSync::new(session.clone(), b()),
            environment: EnvironmentBinder::new(session.clone(), b()),
            characters: CharacterPicker::new(session.clone(), b()),
            tooltips: TooltipLoader::new(session.clone(), b()),
            logs: LogStreamer::new(session.clone(), b(), runtime.clone()),
            shaders: ShaderToggles::new(session.clone(), b()),
            settings: SettingsPanel::new(session.clone(), b(), runtime),
            host: RefCell::new(host),
            navigation: Cell::new(0),
            session,
            backend,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn status(&self) -> &StatusPoller<B, R> {
        &self.status
    }

    pub fn configs(&self) -> &ConfigSync<B> {
        &self.configs
    }

    pub fn environment(&self) -> &EnvironmentBinder<B> {
        &self.environment
    }

    /// Starts the header poller, then opens Settings when the backend has no
    /// credentials and the training dashboard otherwise.
    pub async fn boot(&self) -> Result<(), DashError> {
        self.status.attach();
        let page = if self.settings.check_credentials().await {
            Page::TrainingDashboard
        } else {
            tracing::warn!("credentials not found; opening settings");
            Page::Settings
        };
        self.navigate(page).await
    }

    pub async fn navigate(&self, page: Page) -> Result<(), DashError> {
        self.load_page(page, false).await
    }

    /// Like [`navigate`](Self::navigate), but resets the backend's active
    /// config to the default instead of restoring it.
    pub async fn navigate_fresh(&self, page: Page) -> Result<(), DashError> {
        self.load_page(page, true).await
    }

    async fn load_page(&self, page: Page, reset: bool) -> Result<(), DashError> {
        let generation = self.navigation.get() + 1;
        self.navigation.set(generation);
        self.detach_page();

        let html = match self.backend.fragment(page).await {
            Ok(html) => html,
            Err(e) => {
                tracing::error!(page = page.label(), error = %e, "failed to load content");
                if self.is_current(generation) {
                    self.show_failure(&e);
                }
                return Err(e.into());
            }
        };
        if !self.is_current(generation) {
            return Ok(());
        }

        let form = self.host.borrow_mut().mount(page, &html);
        self.session.update(|s| {
            s.form = form;
            s.content = Content::Page(page);
        });

        if page.has_form() {
            self.session.update(|s| batch::refresh(&mut s.form));
            if let Some(game) = self.environment.current_game() {
                let _ = self.environment.change_game(&game).await;
                if !self.is_current(generation) {
                    return Ok(());
                }
            }
        }

        if reset {
            self.configs.reset_to_default().await;
        } else if page.has_form() {
            self.configs.restore_current().await;
        }
        if !self.is_current(generation) {
            return Ok(());
        }

        self.attach_page(page).await;
        tracing::info!(page = page.label(), "content loaded");
        Ok(())
    }

    fn is_current(&self, generation: u64) -> bool {
        let current = self.navigation.get() == generation;
        if !current {
            tracing::debug!(generation, "navigation superseded");
        }
        current
    }

    fn show_failure(&self, error: &ApiError) {
        let text = match error {
            ApiError::Status { .. } => LOAD_FAILED,
            ApiError::Transport { .. } | ApiError::Malformed { .. } => CONNECTION_FAILED,
        };
        self.host.borrow_mut().show_error(text);
        self.session.update(|s| {
            s.form = Form::new();
            s.content = Content::Error(text.to_string());
        });
    }

    fn detach_page(&self) {
        self.configs.detach();
        self.environment.detach();
        self.characters.detach();
        self.tooltips.detach();
        self.logs.detach();
        self.shaders.detach();
        self.settings.detach();
        debug_assert!(self
            .session
            .with(|s| PAGE_COMPONENTS.iter().all(|c| !s.is_attached(*c))));
    }

    async fn attach_page(&self, page: Page) {
        match page {
            Page::TrainingDashboard => {
                self.status.attach();
                self.configs.attach().await;
                self.environment.attach();
                self.characters.attach();
                let _ = self.tooltips.attach().await;
                self.logs.attach();
                let _ = self.shaders.attach().await;
            }
            Page::Settings => self.settings.attach().await,
            Page::TensorBoard => {}
        }
    }

    /// Detaches everything and cancels every background task.
    pub fn shutdown(&self) {
        self.session.update(|s| s.shutdown());
    }

    fn attached(&self, component: Component) -> bool {
        let attached = self.session.with(|s| s.is_attached(component));
        if !attached {
            tracing::debug!(?component, "input ignored; component not attached");
        }
        attached
    }

    /// Applies one form edit and reports what it touched.
    fn edit(&self, field: &FieldRef, apply: impl FnOnce(&mut Field) -> bool) -> Option<Edit> {
        self.session.update(|s| {
            let Some(target) = resolve(&mut s.form, field) else {
                tracing::warn!(?field, "no such control");
                return None;
            };
            let changed = apply(target);
            let rollout = target
                .name
                .as_ref()
                .is_some_and(|n| *n == n_steps_field() || *n == num_envs_field());
            Some(Edit {
                changed,
                tracked: target.tracked,
                rollout,
            })
        })
    }

    fn after_edit(&self, edit: Edit) {
        if edit.rollout {
            self.session.update(|s| batch::refresh(&mut s.form));
        }
        if edit.changed && edit.tracked {
            self.tracked_change();
        }
    }

    fn tracked_change(&self) {
        if self.session.with(|s| s.is_attached(Component::ConfigSync)) {
            self.configs.on_tracked_change();
        }
    }

    async fn game_changed(&self, game: &str) -> Result<(), DashError> {
        if self.attached(Component::EnvironmentBinder) {
            self.environment.change_game(game).await?;
            self.tracked_change();
        }
        Ok(())
    }

    /// Routes one user interaction to its component.
    pub async fn dispatch(&self, input: Input) -> Result<(), DashError> {
        match input {
            Input::SetField { field, value } => {
                if field == FieldRef::Id(GAME_SELECT_ID.to_string()) {
                    return self.game_changed(&value).await;
                }
                if let Some(edit) = self.edit(&field, |f| f.set_value(&value)) {
                    self.after_edit(edit);
                }
            }
            Input::SetChecked { field, checked } => {
                if let Some(edit) = self.edit(&field, |f| f.set_checked(checked)) {
                    self.after_edit(edit);
                }
            }
            Input::SetToggle {
                group,
                value,
                checked,
            } => {
                if self
                    .session
                    .update(|s| s.form.set_toggle(group, &value, checked))
                {
                    self.tracked_change();
                }
            }
            Input::FilterKey { key, checked } => {
                if self
                    .session
                    .update(|s| s.form.filter_keys_mut().set(&key, checked))
                {
                    self.tracked_change();
                }
            }
            Input::FilterKeysAll(checked) => {
                self.session
                    .update(|s| s.form.filter_keys_mut().toggle_all(checked));
                self.tracked_change();
            }
            Input::GameChanged(game) => self.game_changed(&game).await?,
            Input::SelectConfig(name) => {
                if self.attached(Component::ConfigSync)
                    && !self.session.update(|s| s.selector.select(&name))
                {
                    tracing::warn!(name, "unknown configuration selected");
                }
            }
            Input::LoadConfig => {
                if self.attached(Component::ConfigSync) {
                    self.configs.load_selected().await?;
                }
            }
            Input::SaveConfig { prompted_name } => {
                if self.attached(Component::ConfigSync) {
                    self.configs.save_current(prompted_name.as_deref()).await?;
                }
            }
            Input::DeleteConfig => {
                if self.attached(Component::ConfigSync) {
                    self.configs.delete_selected().await?;
                }
            }
            Input::StartTraining => {
                if self.attached(Component::StatusPoller) {
                    self.status.start_training().await?;
                }
            }
            Input::StopTraining => {
                if self.attached(Component::StatusPoller) {
                    self.status.stop_training().await?;
                }
            }
            Input::OpenCharacterModal => {
                if self.attached(Component::CharacterPicker) {
                    self.characters.open().await?;
                }
            }
            Input::ToggleCharacter(name) => {
                if self.attached(Component::CharacterPicker) {
                    self.characters.toggle(&name);
                }
            }
            Input::ConfirmCharacters => {
                if self.attached(Component::CharacterPicker) {
                    self.characters.confirm()?;
                }
            }
            Input::CloseCharacterModal => {
                if self.attached(Component::CharacterPicker) {
                    self.characters.close();
                }
            }
            Input::OpenTooltip(key) => {
                if self.attached(Component::Tooltips) {
                    self.tooltips.open(&key);
                }
            }
            Input::CloseTooltip => {
                if self.attached(Component::Tooltips) {
                    self.tooltips.close();
                }
            }
            Input::LogScrolled { at_bottom } => {
                if self.attached(Component::LogStream) {
                    self.session.update(|s| s.logs.scrolled(at_bottom));
                }
            }
            Input::ToggleShader { key, enabled } => {
                if self.attached(Component::Shaders) {
                    self.shaders.toggle(&key, enabled).await?;
                }
            }
            Input::ToggleAllShaders(enabled) => {
                if self.attached(Component::Shaders) {
                    self.shaders.toggle_all(enabled).await?;
                }
            }
            Input::SaveToken(token) => {
                if self.attached(Component::Settings) {
                    self.settings.save_token(&token).await?;
                }
            }
            Input::OpenCheckpoints => {
                if self.attached(Component::Settings) {
                    self.settings.open_folder(Folder::Checkpoints).await;
                }
            }
            Input::OpenLogs => {
                if self.attached(Component::Settings) {
                    self.settings.open_folder(Folder::Logs).await;
                }
            }
            Input::Navigate(page) => self.navigate(page).await?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::endpoints;
    use crate::batch::BATCH_SIZE_ID;
    use crate::environment::CHARACTERS_ID;
    use crate::form::{FieldName, SelectOption};
    use crate::runtime::TokioRuntime;
    use crate::session::{NoticeLevel, TaskSlot};
    use crate::testing::{local, settle, Call, FakeBackend};
    use serde_json::json;
    use std::collections::BTreeMap;

    #[derive(Default)]
    struct StubHost {
        forms: BTreeMap<Page, Form>,
        mounted: Vec<Page>,
        errors: Vec<String>,
    }

    impl FragmentHost for StubHost {
        fn mount(&mut self, page: Page, _html: &str) -> Form {
            self.mounted.push(page);
            self.forms.get(&page).cloned().unwrap_or_default()
        }

        fn show_error(&mut self, text: &str) {
            self.errors.push(text.to_string());
        }
    }

    fn dashboard_form() -> Form {
        Form::new()
            .with_field(Field::number(FieldName::hyper("n_steps"), "128"))
            .with_field(Field::number(FieldName::training("num_envs"), "4"))
            .with_field(
                Field::select(FieldName::hyper("batch_size"), Vec::new()).with_id(BATCH_SIZE_ID),
            )
            .with_field(
                Field::select(
                    FieldName::env("game_id"),
                    vec![SelectOption::new("sfiii3n"), SelectOption::new("kof98umh")],
                )
                .with_id(GAME_SELECT_ID),
            )
            .with_field(Field::text(FieldName::env("characters"), "").with_id(CHARACTERS_ID))
    }

    fn setup() -> (Rc<FakeBackend>, Dashboard<FakeBackend, TokioRuntime, StubHost>) {
        let backend = Rc::new(FakeBackend::new());
        backend
            .reply(Page::TrainingDashboard.path(), json!("<form></form>"))
            .reply(Page::Settings.path(), json!("<section></section>"))
            .reply(endpoints::TRAINING_STATUS, json!({"training": false}))
            .reply(
                endpoints::UPDATE_GAME_ENVIRONMENT,
                json!({"env_settings": {}, "filter_keys": ["stage", "timer"]}),
            )
            .reply(
                endpoints::CURRENT_CONFIG,
                json!({"config": {
                    "hyperparameters": {"n_steps": 256, "batch_size": 128},
                    "wrapper_settings": {"filter_keys": ["timer"]}
                }}),
            )
            .reply(endpoints::TOOLTIPS, json!({}))
            .reply(endpoints::SHADER_STATUS, json!({"shaderSettings": {}}));
        let mut host = StubHost::default();
        host.forms.insert(Page::TrainingDashboard, dashboard_form());
        let dashboard = Dashboard::new(Rc::clone(&backend), TokioRuntime, host);
        (backend, dashboard)
    }

    fn position(calls: &[Call], wanted: &Call) -> usize {
        calls
            .iter()
            .position(|c| c == wanted)
            .unwrap_or_else(|| panic!("{wanted:?} not called"))
    }

    #[tokio::test]
    async fn test_boot_without_credentials_opens_settings() {
        local(async {
            let (backend, dashboard) = setup();
            backend.reply(endpoints::CHECK_CREDENTIALS, json!(false));

            dashboard.boot().await.unwrap();
            dashboard.session().with(|s| {
                assert_eq!(s.content, Content::Page(Page::Settings));
                assert!(s.is_attached(Component::Settings));
                assert!(s.is_attached(Component::StatusPoller));
                assert!(s.settings.warning_visible());
            });
            assert_eq!(backend.count(|c| *c == Call::Fragment(Page::Settings)), 1);
        })
        .await;
    }

    #[tokio::test]
    async fn test_schema_is_applied_before_the_stored_config() {
        local(async {
            let (backend, dashboard) = setup();
            dashboard.navigate(Page::TrainingDashboard).await.unwrap();
            settle().await;

            let calls = backend.calls();
            let fragment = position(&calls, &Call::Fragment(Page::TrainingDashboard));
            let schema = position(&calls, &Call::UpdateGameEnvironment("sfiii3n".into()));
            let restore = position(&calls, &Call::CurrentConfig);
            let list = position(&calls, &Call::ListConfigs);
            assert!(fragment < schema && schema < restore && restore < list);

            dashboard.session().with(|s| {
                assert_eq!(s.form.filter_keys().checked_keys(), vec!["timer"]);
                let batch = s.form.field_by_id(BATCH_SIZE_ID).unwrap();
                assert_eq!(batch.value(), "128");
                assert_eq!(batch.options().len(), 11);
                for component in PAGE_COMPONENTS {
                    let expected = component != Component::Settings;
                    assert_eq!(s.is_attached(component), expected, "{component:?}");
                }
            });
        })
        .await;
    }

    #[tokio::test]
    async fn test_fragment_failures_show_error_text() {
        local(async {
            let (backend, dashboard) = setup();
            backend.clear_replies(Page::TensorBoard.path());
            assert!(dashboard.navigate(Page::TensorBoard).await.is_err());
            assert_eq!(
                dashboard.session().with(|s| s.content.clone()),
                Content::Error(CONNECTION_FAILED.into())
            );

            backend.fail_status(Page::TensorBoard.path(), 404, None);
            assert!(dashboard.navigate(Page::TensorBoard).await.is_err());
            assert_eq!(
                dashboard.session().with(|s| s.content.clone()),
                Content::Error(LOAD_FAILED.into())
            );
            assert_eq!(dashboard.host.borrow().errors, vec![CONNECTION_FAILED, LOAD_FAILED]);
        })
        .await;
    }

    #[tokio::test]
    async fn test_repeated_navigation_keeps_one_log_stream() {
        local(async {
            let (backend, dashboard) = setup();
            dashboard.navigate(Page::TrainingDashboard).await.unwrap();
            dashboard.navigate(Page::TrainingDashboard).await.unwrap();
            dashboard.navigate(Page::Settings).await.unwrap();
            settle().await;

            dashboard.session().with(|s| {
                assert!(!s.is_armed(TaskSlot::LogStream));
                assert!(!s.is_attached(Component::ConfigSync));
                assert!(s.is_attached(Component::Settings));
            });
            assert_eq!(dashboard.host.borrow().mounted.len(), 3);
            assert_eq!(backend.count(|c| *c == Call::Tooltips), 1);
        })
        .await;
    }

    #[tokio::test]
    async fn test_rollout_edit_refreshes_batch_and_marks_unsaved() {
        local(async {
            let (_backend, dashboard) = setup();
            dashboard.navigate(Page::TrainingDashboard).await.unwrap();

            dashboard
                .dispatch(Input::SetField {
                    field: FieldName::training("num_envs").into(),
                    value: "1".into(),
                })
                .await
                .unwrap();
            dashboard.session().with(|s| {
                let batch = s.form.field_by_id(BATCH_SIZE_ID).unwrap();
                assert_eq!(batch.value(), "128");
                assert_eq!(batch.options().len(), 9);
                assert_eq!(s.selector.selected(), "unsaved");
            });
        })
        .await;
    }

    #[tokio::test]
    async fn test_inputs_skip_detached_components() {
        local(async {
            let (backend, dashboard) = setup();
            backend.reply(endpoints::CHECK_CREDENTIALS, json!(true));
            dashboard.navigate(Page::Settings).await.unwrap();
            backend.clear_calls();

            dashboard.dispatch(Input::OpenCharacterModal).await.unwrap();
            dashboard.dispatch(Input::DeleteConfig).await.unwrap();
            dashboard
                .dispatch(Input::ToggleShader {
                    key: "scanlines".into(),
                    enabled: true,
                })
                .await
                .unwrap();
            assert!(backend.calls().is_empty());

            dashboard.dispatch(Input::SaveToken(String::new())).await.unwrap_err();
            let notices = dashboard.session().take_notices();
            assert_eq!(notices.len(), 1);
            assert_eq!(notices[0].level, NoticeLevel::Warning);
        })
        .await;
    }
}
