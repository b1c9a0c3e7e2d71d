//! In-memory backend for component tests.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::future::{self, Future};
use std::rc::Rc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::api::{
    endpoints, Backend, CharacterRoster, EnvironmentSchema, LogSource, MessageReply,
    RenderStatus, SaveConfigRequest, ShaderStatus, SuccessReply, TokenReply, TooltipEntry,
    TrainingStatus,
};
use crate::config::{StoredConfig, TrainingConfig};
use crate::error::ApiError;
use crate::ui_model::Page;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    StartTraining(TrainingConfig),
    StopTraining,
    TrainingStatus,
    RenderStatus,
    CurrentConfig,
    ResetToDefault,
    ShaderStatus,
    ToggleShader(String, bool),
    ToggleShaderAll(bool),
    ListConfigs,
    LoadDefaultConfig,
    LoadConfig(String),
    SaveConfig(SaveConfigRequest),
    DeleteConfig(String),
    UpdateGameEnvironment(String),
    Characters(String),
    CheckCredentials,
    SaveToken(String),
    OpenCheckpoints,
    OpenLogs,
    Fragment(Page),
    Tooltips,
    OpenLogStream,
}

/// Scripted replies keyed by endpoint path. The last reply queued for an
/// endpoint repeats; an endpoint with nothing queued fails as a transport
/// error. Config endpoints fall back to an in-memory store when unscripted.
#[derive(Debug, Default)]
pub struct FakeBackend {
    calls: RefCell<Vec<Call>>,
    replies: RefCell<BTreeMap<String, VecDeque<Result<Value, ApiError>>>>,
    store: RefCell<BTreeMap<String, StoredConfig>>,
    log_lines: RefCell<Vec<String>>,
    hold_streams: Cell<bool>,
    open_streams: Rc<Cell<usize>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, path: &str, value: Value) -> &Self {
        self.queue(path, Ok(value))
    }

    pub fn fail(&self, path: &str, error: ApiError) -> &Self {
        self.queue(path, Err(error))
    }

    pub fn fail_status(&self, path: &str, status: u16, message: Option<&str>) -> &Self {
        self.fail(
            path,
            ApiError::Status {
                path: path.to_string(),
                status,
                message: message.map(str::to_string),
            },
        )
    }

    pub fn fail_transport(&self, path: &str) -> &Self {
        self.fail(
            path,
            ApiError::Transport {
                path: path.to_string(),
                message: "connection refused".to_string(),
            },
        )
    }

    fn queue(&self, path: &str, reply: Result<Value, ApiError>) -> &Self {
        self.replies
            .borrow_mut()
            .entry(path.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    pub fn clear_replies(&self, path: &str) {
        self.replies.borrow_mut().remove(path);
    }

    pub fn store_config(&self, name: &str, config: StoredConfig) {
        self.store.borrow_mut().insert(name.to_string(), config);
    }

    pub fn stored(&self, name: &str) -> Option<StoredConfig> {
        self.store.borrow().get(name).cloned()
    }

    pub fn stream_lines(&self, lines: &[&str]) {
        self.log_lines
            .borrow_mut()
            .extend(lines.iter().map(|l| l.to_string()));
    }

    /// Streams stay open and silent once their lines run out, like a quiet
    /// server.
    pub fn hold_streams(&self) {
        self.hold_streams.set(true);
    }

    /// Log streams opened and not yet dropped.
    pub fn open_streams(&self) -> usize {
        self.open_streams.get()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls.borrow().iter().filter(|c| matches(c)).count()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    fn scripted<T: DeserializeOwned>(&self, path: &str) -> Option<Result<T, ApiError>> {
        let mut replies = self.replies.borrow_mut();
        let queue = replies.get_mut(path)?;
        let reply = if queue.len() > 1 {
            queue.pop_front()?
        } else {
            queue.front()?.clone()
        };
        Some(reply.and_then(|value| {
            serde_json::from_value(value).map_err(|e| ApiError::Malformed {
                path: path.to_string(),
                message: e.to_string(),
            })
        }))
    }

    fn answer<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.scripted(path).unwrap_or_else(|| {
            Err(ApiError::Transport {
                path: path.to_string(),
                message: "no scripted reply".to_string(),
            })
        })
    }
}

#[derive(Debug)]
pub struct FakeLogs {
    lines: VecDeque<String>,
    hold_open: bool,
    open: Rc<Cell<usize>>,
}

impl LogSource for FakeLogs {
    async fn next_line(&mut self) -> Option<Result<String, ApiError>> {
        match self.lines.pop_front() {
            Some(line) => Some(Ok(line)),
            None if self.hold_open => future::pending().await,
            None => None,
        }
    }
}

impl Drop for FakeLogs {
    fn drop(&mut self) {
        self.open.set(self.open.get() - 1);
    }
}

#[derive(serde::Deserialize)]
struct Wrapped<T> {
    config: T,
}

impl Backend for FakeBackend {
    type Logs = FakeLogs;

    async fn start_training(&self, config: &TrainingConfig) -> Result<MessageReply, ApiError> {
        self.record(Call::StartTraining(config.clone()));
        self.answer(endpoints::START_TRAINING)
    }

    async fn stop_training(&self) -> Result<MessageReply, ApiError> {
        self.record(Call::StopTraining);
        self.answer(endpoints::STOP_TRAINING)
    }

    async fn training_status(&self) -> Result<TrainingStatus, ApiError> {
        self.record(Call::TrainingStatus);
        self.answer(endpoints::TRAINING_STATUS)
    }

    async fn render_status(&self) -> Result<RenderStatus, ApiError> {
        self.record(Call::RenderStatus);
        self.answer(endpoints::RENDER_STATUS)
    }

    async fn current_config(&self) -> Result<Option<StoredConfig>, ApiError> {
        self.record(Call::CurrentConfig);
        let reply: Wrapped<Option<StoredConfig>> = self.answer(endpoints::CURRENT_CONFIG)?;
        Ok(reply.config)
    }

    async fn reset_to_default(&self) -> Result<MessageReply, ApiError> {
        self.record(Call::ResetToDefault);
        self.answer(endpoints::RESET_TO_DEFAULT)
    }

    async fn shader_status(&self) -> Result<ShaderStatus, ApiError> {
        self.record(Call::ShaderStatus);
        self.answer(endpoints::SHADER_STATUS)
    }

    async fn toggle_shader(&self, key: &str, enabled: bool) -> Result<SuccessReply, ApiError> {
        self.record(Call::ToggleShader(key.to_string(), enabled));
        self.answer(endpoints::TOGGLE_SHADER)
    }

    async fn toggle_shader_all(&self, enable_all: bool) -> Result<SuccessReply, ApiError> {
        self.record(Call::ToggleShaderAll(enable_all));
        self.answer(endpoints::TOGGLE_SHADER_ALL)
    }

    async fn list_configs(&self) -> Result<Vec<String>, ApiError> {
        self.record(Call::ListConfigs);
        #[derive(serde::Deserialize)]
        struct Configs {
            configs: Vec<String>,
        }
        match self.scripted::<Configs>(endpoints::LIST_CONFIGS) {
            Some(reply) => reply.map(|r| r.configs),
            None => Ok(self.store.borrow().keys().cloned().collect()),
        }
    }

    async fn load_default_config(&self) -> Result<StoredConfig, ApiError> {
        self.record(Call::LoadDefaultConfig);
        let reply: Wrapped<StoredConfig> = self.answer(endpoints::LOAD_DEFAULT_CONFIG)?;
        Ok(reply.config)
    }

    async fn load_config(&self, name: &str) -> Result<StoredConfig, ApiError> {
        self.record(Call::LoadConfig(name.to_string()));
        if let Some(reply) = self.scripted::<Wrapped<StoredConfig>>(endpoints::LOAD_CONFIG) {
            return reply.map(|r| r.config);
        }
        self.store
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| ApiError::Status {
                path: endpoints::LOAD_CONFIG.to_string(),
                status: 404,
                message: Some("Configuration not found.".to_string()),
            })
    }

    async fn save_config(&self, request: &SaveConfigRequest) -> Result<MessageReply, ApiError> {
        self.record(Call::SaveConfig(request.clone()));
        if let Some(reply) = self.scripted(endpoints::SAVE_CONFIG) {
            return reply;
        }
        let mut store = self.store.borrow_mut();
        if store.contains_key(&request.name) && !request.overwrite {
            return Err(ApiError::Status {
                path: endpoints::SAVE_CONFIG.to_string(),
                status: 400,
                message: Some("Configuration already exists.".to_string()),
            });
        }
        // Round-trip through JSON the way a real server would persist it.
        let persisted = serde_json::to_value(&request.config)
            .and_then(serde_json::from_value)
            .map_err(|e| ApiError::Malformed {
                path: endpoints::SAVE_CONFIG.to_string(),
                message: e.to_string(),
            })?;
        store.insert(request.name.clone(), persisted);
        Ok(MessageReply {
            message: Some(format!("Configuration '{}' saved successfully.", request.name)),
            status: None,
        })
    }

    async fn delete_config(&self, name: &str) -> Result<MessageReply, ApiError> {
        self.record(Call::DeleteConfig(name.to_string()));
        if let Some(reply) = self.scripted(endpoints::DELETE_CONFIG) {
            return reply;
        }
        match self.store.borrow_mut().remove(name) {
            Some(_) => Ok(MessageReply {
                message: Some(format!("Configuration '{name}' deleted successfully.")),
                status: None,
            }),
            None => Err(ApiError::Status {
                path: endpoints::DELETE_CONFIG.to_string(),
                status: 404,
                message: Some("Configuration not found.".to_string()),
            }),
        }
    }

    async fn update_game_environment(&self, game_id: &str) -> Result<EnvironmentSchema, ApiError> {
        self.record(Call::UpdateGameEnvironment(game_id.to_string()));
        let path = format!("{}/{game_id}", endpoints::UPDATE_GAME_ENVIRONMENT);
        self.scripted(&path)
            .unwrap_or_else(|| self.answer(endpoints::UPDATE_GAME_ENVIRONMENT))
    }

    async fn characters(&self, game_id: &str) -> Result<CharacterRoster, ApiError> {
        self.record(Call::Characters(game_id.to_string()));
        self.answer(endpoints::GET_CHARACTERS)
    }

    async fn check_credentials(&self) -> Result<bool, ApiError> {
        self.record(Call::CheckCredentials);
        self.answer(endpoints::CHECK_CREDENTIALS)
    }

    async fn save_token(&self, token: &str) -> Result<TokenReply, ApiError> {
        self.record(Call::SaveToken(token.to_string()));
        self.answer(endpoints::SAVE_TOKEN)
    }

    async fn open_checkpoints(&self) -> Result<(), ApiError> {
        self.record(Call::OpenCheckpoints);
        self.answer::<Value>(endpoints::OPEN_CHECKPOINTS).map(|_| ())
    }

    async fn open_logs(&self) -> Result<(), ApiError> {
        self.record(Call::OpenLogs);
        self.answer::<Value>(endpoints::OPEN_LOGS).map(|_| ())
    }

    async fn fragment(&self, page: Page) -> Result<String, ApiError> {
        self.record(Call::Fragment(page));
        self.answer(page.path())
    }

    async fn tooltips(&self) -> Result<BTreeMap<String, TooltipEntry>, ApiError> {
        self.record(Call::Tooltips);
        self.answer(endpoints::TOOLTIPS)
    }

    async fn open_log_stream(&self) -> Result<FakeLogs, ApiError> {
        self.record(Call::OpenLogStream);
        if let Some(Err(e)) = self.scripted::<Value>(endpoints::STREAM_LOGS) {
            return Err(e);
        }
        self.open_streams.set(self.open_streams.get() + 1);
        Ok(FakeLogs {
            lines: self.log_lines.borrow_mut().drain(..).collect(),
            hold_open: self.hold_streams.get(),
            open: Rc::clone(&self.open_streams),
        })
    }
}

/// Runs `f` inside a `LocalSet` so `spawn_local` tasks make progress.
pub async fn local<F: Future>(f: F) -> F::Output {
    tokio::task::LocalSet::new().run_until(f).await
}

/// Lets spawned tasks run up to their next timer without advancing time
/// past `by`.
pub async fn advance(by: Duration) {
    tokio::time::sleep(by).await;
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

/// Lets ready tasks run without advancing time.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
