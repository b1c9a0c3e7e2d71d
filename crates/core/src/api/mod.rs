//! Endpoints of the training backend and their payloads.
//!
//! [`Backend`] is the seam every component talks through. The reqwest client
//! in [`http`] implements it for real servers; tests use an in-memory fake.

#[cfg(feature = "http")]
pub mod http;
pub mod sse;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{StoredConfig, TrainingConfig};
use crate::error::ApiError;
use crate::ui_model::Page;

pub mod endpoints {
    pub const START_TRAINING: &str = "/training/start_training";
    pub const STOP_TRAINING: &str = "/training/stop_training";
    pub const TRAINING_STATUS: &str = "/training/training_status";
    pub const RENDER_STATUS: &str = "/training/render_status";
    pub const CURRENT_CONFIG: &str = "/training/current_config";
    pub const RESET_TO_DEFAULT: &str = "/training/reset_to_default";
    pub const SHADER_STATUS: &str = "/training/shader_status";
    pub const TOGGLE_SHADER: &str = "/training/toggle_shader";
    pub const TOGGLE_SHADER_ALL: &str = "/training/toggle_shader_all";

    pub const LIST_CONFIGS: &str = "/config/list_configs";
    pub const LOAD_DEFAULT_CONFIG: &str = "/config/load_default_config";
    /// Followed by `/<name>`.
    pub const LOAD_CONFIG: &str = "/config/load_config";
    pub const SAVE_CONFIG: &str = "/config/save_config";
    /// Followed by `/<name>`.
    pub const DELETE_CONFIG: &str = "/config/delete_config";

    pub const UPDATE_GAME_ENVIRONMENT: &str = "/update_game_environment";
    /// Followed by `/<game id>`.
    pub const GET_CHARACTERS: &str = "/get_characters";

    pub const CHECK_CREDENTIALS: &str = "/settings/check-credentials";
    pub const SAVE_TOKEN: &str = "/settings/save-token";
    pub const OPEN_CHECKPOINTS: &str = "/settings/open-checkpoints";
    pub const OPEN_LOGS: &str = "/settings/open-logs";

    pub const STREAM_LOGS: &str = "/stream/logs";
    pub const TOOLTIPS: &str = "/static/json/tooltips.json";
}

/// `{message}` reply shared by most mutating endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReply {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl MessageReply {
    pub fn message_or(&self, fallback: &str) -> String {
        self.message
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(fallback)
            .to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingStatus {
    pub training: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderStatus {
    pub rendering: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigReply {
    pub config: StoredConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConfigReply {
    #[serde(default)]
    pub config: Option<StoredConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigList {
    pub configs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveConfigRequest {
    pub name: String,
    pub overwrite: bool,
    pub config: TrainingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderStatus {
    #[serde(rename = "shaderSettings")]
    pub shader_settings: BTreeMap<String, bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleShaderRequest {
    pub key: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleShaderAllRequest {
    #[serde(rename = "enableAll")]
    pub enable_all: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessReply {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEnvironmentRequest {
    pub game_id: String,
}

/// One option of an environment select: a bare value or a value/label pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionEntry {
    Pair { value: Value, label: String },
    Bare(Value),
}

/// Value of one per-game environment setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvSettingValue {
    Options(Vec<OptionEntry>),
    Scalar(Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSchema {
    pub env_settings: BTreeMap<String, EnvSettingValue>,
    pub filter_keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterRoster {
    #[serde(rename = "gameType")]
    pub game_type: String,
    pub characters: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialsReply {
    /// Must be a boolean; anything else is a malformed reply.
    #[serde(default)]
    pub exists: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenReply {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TooltipEntry {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub example: Option<String>,
    #[serde(default, rename = "proTip")]
    pub pro_tip: Option<String>,
}

/// Server-pushed log lines, one per event.
#[allow(async_fn_in_trait)]
pub trait LogSource {
    /// Next line, or `None` once the stream has ended.
    async fn next_line(&mut self) -> Option<Result<String, ApiError>>;
}

/// Every backend call the dashboard makes. One request, one reply, no
/// retries.
#[allow(async_fn_in_trait)]
pub trait Backend {
    type Logs: LogSource;

    async fn start_training(&self, config: &TrainingConfig) -> Result<MessageReply, ApiError>;
    async fn stop_training(&self) -> Result<MessageReply, ApiError>;
    async fn training_status(&self) -> Result<TrainingStatus, ApiError>;
    async fn render_status(&self) -> Result<RenderStatus, ApiError>;
    async fn current_config(&self) -> Result<Option<StoredConfig>, ApiError>;
    async fn reset_to_default(&self) -> Result<MessageReply, ApiError>;

    async fn shader_status(&self) -> Result<ShaderStatus, ApiError>;
    async fn toggle_shader(&self, key: &str, enabled: bool) -> Result<SuccessReply, ApiError>;
    async fn toggle_shader_all(&self, enable_all: bool) -> Result<SuccessReply, ApiError>;

    async fn list_configs(&self) -> Result<Vec<String>, ApiError>;
    async fn load_default_config(&self) -> Result<StoredConfig, ApiError>;
    async fn load_config(&self, name: &str) -> Result<StoredConfig, ApiError>;
    async fn save_config(&self, request: &SaveConfigRequest) -> Result<MessageReply, ApiError>;
    async fn delete_config(&self, name: &str) -> Result<MessageReply, ApiError>;

    async fn update_game_environment(&self, game_id: &str)
        -> Result<EnvironmentSchema, ApiError>;
    async fn characters(&self, game_id: &str) -> Result<CharacterRoster, ApiError>;

    async fn check_credentials(&self) -> Result<bool, ApiError>;
    async fn save_token(&self, token: &str) -> Result<TokenReply, ApiError>;
    async fn open_checkpoints(&self) -> Result<(), ApiError>;
    async fn open_logs(&self) -> Result<(), ApiError>;

    async fn fragment(&self, page: Page) -> Result<String, ApiError>;
    async fn tooltips(&self) -> Result<BTreeMap<String, TooltipEntry>, ApiError>;
    async fn open_log_stream(&self) -> Result<Self::Logs, ApiError>;
}
