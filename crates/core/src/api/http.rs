//! reqwest implementation of [`Backend`].
//!
//! Builds on both native targets and `wasm32` (where reqwest wraps `fetch`),
//! so the browser front end and the CLI share one client.

use std::collections::{BTreeMap, VecDeque};
use std::pin::Pin;

use futures_util::{Stream, StreamExt};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::sse::SseDecoder;
use super::{
    endpoints, Backend, CharacterRoster, ConfigList, ConfigReply, CredentialsReply,
    CurrentConfigReply, EnvironmentSchema, GameEnvironmentRequest, LogSource, MessageReply,
    RenderStatus, SaveConfigRequest, ShaderStatus, SuccessReply, ToggleShaderAllRequest,
    ToggleShaderRequest, TokenReply, TooltipEntry, TrainingStatus,
};
use crate::config::{StoredConfig, TrainingConfig};
use crate::error::ApiError;
use crate::ui_model::Page;

#[derive(Debug, Clone)]
pub struct HttpBackend {
    http: Client,
    base: Url,
}

impl HttpBackend {
    /// `base_url` is the dashboard server origin, e.g. `http://127.0.0.1:5000`.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let base = Url::parse(base_url).map_err(|e| ApiError::Transport {
            path: base_url.to_string(),
            message: format!("invalid server url: {e}"),
        })?;
        Ok(Self {
            http: Client::new(),
            base,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base.join(path).map_err(|e| ApiError::Transport {
            path: path.to_string(),
            message: format!("invalid url: {e}"),
        })
    }

    /// `prefix/<segment>` with the segment percent-encoded.
    fn url_with_segment(&self, prefix: &str, segment: &str) -> Result<Url, ApiError> {
        let mut url = self.url(prefix)?;
        url.path_segments_mut()
            .map_err(|()| ApiError::Transport {
                path: prefix.to_string(),
                message: "server url cannot carry a path".to_string(),
            })?
            .push(segment);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder, path: &str) -> Result<Response, ApiError> {
        let response = request.send().await.map_err(|e| ApiError::Transport {
            path: path.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(path, status = status.as_u16(), "backend returned an error status");
        Err(ApiError::Status {
            path: path.to_string(),
            status: status.as_u16(),
            message: error_message(&body),
        })
    }

    async fn read_json<T: DeserializeOwned>(response: Response, path: &str) -> Result<T, ApiError> {
        let bytes = response.bytes().await.map_err(|e| ApiError::Transport {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Malformed {
            path: path.to_string(),
            message: e.to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let request = self.http.get(self.url(path)?);
        let response = self.send(request, path).await?;
        Self::read_json(response, path).await
    }

    async fn post_json<B, T>(&self, path: &str, body: Option<&B>) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self.http.post(self.url(path)?);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = self.send(request, path).await?;
        Self::read_json(response, path).await
    }
}

/// `message` or `error` of a JSON error body.
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["message", "error"]
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .map(str::to_string)
}

type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, reqwest::Error>>>>;

/// Open `/stream/logs` response.
pub struct HttpLogStream {
    body: ByteStream,
    decoder: SseDecoder,
    ready: VecDeque<String>,
}

impl LogSource for HttpLogStream {
    async fn next_line(&mut self) -> Option<Result<String, ApiError>> {
        loop {
            if let Some(line) = self.ready.pop_front() {
                return Some(Ok(line));
            }
            match self.body.next().await? {
                Ok(chunk) => self.ready.extend(self.decoder.feed(&chunk)),
                Err(e) => {
                    return Some(Err(ApiError::Transport {
                        path: endpoints::STREAM_LOGS.to_string(),
                        message: e.to_string(),
                    }))
                }
            }
        }
    }
}

impl Backend for HttpBackend {
    type Logs = HttpLogStream;

    async fn start_training(&self, config: &TrainingConfig) -> Result<MessageReply, ApiError> {
        self.post_json(endpoints::START_TRAINING, Some(config)).await
    }

    async fn stop_training(&self) -> Result<MessageReply, ApiError> {
        self.post_json::<(), _>(endpoints::STOP_TRAINING, None).await
    }

    async fn training_status(&self) -> Result<TrainingStatus, ApiError> {
        self.get_json(endpoints::TRAINING_STATUS).await
    }

    async fn render_status(&self) -> Result<RenderStatus, ApiError> {
        self.get_json(endpoints::RENDER_STATUS).await
    }

    async fn current_config(&self) -> Result<Option<StoredConfig>, ApiError> {
        let reply: CurrentConfigReply = self.get_json(endpoints::CURRENT_CONFIG).await?;
        Ok(reply.config)
    }

    async fn reset_to_default(&self) -> Result<MessageReply, ApiError> {
        self.post_json::<(), _>(endpoints::RESET_TO_DEFAULT, None).await
    }

    async fn shader_status(&self) -> Result<ShaderStatus, ApiError> {
        self.get_json(endpoints::SHADER_STATUS).await
    }

    async fn toggle_shader(&self, key: &str, enabled: bool) -> Result<SuccessReply, ApiError> {
        let body = ToggleShaderRequest {
            key: key.to_string(),
            enabled,
        };
        self.post_json(endpoints::TOGGLE_SHADER, Some(&body)).await
    }

    async fn toggle_shader_all(&self, enable_all: bool) -> Result<SuccessReply, ApiError> {
        let body = ToggleShaderAllRequest { enable_all };
        self.post_json(endpoints::TOGGLE_SHADER_ALL, Some(&body)).await
    }

    async fn list_configs(&self) -> Result<Vec<String>, ApiError> {
        let reply: ConfigList = self.get_json(endpoints::LIST_CONFIGS).await?;
        Ok(reply.configs)
    }

    async fn load_default_config(&self) -> Result<StoredConfig, ApiError> {
        let reply: ConfigReply = self.get_json(endpoints::LOAD_DEFAULT_CONFIG).await?;
        Ok(reply.config)
    }

    async fn load_config(&self, name: &str) -> Result<StoredConfig, ApiError> {
        let url = self.url_with_segment(endpoints::LOAD_CONFIG, name)?;
        let response = self.send(self.http.get(url), endpoints::LOAD_CONFIG).await?;
        let reply: ConfigReply = Self::read_json(response, endpoints::LOAD_CONFIG).await?;
        Ok(reply.config)
    }

    async fn save_config(&self, request: &SaveConfigRequest) -> Result<MessageReply, ApiError> {
        self.post_json(endpoints::SAVE_CONFIG, Some(request)).await
    }

    async fn delete_config(&self, name: &str) -> Result<MessageReply, ApiError> {
        let url = self.url_with_segment(endpoints::DELETE_CONFIG, name)?;
        let response = self
            .send(self.http.delete(url), endpoints::DELETE_CONFIG)
            .await?;
        Self::read_json(response, endpoints::DELETE_CONFIG).await
    }

    async fn update_game_environment(&self, game_id: &str) -> Result<EnvironmentSchema, ApiError> {
        let body = GameEnvironmentRequest {
            game_id: game_id.to_string(),
        };
        self.post_json(endpoints::UPDATE_GAME_ENVIRONMENT, Some(&body))
            .await
    }

    async fn characters(&self, game_id: &str) -> Result<CharacterRoster, ApiError> {
        let url = self.url_with_segment(endpoints::GET_CHARACTERS, game_id)?;
        let response = self.send(self.http.get(url), endpoints::GET_CHARACTERS).await?;
        Self::read_json(response, endpoints::GET_CHARACTERS).await
    }

    async fn check_credentials(&self) -> Result<bool, ApiError> {
        let reply: CredentialsReply = self.get_json(endpoints::CHECK_CREDENTIALS).await?;
        reply.exists.as_bool().ok_or_else(|| ApiError::Malformed {
            path: endpoints::CHECK_CREDENTIALS.to_string(),
            message: format!("`exists` is not a boolean: {}", reply.exists),
        })
    }

    async fn save_token(&self, token: &str) -> Result<TokenReply, ApiError> {
        let request = self
            .http
            .post(self.url(endpoints::SAVE_TOKEN)?)
            .form(&[("token", token)]);
        let response = self.send(request, endpoints::SAVE_TOKEN).await?;
        Self::read_json(response, endpoints::SAVE_TOKEN).await
    }

    async fn open_checkpoints(&self) -> Result<(), ApiError> {
        let request = self.http.get(self.url(endpoints::OPEN_CHECKPOINTS)?);
        self.send(request, endpoints::OPEN_CHECKPOINTS).await?;
        Ok(())
    }

    async fn open_logs(&self) -> Result<(), ApiError> {
        let request = self.http.get(self.url(endpoints::OPEN_LOGS)?);
        self.send(request, endpoints::OPEN_LOGS).await?;
        Ok(())
    }

    async fn fragment(&self, page: Page) -> Result<String, ApiError> {
        let path = page.path();
        let response = self.send(self.http.get(self.url(path)?), path).await?;
        response.text().await.map_err(|e| ApiError::Transport {
            path: path.to_string(),
            message: e.to_string(),
        })
    }

    async fn tooltips(&self) -> Result<BTreeMap<String, TooltipEntry>, ApiError> {
        self.get_json(endpoints::TOOLTIPS).await
    }

    async fn open_log_stream(&self) -> Result<HttpLogStream, ApiError> {
        let request = self
            .http
            .get(self.url(endpoints::STREAM_LOGS)?)
            .header("Accept", "text/event-stream");
        let response = self.send(request, endpoints::STREAM_LOGS).await?;
        let body = response.bytes_stream().map(|chunk| chunk.map(|b| b.to_vec()));
        Ok(HttpLogStream {
            body: Box::pin(body),
            decoder: SseDecoder::new(),
            ready: VecDeque::new(),
        })
    }
}
