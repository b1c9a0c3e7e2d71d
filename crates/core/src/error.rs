/// Failures talking to the training backend.
///
/// The three variants mirror how the dashboard reacts: transport failures fall
/// back to a safe default, status failures are surfaced with the server's
/// message, malformed payloads are logged and the operation is dropped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("request to {path} failed: {message}")]
    Transport { path: String, message: String },

    #[error("{path} returned HTTP {status}{}", message_suffix(.message))]
    Status {
        path: String,
        status: u16,
        message: Option<String>,
    },

    #[error("unexpected response from {path}: {message}")]
    Malformed { path: String, message: String },
}

impl ApiError {
    /// Message the server attached to a non-2xx reply, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport { .. })
    }
}

fn message_suffix(message: &Option<String>) -> String {
    message.as_deref().map(|m| format!(": {m}")).unwrap_or_default()
}

/// Errors parsing a `section[key]` / `section[key][]` field name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldNameError {
    #[error("field name {0:?} is not of the form section[key]")]
    Shape(String),

    #[error("unknown form section {0:?}")]
    UnknownSection(String),

    #[error("field name {0:?} has an empty key")]
    EmptyKey(String),
}

/// Client-side guards on named configurations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot overwrite the Default configuration.")]
    OverwriteDefault,

    #[error("Cannot delete the Default configuration.")]
    DeleteDefault,

    #[error("configuration name must not be empty")]
    EmptyName,
}

/// Any failure a dashboard operation can report back to its caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DashError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Rejected(String),
}
