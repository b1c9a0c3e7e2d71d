//! Cross-platform paths and settings of the command-line client.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const DEFAULT_SERVER: &str = "http://127.0.0.1:5000";

#[derive(Debug, Clone)]
pub struct AppPaths {
    config_dir: PathBuf,
}

impl AppPaths {
    pub fn new() -> Result<Self, String> {
        let base = dirs::config_dir().ok_or("Could not determine config directory")?;
        Ok(Self {
            config_dir: base.join("gymdash"),
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("cli.json")
    }
}

/// Contents of `cli.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliSettings {
    #[serde(default)]
    pub server: Option<String>,
}

impl CliSettings {
    /// Reads the settings file. A missing file means defaults; an unreadable
    /// one is logged and ignored.
    pub fn load(path: &Path) -> Self {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot read settings");
                return Self::default();
            }
        };
        serde_json::from_str(&text).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "ignoring malformed settings");
            Self::default()
        })
    }

    /// Server from the command line, else from the file, else the default.
    pub fn server(&self, flag: Option<&str>) -> String {
        flag.or(self.server.as_deref())
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_SERVER)
            .to_string()
    }
}
