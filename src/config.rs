//! Client configuration: API base URL, timeouts, and the session file path.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ClientError;

/// Environment variable that overrides the configured API base URL.
pub const API_URL_ENV: &str = "CODE_BATTLE_API_URL";

/// Configuration for the client runtime.
///
/// All fields have defaults so that a missing config file is not an error;
/// a present-but-malformed file is.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the Code Battle backend (e.g. `http://localhost:8080`).
    pub base_url: String,
    /// TCP connection timeout, seconds.
    pub connect_timeout_secs: u64,
    /// Per-request read timeout, seconds. Does not apply to the event stream.
    pub request_timeout_secs: u64,
    /// How long to wait for an execution result before the watchdog fires,
    /// seconds.
    pub watchdog_secs: u64,
    /// Where the player session record is persisted. Defaults to
    /// `$HOME/.code-battle/session.json`.
    pub session_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: "http://localhost:8080".to_string(),
            connect_timeout_secs: 3,
            request_timeout_secs: 10,
            watchdog_secs: 30,
            session_path: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file, falling back to defaults when the
    /// file does not exist. `CODE_BATTLE_API_URL` wins over the file value.
    pub fn load(path: &Path) -> Result<Self, ClientError> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(text) => toml::from_str::<ClientConfig>(&text)
                .map_err(|e| ClientError::Config(format!("{}: {}", path.display(), e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => ClientConfig::default(),
            Err(e) => {
                return Err(ClientError::Config(format!("{}: {}", path.display(), e)));
            }
        };

        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                config.base_url = url;
            }
        }

        Ok(config)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn watchdog_timeout(&self) -> Duration {
        Duration::from_secs(self.watchdog_secs)
    }

    /// Resolve the session file path: explicit config value, then
    /// `$HOME/.code-battle/session.json`, then a dotfile in the working
    /// directory for HOME-less environments.
    pub fn resolved_session_path(&self) -> PathBuf {
        if let Some(path) = &self.session_path {
            return path.clone();
        }
        match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(".code-battle").join("session.json"),
            None => PathBuf::from(".code-battle-session.json"),
        }
    }
}
