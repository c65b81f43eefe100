//! Client configuration: defaults, then an optional TOML file, then CLI flags.
//!
//! ```toml
//! host = "chat.local"
//! port = 8080
//! color = true
//! user_label = "you"
//! bot_label = "remo"
//! ```

use serde::Deserialize;
use std::path::Path;

use crate::error::ChatError;

/// Fixed server path for the event socket.
pub const EVENTS_PATH: &str = "/ws/events";

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub color: bool,
    pub user_label: String,
    pub bot_label: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            color: true,
            user_label: "you".to_string(),
            bot_label: "bot".to_string(),
        }
    }
}

impl ClientConfig {
    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Load from a TOML file on disk.
    pub fn load(path: &Path) -> Result<Self, ChatError> {
        let text = std::fs::read_to_string(path).map_err(|e| ChatError::Config {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?;
        Self::from_toml_str(&text).map_err(|e| ChatError::Config {
            path: path.display().to_string(),
            detail: e.to_string(),
        })
    }

    /// WebSocket endpoint: host and port from config, fixed path.
    pub fn endpoint(&self) -> String {
        format!("ws://{}:{}{}", self.host, self.port, EVENTS_PATH)
    }
}
