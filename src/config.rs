//! Bot configuration, loaded from a JSON file.

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the config file.
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "failed to read config file '{}': {}", path.display(), source)
            }
            Self::ParseJson { path, source } => {
                write!(f, "failed to parse config file '{}': {}", path.display(), source)
            }
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseJson { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    /// Path to the info store JSON document.
    data_path: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    /// Shared secret for the admin_update tool. Absent = admin merges refused.
    admin_token: Option<String>,
    /// Gemini API key for free-form answers. Absent = feature disabled.
    gemini_api_key: Option<String>,
    /// Telegram bot token for outbound sends. Absent = Telegram replies disabled.
    telegram_bot_token: Option<String>,
    /// Directory for log files. Absent = stdout only.
    log_dir: Option<String>,
}

pub struct Config {
    pub data_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub admin_token: Option<String>,
    pub gemini_api_key: Option<String>,
    pub telegram_bot_token: Option<String>,
    pub log_dir: Option<PathBuf>,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config_path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::ReadFile { path: config_path.clone(), source: e })?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseJson { path: config_path.clone(), source: e })?;

        let telegram_bot_token = non_empty(file.telegram_bot_token);
        if let Some(ref token) = telegram_bot_token {
            // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
            let parts: Vec<&str> = token.split(':').collect();
            if parts.len() != 2 || parts[0].parse::<u64>().is_err() || parts[1].is_empty() {
                return Err(ConfigError::Validation(
                    "telegram_bot_token appears invalid (expected format: 123456789:ABCdefGHI...)"
                        .into(),
                ));
            }
        }

        Ok(Self {
            data_path: file
                .data_path
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/college_info.json")),
            host: file.host.unwrap_or_else(|| "0.0.0.0".to_string()),
            port: file.port.unwrap_or(5000),
            admin_token: non_empty(file.admin_token),
            gemini_api_key: non_empty(file.gemini_api_key),
            telegram_bot_token,
            log_dir: file.log_dir.map(PathBuf::from),
        })
    }
}

/// Empty strings in the config behave like absent keys.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}
