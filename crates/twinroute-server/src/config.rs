//! Server configuration
//!
//! Loaded from YAML (default) or TOML, then overridden by `TWINROUTE_*`
//! environment variables and finally by CLI flags.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use twinroute_core::ApiFormat;
use twinroute_egress::client::HttpClientConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ListenConfig,

    #[serde(default)]
    pub chat_model: ModelConfig,

    #[serde(default)]
    pub work_model: ModelConfig,

    /// Send work-bound requests to the chat model first
    #[serde(default)]
    pub preprocess_enabled: bool,

    /// System instruction appended to pre-check requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preprocess_instruction: Option<String>,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Directories searched recursively for `SKILL.md` files
    #[serde(default)]
    pub skill_dirs: Vec<PathBuf>,

    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// One upstream route
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub base_url: String,

    #[serde(default)]
    pub api_key: String,

    /// Name callers use to select this route; defaults to `model_id`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,

    /// Model id sent upstream
    #[serde(default)]
    pub model_id: String,

    #[serde(default)]
    pub api_format: ApiFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,

    /// JSONL file receiving every dispatched message list; empty disables
    #[serde(default)]
    pub prompt_log_file: String,

    /// JSONL file receiving every completion; empty disables
    #[serde(default)]
    pub response_log_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Applies to non-streaming upstream calls only
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: Option<u64>,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            prompt_log_file: String::new(),
            response_log_file: String::new(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ModelConfig {
    /// Caller-visible route name
    pub fn route_name(&self) -> &str {
        self.model_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.model_id)
    }

    fn validate(&self, which: &str) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid(format!("{}.base_url is required", which)));
        }
        if self.model_id.trim().is_empty() {
            return Err(ConfigError::Invalid(format!("{}.model_id is required", which)));
        }
        Ok(())
    }
}

impl LoggingConfig {
    pub fn prompt_log_path(&self) -> Option<PathBuf> {
        non_empty_path(&self.prompt_log_file)
    }

    pub fn response_log_path(&self) -> Option<PathBuf> {
        non_empty_path(&self.response_log_file)
    }
}

impl HttpConfig {
    pub fn client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            connect_timeout_secs: self.connect_timeout_secs,
            request_timeout_secs: self.request_timeout_secs,
            ..HttpClientConfig::default()
        }
    }
}

impl ServerConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        let config = if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml::from_str(&contents)?
        } else {
            // Default to YAML
            serde_yaml::from_str(&contents)?
        };

        Ok(config)
    }

    /// Merge environment variables into config (env vars take precedence)
    pub fn merge_env(&mut self) {
        if let Ok(val) = std::env::var("TWINROUTE_HOST") {
            self.server.host = val;
        }

        if let Ok(val) = std::env::var("TWINROUTE_PORT") {
            match val.parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(_) => eprintln!("Warning: Invalid TWINROUTE_PORT '{}', ignoring", val),
            }
        }

        if let Ok(val) = std::env::var("TWINROUTE_LOG_LEVEL") {
            self.logging.level = val;
        }

        if let Ok(val) = std::env::var("TWINROUTE_PREPROCESS") {
            match val.parse::<bool>() {
                Ok(enabled) => self.preprocess_enabled = enabled,
                Err(_) => eprintln!("Warning: Invalid TWINROUTE_PREPROCESS '{}', ignoring", val),
            }
        }

        if let Ok(val) = std::env::var("TWINROUTE_CHAT_API_KEY") {
            self.chat_model.api_key = val;
        }

        if let Ok(val) = std::env::var("TWINROUTE_WORK_API_KEY") {
            self.work_model.api_key = val;
        }
    }

    /// Reject configurations the gateway cannot route with
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.chat_model.validate("chat_model")?;
        self.work_model.validate("work_model")?;
        Ok(())
    }
}

fn non_empty_path(value: &str) -> Option<PathBuf> {
    let value = value.trim();
    (!value.is_empty()).then(|| PathBuf::from(value))
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_request_timeout() -> Option<u64> {
    Some(600)
}
