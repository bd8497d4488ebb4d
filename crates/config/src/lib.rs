//! Configuration loading and validation for Bia.
//!
//! Loads configuration from `~/.bia/config.toml` when present, then
//! applies environment variable overrides. The environment variables
//! match the original deployment surface: `OPENAI_MODEL`,
//! `BIA_API_TOKEN`, `BIA_BASE_PROMPT`, `DATABASE_URL`, `OPENAI_API_KEY`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.bia/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Completion model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Shared secret for the HTTP service. The server refuses to
    /// authenticate anyone if unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    /// Base persona text prepended to every instruction block
    #[serde(default = "default_base_prompt")]
    pub base_prompt: String,

    /// Postgres connection string. Set = persistent storage;
    /// unset = volatile in-process fallback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,

    /// Credential for the upstream completion provider. Its absence
    /// fails only at first use, not at startup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,

    /// Default history window (raw turns) when the caller omits
    /// `max_history`
    #[serde(default = "default_max_history")]
    pub default_max_history: i64,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,
}

fn default_model() -> String {
    "gpt-4o".into()
}
fn default_base_prompt() -> String {
    "You are Bia. Stay in voice.".into()
}
fn default_max_history() -> i64 {
    20
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("model", &self.model)
            .field("api_token", &redact(&self.api_token))
            .field("base_prompt_len", &self.base_prompt.len())
            .field("database_url", &redact(&self.database_url))
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("default_max_history", &self.default_max_history)
            .field("gateway", &self.gateway)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8717
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_token: None,
            base_prompt: default_base_prompt(),
            database_url: None,
            openai_api_key: None,
            default_max_history: default_max_history(),
            gateway: GatewayConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (`~/.bia/config.toml`)
    /// and apply environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::config_dir().join("config.toml"))?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path (no env overrides).
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("no config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Apply environment variable overrides. Env always wins over the
    /// config file so deployments can stay file-less.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("OPENAI_MODEL") {
            self.model = val;
        }
        if let Ok(val) = std::env::var("BIA_API_TOKEN") {
            if !val.is_empty() {
                self.api_token = Some(val);
            }
        }
        if let Ok(val) = std::env::var("BIA_BASE_PROMPT") {
            self.base_prompt = val;
        }
        if let Ok(val) = std::env::var("DATABASE_URL") {
            if !val.is_empty() {
                self.database_url = Some(val);
            }
        }
        if let Ok(val) = std::env::var("OPENAI_API_KEY") {
            if !val.is_empty() {
                self.openai_api_key = Some(val);
            }
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".bia")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "model must not be empty".into(),
            ));
        }
        if self.default_max_history < 0 {
            return Err(ConfigError::ValidationError(
                "default_max_history must be >= 0".into(),
            ));
        }
        Ok(())
    }

    /// Whether persistent storage is configured.
    pub fn db_enabled(&self) -> bool {
        self.database_url.is_some()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
