pub mod validation;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use self::validation::validate_config;
use crate::pricing::Pricing;

/// Error type for configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Remote chat-completion API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u64,
    #[serde(default)]
    pub temperature: f64,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    #[serde(default = "default_api_version")]
    pub version: String,
}

fn default_endpoint() -> String {
    "https://api.anthropic.com/v1/messages".to_string()
}
fn default_model() -> String {
    "claude-3-5-sonnet-20241022".to_string()
}
fn default_max_tokens() -> u64 {
    4096
}
fn default_system_prompt() -> String {
    "You are Claude, an AI assistant created by Anthropic. You are viewing the user's workspace and can help with coding tasks.".to_string()
}
fn default_api_version() -> String {
    "2023-06-01".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            key: String::new(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: 0.0,
            system_prompt: default_system_prompt(),
            version: default_api_version(),
        }
    }
}

impl ApiConfig {
    /// The credential, if one is configured.
    #[must_use]
    pub fn credential(&self) -> Option<&str> {
        let key = self.key.trim();
        (!key.is_empty()).then_some(key)
    }
}

/// HTTP client settings. Read once, when the transport is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
    #[serde(default = "default_http_pool_max_idle_per_host")]
    pub http_pool_max_idle_per_host: usize,
    #[serde(default)]
    pub http_use_env_proxy: bool,
    #[serde(default)]
    pub proxy: Option<String>,
}

fn default_timeout() -> u64 {
    600
}
fn default_connect_timeout() -> u64 {
    5
}
fn default_http_pool_max_idle_per_host() -> usize {
    4
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
            http_pool_max_idle_per_host: default_http_pool_max_idle_per_host(),
            http_use_env_proxy: false,
            proxy: None,
        }
    }
}

/// Feature flags and settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// `text` or `json`.
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_log_level() -> String {
    "INFO".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub pricing: Pricing,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub features: FeaturesConfig,
}

/// Load configuration from a YAML file and validate it.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when reading the file fails, [`ConfigError::Yaml`]
/// when parsing fails, or [`ConfigError::Validation`] when semantic validation fails.
pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parse and validate configuration from YAML text.
///
/// # Errors
///
/// Returns [`ConfigError::Yaml`] or [`ConfigError::Validation`].
pub fn parse_config(contents: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = serde_yaml::from_str(contents)?;
    validate_config(&config)?;
    Ok(config)
}

/// Supplies a configuration snapshot at the start of every exchange.
///
/// Implementations are consulted per call, so credential or endpoint changes
/// apply to the next exchange without restarting the session.
pub trait ConfigSource: Send + Sync {
    /// Take a snapshot of the current configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the configuration cannot be produced.
    fn snapshot(&self) -> Result<AppConfig, ConfigError>;
}

/// Re-reads a YAML file on every snapshot.
#[derive(Debug, Clone)]
pub struct FileConfigSource {
    path: PathBuf,
}

impl FileConfigSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigSource for FileConfigSource {
    fn snapshot(&self) -> Result<AppConfig, ConfigError> {
        load_config(&self.path)
    }
}

/// A fixed in-memory configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigSource {
    config: AppConfig,
}

impl StaticConfigSource {
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }
}

impl ConfigSource for StaticConfigSource {
    fn snapshot(&self) -> Result<AppConfig, ConfigError> {
        Ok(self.config.clone())
    }
}
