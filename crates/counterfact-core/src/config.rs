//! Configuration loading and typed config structures for Counterfact.
//!
//! The canonical configuration lives in `counterfact-config.yaml` at the
//! project root. Every section and field has a default, so an empty file
//! (or no file at all) yields a working server that uses the built-in
//! scenario and the deterministic collaborator.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Environment variable holding the LLM API key. Keys never live in YAML.
pub const LLM_API_KEY_ENV: &str = "COUNTERFACT_LLM_API_KEY";

/// Environment variable overriding `llm.api_url`.
pub const LLM_API_URL_ENV: &str = "COUNTERFACT_LLM_API_URL";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration, mirroring `counterfact-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AppConfig {
    /// HTTP listener.
    #[serde(default)]
    pub server: ServerConfig,

    /// Reasoning backend.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Pre-generated content.
    #[serde(default)]
    pub content: ContentConfig,

    /// Scenario seed.
    #[serde(default)]
    pub scenario: ScenarioConfig,

    /// Logging.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables are applied on top:
    /// - `COUNTERFACT_LLM_API_KEY` sets `llm.api_key`
    /// - `COUNTERFACT_LLM_API_URL` overrides `llm.api_url`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, applying environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.llm.apply_env_overrides();
        Ok(config)
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerConfig {
    /// `host:port`, ready for a listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Reasoning backend configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LlmConfig {
    /// Whether to try the reasoning backend before the deterministic one.
    #[serde(default)]
    pub enabled: bool,

    /// Backend type: `openai` (also `deepseek`, `ollama`) or `anthropic`
    /// (also `claude`).
    #[serde(default = "default_llm_backend")]
    pub backend: String,

    /// API base URL.
    #[serde(default = "default_llm_api_url")]
    pub api_url: String,

    /// Model identifier.
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Directory of prompt templates overriding the built-in ones.
    #[serde(default)]
    pub templates_dir: Option<PathBuf>,

    /// API key, read from the environment only.
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl LlmConfig {
    /// Override backend settings with environment variables when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(LLM_API_KEY_ENV)
            && !val.trim().is_empty()
        {
            self.api_key = Some(val);
        }
        if let Ok(val) = std::env::var(LLM_API_URL_ENV)
            && !val.trim().is_empty()
        {
            self.api_url = val;
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            backend: default_llm_backend(),
            api_url: default_llm_api_url(),
            model: default_llm_model(),
            request_timeout_ms: default_request_timeout_ms(),
            templates_dir: None,
            api_key: None,
        }
    }
}

/// Pre-generated content configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ContentConfig {
    /// YAML file mapping content keys to narration and media.
    #[serde(default)]
    pub cache_path: Option<PathBuf>,
}

/// Scenario seed configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ScenarioConfig {
    /// YAML scenario file. The built-in scenario is used when unset.
    #[serde(default)]
    pub seed_path: Option<PathBuf>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    8080
}

fn default_llm_backend() -> String {
    "openai".to_owned()
}

fn default_llm_api_url() -> String {
    "https://api.openai.com/v1".to_owned()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_owned()
}

const fn default_request_timeout_ms() -> u64 {
    20_000
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.server.bind_address(), "0.0.0.0:8080");
        assert!(!config.llm.enabled);
        assert_eq!(config.llm.request_timeout_ms, 20_000);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.scenario.seed_path.is_none());
    }

    #[test]
    fn empty_yaml_yields_defaults() {
        let config = AppConfig::parse("").unwrap();
        assert_eq!(config.server, ServerConfig::default());
        assert_eq!(config.content, ContentConfig::default());
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let yaml = r"
server:
  port: 9090
llm:
  enabled: true
  backend: anthropic
  model: claude-sonnet
  templates_dir: ./templates
logging:
  format: json
";
        let config = AppConfig::parse(yaml).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert!(config.llm.enabled);
        assert_eq!(config.llm.backend, "anthropic");
        assert_eq!(config.llm.model, "claude-sonnet");
        assert_eq!(config.llm.templates_dir, Some(PathBuf::from("./templates")));
        assert_eq!(config.llm.request_timeout_ms, 20_000);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn api_key_is_not_read_from_yaml() {
        let config = AppConfig::parse("llm:\n  api_key: leaked\n").unwrap();
        assert_ne!(config.llm.api_key.as_deref(), Some("leaked"));
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        assert!(matches!(
            AppConfig::parse("server: [unclosed"),
            Err(ConfigError::Yaml { .. })
        ));
    }

    #[test]
    fn loads_repository_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../counterfact-config.yaml");
        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.server.port, 8080);
    }
}
