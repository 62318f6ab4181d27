//! Configuration system for the dataq server
//!
//! Loads configuration from:
//! 1. config.yaml - operational settings (port, data directory, limits)
//! 2. .env file - secrets (API keys)
//!
//! Environment variables always override config.yaml values.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

/// Dataset storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Directory holding uploaded datasets
    pub directory: String,

    /// Maximum accepted upload size in megabytes
    pub max_upload_mb: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            directory: "./data".to_string(),
            max_upload_mb: 64,
        }
    }
}

/// Language-model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub model: String,

    /// Timeout for each model call, in milliseconds
    pub timeout_ms: u64,

    /// How many times a failed generated query is re-translated
    pub max_retries: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            timeout_ms: 30_000,
            max_retries: 1,
        }
    }
}

/// Query execution limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Row cap on every result
    pub max_result_rows: usize,

    /// Statement timeout in milliseconds
    pub timeout_ms: u64,

    /// Optional DuckDB memory budget in megabytes
    #[serde(default)]
    pub memory_limit_mb: Option<u64>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_result_rows: 500,
            timeout_ms: 10_000,
            memory_limit_mb: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or module-specific
    pub level: String,

    /// Output format: pretty, json, compact
    pub format: String,

    /// Output destination: stdout, file, both
    pub output: String,

    /// Directory for log files
    pub directory: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            output: "stdout".to_string(),
            directory: "./logs".to_string(),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from YAML file with environment variable overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = serde_yaml::from_str(&contents)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Defaults plus environment overrides when no config file exists
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            let mut config = Config::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("DATAQ_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("DATAQ_SERVER_PORT") {
            if let Ok(port_num) = port.parse() {
                self.server.port = port_num;
            }
        }
        if let Ok(dir) = std::env::var("DATAQ_DATA_DIR") {
            self.data.directory = dir;
        }
        if let Ok(model) = std::env::var("OPENAI_MODEL") {
            self.llm.model = model;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            self.logging.format = format;
        }
        if let Ok(output) = std::env::var("LOG_OUTPUT") {
            self.logging.output = output;
        }
        if let Ok(dir) = std::env::var("LOG_DIR") {
            self.logging.directory = dir;
        }
    }

    /// Get OpenAI API key from environment (must be in .env)
    pub fn openai_api_key() -> Result<String, ConfigError> {
        std::env::var("OPENAI_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("OPENAI_API_KEY".to_string()))
    }

    /// Set logging environment variables for the logging module
    pub fn apply_logging_env(&self) {
        std::env::set_var("RUST_LOG", &self.logging.level);
        std::env::set_var("LOG_FORMAT", &self.logging.format);
        std::env::set_var("LOG_OUTPUT", &self.logging.output);
        std::env::set_var("LOG_DIR", &self.logging.directory);
    }

    pub fn max_upload_bytes(&self) -> usize {
        (self.data.max_upload_mb as usize).saturating_mul(1024 * 1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.data.directory, "./data");
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.max_retries, 1);
        assert_eq!(config.query.max_result_rows, 500);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_env_var_override() {
        std::env::set_var("DATAQ_SERVER_PORT", "9090");
        std::env::set_var("DATAQ_DATA_DIR", "/srv/datasets");

        let config_yaml = r#"
server:
  host: "127.0.0.1"
  port: 8000
data:
  directory: "./data"
  max_upload_mb: 64
llm:
  model: "gpt-4o-mini"
  timeout_ms: 30000
  max_retries: 1
query:
  max_result_rows: 500
  timeout_ms: 10000
logging:
  level: "info"
  format: "pretty"
  output: "stdout"
  directory: "./logs"
"#;
        let temp_file = std::env::temp_dir().join("dataq_test_config.yaml");
        std::fs::write(&temp_file, config_yaml).unwrap();

        let config = Config::load(&temp_file).unwrap();
        assert_eq!(config.server.port, 9090); // Overridden
        assert_eq!(config.data.directory, "/srv/datasets"); // Overridden
        assert_eq!(config.query.timeout_ms, 10_000);

        std::env::remove_var("DATAQ_SERVER_PORT");
        std::env::remove_var("DATAQ_DATA_DIR");
        std::fs::remove_file(temp_file).ok();
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let temp_file = std::env::temp_dir().join("dataq_partial_config.yaml");
        std::fs::write(&temp_file, "server:\n  host: \"0.0.0.0\"\n  port: 9000\n").unwrap();

        let config = Config::load(&temp_file).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.query.max_result_rows, 500);

        std::fs::remove_file(temp_file).ok();
    }

    #[test]
    fn test_load_or_default_without_file() {
        let missing = std::env::temp_dir().join("dataq-no-such-config.yaml");
        let config = Config::load_or_default(&missing).unwrap();
        assert_eq!(config.llm.timeout_ms, 30_000);
    }
}
