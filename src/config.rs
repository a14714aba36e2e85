use serde::Deserialize;
use std::env;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_OLLAMA_MODEL: &str = "mistral:7b";
const DEFAULT_GATEWAY_TIMEOUT_SECS: u64 = 1200;
const DEFAULT_SUMMARY_CHUNK_SIZE: usize = 2000;
const DEFAULT_MAX_RAW_TEXT_LENGTH: usize = 5000;
const DEFAULT_MAX_TEXT_LENGTH_FOR_MODEL: usize = 5000;
const DEFAULT_RISK_ANALYSIS_INPUT_CAP: usize = 1500;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_UPLOAD_DIR: &str = "uploads";

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the DocSense server.
///
/// The summarization chunk size, the pasted-text cap, and the risk-analysis cap are three
/// separate limits. Their relationship is undefined upstream, so none is derived from another.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the Ollama runtime serving completions.
    pub ollama_url: String,
    /// Model identifier sent with every completion request.
    pub ollama_model: String,
    /// Timeout applied to each completion call, in seconds.
    pub gateway_timeout_secs: u64,
    /// Maximum chunk size (characters) used by the map phase.
    pub summary_chunk_size: usize,
    /// Optional cap on simultaneous map-phase completion calls.
    pub summary_max_concurrency: Option<usize>,
    /// Display cap for extracted text returned by `/process-document`.
    pub max_raw_text_length: usize,
    /// Truncation cap for text sent to the model by `/process-text`.
    pub max_text_length_for_model: usize,
    /// Number of leading characters considered by the risk analyzer.
    pub risk_analysis_input_cap: usize,
    /// Maximum accepted upload size in bytes.
    pub max_upload_bytes: usize,
    /// Directory used for short-lived upload staging.
    pub upload_dir: String,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
    /// Optional log file path; the logging module picks a default when unset.
    pub log_file: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            ollama_model: DEFAULT_OLLAMA_MODEL.to_string(),
            gateway_timeout_secs: DEFAULT_GATEWAY_TIMEOUT_SECS,
            summary_chunk_size: DEFAULT_SUMMARY_CHUNK_SIZE,
            summary_max_concurrency: None,
            max_raw_text_length: DEFAULT_MAX_RAW_TEXT_LENGTH,
            max_text_length_for_model: DEFAULT_MAX_TEXT_LENGTH_FOR_MODEL,
            risk_analysis_input_cap: DEFAULT_RISK_ANALYSIS_INPUT_CAP,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            upload_dir: DEFAULT_UPLOAD_DIR.to_string(),
            server_port: None,
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults for unset keys.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            ollama_url: load_env_optional("OLLAMA_URL").unwrap_or(defaults.ollama_url),
            ollama_model: load_env_optional("OLLAMA_MODEL").unwrap_or(defaults.ollama_model),
            gateway_timeout_secs: parse_env("GATEWAY_TIMEOUT_SECS")?
                .unwrap_or(defaults.gateway_timeout_secs),
            summary_chunk_size: parse_positive("SUMMARY_CHUNK_SIZE")?
                .unwrap_or(defaults.summary_chunk_size),
            summary_max_concurrency: parse_positive("SUMMARY_MAX_CONCURRENCY")?,
            max_raw_text_length: parse_env("MAX_RAW_TEXT_LENGTH")?
                .unwrap_or(defaults.max_raw_text_length),
            max_text_length_for_model: parse_env("MAX_TEXT_LENGTH_FOR_MODEL")?
                .unwrap_or(defaults.max_text_length_for_model),
            risk_analysis_input_cap: parse_env("RISK_ANALYSIS_INPUT_CAP")?
                .unwrap_or(defaults.risk_analysis_input_cap),
            max_upload_bytes: parse_positive("MAX_UPLOAD_BYTES")?
                .unwrap_or(defaults.max_upload_bytes),
            upload_dir: load_env_optional("UPLOAD_DIR").unwrap_or(defaults.upload_dir),
            server_port: parse_env("SERVER_PORT")?,
            log_file: load_env_optional("DOCSENSE_LOG_FILE"),
        })
    }

    /// Timeout applied to each completion call.
    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway_timeout_secs)
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

fn parse_positive(key: &str) -> Result<Option<usize>, ConfigError> {
    match parse_env::<usize>(key)? {
        Some(0) => Err(ConfigError::InvalidValue(key.to_string())),
        other => Ok(other),
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        ollama_url = %config.ollama_url,
        model = %config.ollama_model,
        chunk_size = config.summary_chunk_size,
        max_concurrency = ?config.summary_max_concurrency,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}
