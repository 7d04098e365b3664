use std::env;
use std::fmt;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MODEL_MAX_RETRIES: u32 = 1;
const DEFAULT_UPLOAD_DIR: &str = "./uploads";
const DEFAULT_SERVER_PORT: u16 = 8080;
const DEFAULT_TESSERACT_BIN: &str = "tesseract";
const DEFAULT_OCR_LANGUAGE: &str = "eng";
const DEFAULT_LOG_FILE: &str = "logs/docparse.log";
const DEFAULT_LOG_FILTER: &str = "info";

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the document parsing server.
#[derive(Clone)]
pub struct Config {
    /// Credential for the Gemini `generateContent` endpoint.
    pub gemini_api_key: String,
    /// Model identifier placed in the endpoint path.
    pub gemini_model: String,
    /// Base URL of the generative language API.
    pub gemini_base_url: String,
    /// Per-attempt timeout applied to model requests.
    pub model_timeout: Duration,
    /// Number of retries allowed after the first model request fails transiently.
    pub model_max_retries: u32,
    /// Scratch directory receiving uploaded files.
    pub upload_dir: PathBuf,
    /// Port the HTTP server binds on all interfaces.
    pub server_port: u16,
    /// Path or name of the `tesseract` executable.
    pub tesseract_bin: String,
    /// Language pack passed to `tesseract -l`.
    pub ocr_language: String,
    /// File receiving a copy of every log event, appended across restarts.
    pub log_file: PathBuf,
    /// `EnvFilter` directives, taken from `RUST_LOG`.
    pub log_filter: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("gemini_api_key", &"<redacted>")
            .field("gemini_model", &self.gemini_model)
            .field("gemini_base_url", &self.gemini_base_url)
            .field("model_timeout", &self.model_timeout)
            .field("model_max_retries", &self.model_max_retries)
            .field("upload_dir", &self.upload_dir)
            .field("server_port", &self.server_port)
            .field("tesseract_bin", &self.tesseract_bin)
            .field("ocr_language", &self.ocr_language)
            .field("log_file", &self.log_file)
            .field("log_filter", &self.log_filter)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            gemini_api_key: load_env("GEMINI_API_KEY")?,
            gemini_model: load_env_optional("GEMINI_MODEL")
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            gemini_base_url: load_env_optional("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            model_timeout: Duration::from_secs(
                parse_optional("MODEL_TIMEOUT_SECS", load_env_optional("MODEL_TIMEOUT_SECS"))?
                    .unwrap_or(DEFAULT_MODEL_TIMEOUT_SECS),
            ),
            model_max_retries: parse_optional(
                "MODEL_MAX_RETRIES",
                load_env_optional("MODEL_MAX_RETRIES"),
            )?
            .unwrap_or(DEFAULT_MODEL_MAX_RETRIES),
            upload_dir: load_env_optional("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR)),
            server_port: parse_optional("SERVER_PORT", load_env_optional("SERVER_PORT"))?
                .unwrap_or(DEFAULT_SERVER_PORT),
            tesseract_bin: load_env_optional("TESSERACT_BIN")
                .unwrap_or_else(|| DEFAULT_TESSERACT_BIN.to_string()),
            ocr_language: load_env_optional("OCR_LANGUAGE")
                .unwrap_or_else(|| DEFAULT_OCR_LANGUAGE.to_string()),
            log_file: load_env_optional("DOCPARSE_LOG_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE)),
            log_filter: load_env_optional("RUST_LOG")
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        })
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    load_env_optional(key).ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_optional<T: std::str::FromStr>(
    key: &str,
    value: Option<String>,
) -> Result<Option<T>, ConfigError> {
    value
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
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
        model = %config.gemini_model,
        base_url = %config.gemini_base_url,
        timeout_secs = config.model_timeout.as_secs(),
        max_retries = config.model_max_retries,
        upload_dir = %config.upload_dir.display(),
        server_port = config.server_port,
        log_file = %config.log_file.display(),
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}
