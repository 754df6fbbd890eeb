use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

const ENV_CONFIG_PATH: &str = "CLASSIFIER_CONFIG_PATH";
const DEFAULT_CONFIG_PATH: &str = "config.yaml";

const ENV_SERVICE_NAME: &str = "SERVICE_NAME";
const ENV_OTEL_SERVICE_NAME: &str = "OTEL_SERVICE_NAME";
const ENV_ENVIRONMENT: &str = "ENVIRONMENT";
const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
const ENV_LOG_FORMAT: &str = "LOG_FORMAT";
const ENV_MODEL_ID: &str = "LLM_MODEL_ID";
const ENV_MAX_ATTEMPTS: &str = "LLM_MAX_ATTEMPTS";
const ENV_TIMEOUT_SECS: &str = "LLM_TIMEOUT_SECS";

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_MSWORD: &str = "application/msword";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_TEXT: &str = "text/plain";

const DEFAULT_MAX_DOCUMENT_BYTES: usize = 20 * 1024 * 1024;

/// Deployment tier the service runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "staging" => Some(Self::Staging),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }
}

/// Output format of the log subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// Accepted document types and size limits
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentPolicy {
    /// MIME types accepted for direct uploads
    #[serde(default = "default_upload_mime_types")]
    pub upload_mime_types: Vec<String>,
    /// MIME types accepted for documents fetched from a URL
    #[serde(default = "default_remote_mime_types")]
    pub remote_mime_types: Vec<String>,
    /// Maximum accepted document size in bytes
    #[serde(default = "default_max_document_bytes")]
    pub max_document_bytes: usize,
}

fn default_remote_mime_types() -> Vec<String> {
    [MIME_PDF, MIME_MSWORD, MIME_DOCX]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_upload_mime_types() -> Vec<String> {
    let mut types = default_remote_mime_types();
    types.push(MIME_TEXT.to_string());
    types
}

fn default_max_document_bytes() -> usize {
    DEFAULT_MAX_DOCUMENT_BYTES
}

impl Default for DocumentPolicy {
    fn default() -> Self {
        Self {
            upload_mime_types: default_upload_mime_types(),
            remote_mime_types: default_remote_mime_types(),
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
        }
    }
}

impl DocumentPolicy {
    pub fn accepts_upload(&self, mime_type: &str) -> bool {
        contains_mime(&self.upload_mime_types, mime_type)
    }

    pub fn accepts_remote(&self, mime_type: &str) -> bool {
        contains_mime(&self.remote_mime_types, mime_type)
    }
}

fn contains_mime(allowed: &[String], mime_type: &str) -> bool {
    allowed.iter().any(|a| a.eq_ignore_ascii_case(mime_type))
}

/// Hosted model settings
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub model_id: String,
    pub max_attempts: usize,
    pub timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model_id: "gpt-4o-mini".to_string(),
            max_attempts: 2,
            timeout: Duration::from_secs(120),
        }
    }
}

/// YAML configuration file structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub documents: DocumentPolicy,
}

/// Application configuration, read once at startup
#[derive(Debug, Clone)]
pub struct Config {
    pub service_name: String,
    pub environment: Environment,
    pub log_level: String,
    pub log_format: LogFormat,
    pub llm: LlmConfig,
    pub documents: DocumentPolicy,
    pub port: u16,
    pub host: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "app".to_string(),
            environment: Environment::default(),
            log_level: "debug".to_string(),
            log_format: LogFormat::default(),
            llm: LlmConfig::default(),
            documents: DocumentPolicy::default(),
            port: 8080,
            host: "127.0.0.1".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment and config file
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);

        let host = std::env::var("HOST").unwrap_or(defaults.host);

        let service_name = non_empty_env(ENV_SERVICE_NAME)
            .or_else(|| non_empty_env(ENV_OTEL_SERVICE_NAME))
            .unwrap_or(defaults.service_name);

        let environment = non_empty_env(ENV_ENVIRONMENT)
            .and_then(|e| Environment::parse(&e))
            .unwrap_or(defaults.environment);

        let log_level = non_empty_env(ENV_LOG_LEVEL)
            .map(|l| normalize_log_level(&l))
            .unwrap_or(defaults.log_level);

        let log_format = match non_empty_env(ENV_LOG_FORMAT).as_deref() {
            Some("pretty") | Some("text") => LogFormat::Pretty,
            _ => LogFormat::Json,
        };

        let llm = LlmConfig {
            model_id: non_empty_env(ENV_MODEL_ID).unwrap_or(defaults.llm.model_id),
            max_attempts: std::env::var(ENV_MAX_ATTEMPTS)
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.llm.max_attempts),
            timeout: std::env::var(ENV_TIMEOUT_SECS)
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.llm.timeout),
        };

        let config_path = std::env::var(ENV_CONFIG_PATH)
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let documents = Self::load_config_file(&config_path)
            .map(|cf| cf.documents)
            .unwrap_or_default();

        Self {
            service_name,
            environment,
            log_level,
            log_format,
            llm,
            documents,
            port,
            host,
        }
    }

    /// Load configuration from YAML file
    fn load_config_file(path: &str) -> Option<ConfigFile> {
        let path = Path::new(path);

        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            return None;
        }

        match fs::read_to_string(path) {
            Ok(contents) => Self::parse_config_file(&contents)
                .map_err(|e| {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to parse config file, using defaults");
                })
                .ok(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read config file, using defaults");
                None
            }
        }
    }

    fn parse_config_file(contents: &str) -> Result<ConfigFile, serde_yaml::Error> {
        let contents = contents.trim();
        if contents.is_empty() {
            return Ok(ConfigFile::default());
        }
        serde_yaml::from_str(contents)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Map `WARNING`/`CRITICAL` style level names onto `tracing` filter directives
fn normalize_log_level(level: &str) -> String {
    match level.trim().to_lowercase().as_str() {
        "warning" => "warn".to_string(),
        "critical" | "fatal" => "error".to_string(),
        other => other.to_string(),
    }
}
