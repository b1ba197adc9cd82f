//! Runtime configuration read from environment variables.

use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8081;
pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 10_000;
pub const DEFAULT_MAX_TOPIC_LENGTH: usize = 60;
pub const DEFAULT_SUPPORT_EMAIL: &str = "support@example.com";
pub const DEFAULT_API_SERVER_URL: &str = "http://localhost:8081/api/v1";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be a positive integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
    #[error("{name} has an unsupported value {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Limits applied when validating message content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageLimits {
    pub max_message_length: usize,
    pub max_topic_length: usize,
}

impl Default for MessageLimits {
    fn default() -> Self {
        Self {
            max_message_length: DEFAULT_MAX_MESSAGE_LENGTH,
            max_topic_length: DEFAULT_MAX_TOPIC_LENGTH,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: Option<String>,
    pub seed_file: Option<PathBuf>,
    pub is_development: bool,
    pub limits: MessageLimits,
    pub support_email: String,
    pub api_server_url: String,
    pub cors_allowed_origins: Vec<String>,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: None,
            seed_file: None,
            is_development: false,
            limits: MessageLimits::default(),
            support_email: DEFAULT_SUPPORT_EMAIL.to_string(),
            api_server_url: DEFAULT_API_SERVER_URL.to_string(),
            cors_allowed_origins: Vec::new(),
            log_format: LogFormat::Text,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_number<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match non_empty_var(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
    }
}

impl AppConfig {
    /// Build the configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let app_env = non_empty_var("APP_ENV").unwrap_or_else(|| "production".to_string());

        let log_format = match non_empty_var("LOG_FORMAT").as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    name: "LOG_FORMAT",
                    value: other.to_string(),
                });
            }
        };

        let limits = MessageLimits {
            max_message_length: parse_number("MAX_MESSAGE_LENGTH", DEFAULT_MAX_MESSAGE_LENGTH)?,
            max_topic_length: parse_number("MAX_TOPIC_LENGTH", DEFAULT_MAX_TOPIC_LENGTH)?,
        };
        if limits.max_message_length == 0 {
            return Err(ConfigError::InvalidNumber {
                name: "MAX_MESSAGE_LENGTH",
                value: "0".to_string(),
            });
        }
        if limits.max_topic_length == 0 {
            return Err(ConfigError::InvalidNumber {
                name: "MAX_TOPIC_LENGTH",
                value: "0".to_string(),
            });
        }

        let cors_allowed_origins = non_empty_var("CORS_ALLOWED_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            port: parse_number("PORT", DEFAULT_PORT)?,
            database_url: non_empty_var("DATABASE_URL"),
            seed_file: non_empty_var("SEED_FILE").map(PathBuf::from),
            is_development: app_env.eq_ignore_ascii_case("development"),
            limits,
            support_email: non_empty_var("SUPPORT_EMAIL")
                .unwrap_or_else(|| DEFAULT_SUPPORT_EMAIL.to_string()),
            api_server_url: non_empty_var("API_SERVER_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_SERVER_URL.to_string()),
            cors_allowed_origins,
            log_format,
        })
    }
}
