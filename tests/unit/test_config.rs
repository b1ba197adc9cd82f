//! Unit tests for configuration read from the environment.
//!
//! Environment variables are process-wide, so every test runs serially.

use drafts_api::config::{
    AppConfig, ConfigError, DEFAULT_API_SERVER_URL, DEFAULT_MAX_MESSAGE_LENGTH, DEFAULT_PORT,
    LogFormat,
};
use drafts_api::services::JwtService;
use serial_test::serial;

const VARS: &[&str] = &[
    "APP_ENV",
    "PORT",
    "DATABASE_URL",
    "SEED_FILE",
    "MAX_MESSAGE_LENGTH",
    "MAX_TOPIC_LENGTH",
    "SUPPORT_EMAIL",
    "API_SERVER_URL",
    "CORS_ALLOWED_ORIGINS",
    "LOG_FORMAT",
    "JWT_SECRET",
];

fn clear_env() {
    for var in VARS {
        unsafe { std::env::remove_var(var) };
    }
}

fn set_env(name: &str, value: &str) {
    unsafe { std::env::set_var(name, value) };
}

#[test]
#[serial]
fn test_defaults() {
    clear_env();

    let config = AppConfig::from_env().unwrap();

    assert_eq!(config.port, DEFAULT_PORT);
    assert!(config.database_url.is_none());
    assert!(config.seed_file.is_none());
    assert!(!config.is_development);
    assert_eq!(config.limits.max_message_length, DEFAULT_MAX_MESSAGE_LENGTH);
    assert_eq!(config.api_server_url, DEFAULT_API_SERVER_URL);
    assert!(config.cors_allowed_origins.is_empty());
    assert_eq!(config.log_format, LogFormat::Text);
}

#[test]
#[serial]
fn test_values_from_environment() {
    clear_env();
    set_env("APP_ENV", "Development");
    set_env("PORT", "9000");
    set_env("SEED_FILE", "/etc/drafts/seed.yaml");
    set_env("MAX_TOPIC_LENGTH", "40");
    set_env("API_SERVER_URL", "https://chat.example.com/api/v1/");
    set_env("CORS_ALLOWED_ORIGINS", "https://a.example, ,https://b.example");
    set_env("LOG_FORMAT", "json");

    let config = AppConfig::from_env().unwrap();
    clear_env();

    assert_eq!(config.port, 9000);
    assert!(config.is_development);
    assert_eq!(
        config.seed_file.as_deref(),
        Some(std::path::Path::new("/etc/drafts/seed.yaml"))
    );
    assert_eq!(config.limits.max_topic_length, 40);
    assert_eq!(config.api_server_url, "https://chat.example.com/api/v1");
    assert_eq!(
        config.cors_allowed_origins,
        vec!["https://a.example", "https://b.example"]
    );
    assert_eq!(config.log_format, LogFormat::Json);
}

#[test]
#[serial]
fn test_invalid_values_are_rejected() {
    clear_env();

    set_env("PORT", "eighty");
    assert_eq!(
        AppConfig::from_env().unwrap_err(),
        ConfigError::InvalidNumber {
            name: "PORT",
            value: "eighty".to_string()
        }
    );
    clear_env();

    set_env("MAX_MESSAGE_LENGTH", "0");
    assert!(matches!(
        AppConfig::from_env(),
        Err(ConfigError::InvalidNumber {
            name: "MAX_MESSAGE_LENGTH",
            ..
        })
    ));
    clear_env();

    set_env("LOG_FORMAT", "xml");
    assert!(matches!(
        AppConfig::from_env(),
        Err(ConfigError::InvalidValue {
            name: "LOG_FORMAT",
            ..
        })
    ));
    clear_env();
}

#[test]
#[serial]
fn test_jwt_secret_requirements() {
    clear_env();
    assert!(JwtService::try_from_env(false).is_err());
    assert!(JwtService::try_from_env(true).is_ok());

    set_env("JWT_SECRET", "too-short");
    assert!(JwtService::try_from_env(false).is_err());
    assert!(JwtService::try_from_env(true).is_ok());

    set_env("JWT_SECRET", "a-production-secret-with-enough-characters");
    assert!(JwtService::try_from_env(false).is_ok());
    clear_env();
}
