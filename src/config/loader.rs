//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::MiddlewareConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable overriding `datadog.api_key`.
pub const API_KEY_ENV: &str = "DD_API_KEY";
/// Environment variable overriding `datadog.application_key`.
pub const APP_KEY_ENV: &str = "DD_APP_KEY";

/// Error type for configuration loading and client construction.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("Datadog middleware needs an API key and an application key (missing: {})", .0.join(", "))]
    MissingCredentials(Vec<&'static str>),

    #[error("failed to build monitoring client: {0}")]
    Client(#[from] reqwest::Error),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
///
/// Credentials from `DD_API_KEY` / `DD_APP_KEY` take precedence over the file.
pub fn load_config(path: &Path) -> Result<MiddlewareConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    load_from_str(&content, |key| std::env::var(key).ok())
}

/// Parse, apply overrides from `lookup`, and validate.
pub fn load_from_str<F>(content: &str, lookup: F) -> Result<MiddlewareConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config: MiddlewareConfig = toml::from_str(content)?;
    apply_overrides(&mut config, lookup);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Defaults plus environment overrides, validated. Used when no file is given.
pub fn from_env() -> Result<MiddlewareConfig, ConfigError> {
    let mut config = MiddlewareConfig::default();
    apply_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Replace credentials with non-empty values found through `lookup`.
pub fn apply_overrides<F>(config: &mut MiddlewareConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(key) = lookup(API_KEY_ENV).filter(|v| !v.trim().is_empty()) {
        config.datadog.api_key = Some(key);
    }
    if let Some(key) = lookup(APP_KEY_ENV).filter(|v| !v.trim().is_empty()) {
        config.datadog.application_key = Some(key);
    }
}
