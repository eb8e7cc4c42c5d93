//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Require both Datadog credentials
//! - Validate value ranges (timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: MiddlewareConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{DatadogConfig, MiddlewareConfig};

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required credential `{0}`")]
    MissingCredential(&'static str),

    #[error("invalid Datadog API URL '{url}': {reason}")]
    InvalidApiUrl { url: String, reason: String },

    #[error("`{0}` must be greater than zero")]
    ZeroValue(&'static str),

    #[error("invalid socket address for `{field}`: '{value}'")]
    InvalidAddress { field: &'static str, value: String },
}

/// Names of the Datadog credentials that are absent or blank.
pub fn missing_credentials(config: &DatadogConfig) -> Vec<&'static str> {
    let blank = |value: &Option<String>| value.as_deref().map_or(true, |v| v.trim().is_empty());

    let mut missing = Vec::new();
    if blank(&config.api_key) {
        missing.push("api_key");
    }
    if blank(&config.application_key) {
        missing.push("application_key");
    }
    missing
}

/// Validate the Datadog section on its own.
pub fn validate_datadog(config: &DatadogConfig) -> Vec<ValidationError> {
    let mut errors: Vec<ValidationError> = missing_credentials(config)
        .into_iter()
        .map(ValidationError::MissingCredential)
        .collect();

    match url::Url::parse(&config.api_url) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(ValidationError::InvalidApiUrl {
            url: config.api_url.clone(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        }),
        Err(e) => errors.push(ValidationError::InvalidApiUrl {
            url: config.api_url.clone(),
            reason: e.to_string(),
        }),
    }

    if config.timeout_secs == 0 {
        errors.push(ValidationError::ZeroValue("datadog.timeout_secs"));
    }

    errors
}

/// Validate a whole configuration, collecting every problem.
pub fn validate_config(config: &MiddlewareConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = validate_datadog(&config.datadog);

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroValue("listener.request_timeout_secs"));
    }
    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroValue("listener.max_body_bytes"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
