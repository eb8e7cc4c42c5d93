//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the middleware.
//! All types derive Serde traits for deserialization from config files.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Root configuration for the error-reporting middleware.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MiddlewareConfig {
    /// Datadog API credentials and event settings.
    pub datadog: DatadogConfig,

    /// How captured failures are reported.
    pub reporting: ReportingConfig,

    /// Listener settings for the bundled host.
    pub listener: ListenerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Datadog events API configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatadogConfig {
    /// API key (required).
    pub api_key: Option<String>,

    /// Application key (required).
    pub application_key: Option<String>,

    /// Base URL of the Datadog API.
    pub api_url: String,

    /// Timeout for a single event submission.
    pub timeout_secs: u64,

    /// Datadog alert type attached to every event.
    pub alert_type: String,

    /// Tags attached to every event (e.g. "env:prod").
    pub tags: Vec<String>,
}

impl Default for DatadogConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            application_key: None,
            api_url: "https://api.datadoghq.com".to_string(),
            timeout_secs: 10,
            alert_type: "error".to_string(),
            tags: Vec::new(),
        }
    }
}

impl DatadogConfig {
    /// Config with both credentials set and everything else defaulted.
    pub fn with_keys(api_key: impl Into<String>, application_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            application_key: Some(application_key.into()),
            ..Self::default()
        }
    }
}

impl fmt::Debug for DatadogConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatadogConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field(
                "application_key",
                &self.application_key.as_ref().map(|_| "<redacted>"),
            )
            .field("api_url", &self.api_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("alert_type", &self.alert_type)
            .field("tags", &self.tags)
            .finish()
    }
}

/// Reporting configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ReportingConfig {
    /// Origin host for events. Defaults to the request's hostname.
    pub host: Option<String>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Whole-request timeout.
    pub request_timeout_secs: u64,

    /// Largest request body buffered for the application.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines instead of human-readable text.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
