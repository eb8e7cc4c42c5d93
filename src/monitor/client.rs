//! Datadog events API client.
//!
//! # Responsibilities
//! - Hold the API and application keys
//! - Post diagnostic events to `/api/v1/events`
//! - Bound every submission with a timeout

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::loader::ConfigError;
use crate::config::schema::DatadogConfig;
use crate::config::validation::{missing_credentials, validate_datadog};
use crate::monitor::types::{DiagnosticEvent, EventSink, MonitorError, MonitorResult};

const API_KEY_HEADER: &str = "DD-API-KEY";
const APPLICATION_KEY_HEADER: &str = "DD-APPLICATION-KEY";
const EVENTS_PATH: &str = "/api/v1/events";

/// Request body of the events endpoint.
#[derive(Debug, Serialize)]
struct EventPayload<'a> {
    title: &'a str,
    text: &'a str,
    aggregation_key: &'a str,
    host: &'a str,
    alert_type: &'a str,
    #[serde(skip_serializing_if = "no_tags")]
    tags: &'a [String],
}

fn no_tags(tags: &&[String]) -> bool {
    tags.is_empty()
}

/// Datadog client. Cheap to clone; safe to share across requests.
#[derive(Clone)]
pub struct DatadogClient {
    http: reqwest::Client,
    events_url: String,
    api_key: String,
    application_key: String,
    alert_type: String,
    tags: Vec<String>,
}

impl DatadogClient {
    /// Client against the public Datadog API with default settings.
    pub fn new(api_key: &str, application_key: &str) -> Result<Self, ConfigError> {
        Self::from_config(&DatadogConfig::with_keys(api_key, application_key))
    }

    /// Build a client, failing if either credential is absent or blank or
    /// the rest of the Datadog settings do not validate.
    pub fn from_config(config: &DatadogConfig) -> Result<Self, ConfigError> {
        let missing = missing_credentials(config);
        if !missing.is_empty() {
            return Err(ConfigError::MissingCredentials(missing));
        }

        let errors = validate_datadog(config);
        if !errors.is_empty() {
            return Err(ConfigError::Validation(errors));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let client = Self {
            http,
            events_url: format!("{}{}", config.api_url.trim_end_matches('/'), EVENTS_PATH),
            api_key: config.api_key.clone().unwrap_or_default(),
            application_key: config.application_key.clone().unwrap_or_default(),
            alert_type: config.alert_type.clone(),
            tags: config.tags.clone(),
        };

        tracing::info!(
            events_url = %client.events_url,
            timeout_secs = config.timeout_secs,
            "Datadog client initialized"
        );
        Ok(client)
    }

    /// Full URL events are posted to.
    pub fn events_url(&self) -> &str {
        &self.events_url
    }
}

#[async_trait]
impl EventSink for DatadogClient {
    async fn submit_event(&self, event: &DiagnosticEvent) -> MonitorResult<()> {
        let payload = EventPayload {
            title: &event.title,
            text: &event.text,
            aggregation_key: &event.aggregation_key,
            host: &event.host,
            alert_type: &self.alert_type,
            tags: &self.tags,
        };

        let response = self
            .http
            .post(&self.events_url)
            .header(API_KEY_HEADER, &self.api_key)
            .header(APPLICATION_KEY_HEADER, &self.application_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MonitorError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(
            aggregation_key = %event.aggregation_key,
            status = %status,
            "Event submitted to Datadog"
        );
        Ok(())
    }
}

impl std::fmt::Debug for DatadogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatadogClient")
            .field("events_url", &self.events_url)
            .field("alert_type", &self.alert_type)
            .field("tags", &self.tags)
            .finish()
    }
}
