//! Monitoring types and the sink abstraction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A failure report sent to the monitoring service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticEvent {
    /// `Internal Server Error (<kind>: <message>)`
    pub title: String,
    /// Fingerprint of the title, used to group recurring failures.
    pub aggregation_key: String,
    /// Rendered backtrace.
    pub text: String,
    /// Origin host.
    pub host: String,
}

/// Errors from submitting an event.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("monitoring API rejected event with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("{0}")]
    Other(String),
}

/// Result type for monitoring operations.
pub type MonitorResult<T> = Result<T, MonitorError>;

/// Destination for diagnostic events.
///
/// One sink is shared by every in-flight request.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn submit_event(&self, event: &DiagnosticEvent) -> MonitorResult<()>;
}
