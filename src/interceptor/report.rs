//! Turning a captured [`AppError`] into a [`DiagnosticEvent`].

use sha2::{Digest, Sha224};

use crate::app::AppError;
use crate::monitor::DiagnosticEvent;

/// First line of every rendered trace.
pub const TRACE_HEADER: &str = "Stack backtrace (most recent call first):";

/// `Internal Server Error (<kind>: <message>)`
pub fn event_title(err: &AppError) -> String {
    format!("Internal Server Error ({})", err.summary())
}

/// Lowercase hex SHA-224 of the title.
pub fn aggregation_key(title: &str) -> String {
    hex::encode(Sha224::digest(title.as_bytes()))
}

/// Trace lines: header, frames, causes, then the `<kind>: <message>` summary.
pub fn trace_lines(err: &AppError) -> Vec<String> {
    let mut lines = vec![TRACE_HEADER.to_string()];
    lines.extend(err.frames());
    lines.extend(err.causes().iter().map(|cause| format!("Caused by: {cause}")));
    lines.push(err.summary());
    lines
}

impl DiagnosticEvent {
    /// Build the report for a failure observed on `host`.
    pub fn from_error(err: &AppError, host: impl Into<String>) -> Self {
        let title = event_title(err);
        Self {
            aggregation_key: aggregation_key(&title),
            text: trace_lines(err).join("\n"),
            host: host.into(),
            title,
        }
    }
}
