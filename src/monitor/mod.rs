//! Monitoring collaborator.
//!
//! # Data Flow
//! ```text
//! interceptor (failure captured)
//!     → DiagnosticEvent { title, aggregation_key, text, host }
//!     → EventSink::submit_event
//!         → client.rs (DatadogClient: POST /api/v1/events)
//! ```
//!
//! # Design Decisions
//! - The sink is a trait so hosts and tests can plug in any backend
//! - Credentials are checked when the client is built, never per request
//! - Submission failures are returned, never panicked; the caller decides policy

pub mod client;
pub mod types;

pub use client::DatadogClient;
pub use types::{DiagnosticEvent, EventSink, MonitorError, MonitorResult};
