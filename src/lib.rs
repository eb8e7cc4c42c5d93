//! Error-reporting middleware for streaming web applications.
//!
//! [`Interceptor`] wraps an [`Application`], relays its response body chunk by
//! chunk, and when the application fails, submits a diagnostic event to
//! Datadog, declares a `500` status and hands the original error back.

pub mod app;
pub mod config;
pub mod http;
pub mod interceptor;
pub mod monitor;
pub mod observability;

pub use app::{AppBody, AppError, Application, RequestContext, ResponseHead, StartResponse};
pub use config::schema::MiddlewareConfig;
pub use http::HttpServer;
pub use interceptor::{Interceptor, Relay};
pub use monitor::{DatadogClient, DiagnosticEvent, EventSink};
