//! Error-reporting interceptor.
//!
//! # Data Flow
//! ```text
//! host calls Interceptor::handle(ctx, start)
//!     → relay.rs (Relay stream, lazy)
//!         → Application::call(ctx, start)       (first poll)
//!         → chunks relayed one by one           (consumer sets the pace)
//!         → on error:
//!             → report.rs (title, SHA-224 aggregation key, trace text)
//!             → EventSink::submit_event          (failure logged, not raised)
//!             → start("500 INTERNAL SERVER ERROR", text/plain)
//!             → original error yielded as last item
//!         → body disposer run once, on every exit path
//! ```
//!
//! # Design Decisions
//! - Stateless across requests; one instance serves any number of concurrent calls
//! - Observes and reports, never recovers: every error reaches the caller unchanged
//! - The interceptor is itself an Application, so wrappers nest

pub mod relay;
pub mod report;

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::FutureExt;

use crate::app::{AppBody, AppError, Application, RequestContext, StartResponse};
use crate::config::{ConfigError, DatadogConfig, ReportingConfig};
use crate::monitor::{DatadogClient, EventSink};

pub use relay::{error_headers, Relay, ERROR_STATUS};
pub use report::{aggregation_key, event_title, trace_lines};

/// Wraps an application and reports its unhandled errors.
pub struct Interceptor<A> {
    app: Arc<A>,
    sink: Arc<dyn EventSink>,
    host: Option<String>,
}

impl<A> Clone for Interceptor<A> {
    fn clone(&self) -> Self {
        Self {
            app: self.app.clone(),
            sink: self.sink.clone(),
            host: self.host.clone(),
        }
    }
}

impl<A: Application> Interceptor<A> {
    /// Wrap `app`, reporting to Datadog.
    ///
    /// Fails immediately if either credential is missing.
    pub fn new(app: A, config: &DatadogConfig) -> Result<Self, ConfigError> {
        let client = DatadogClient::from_config(config)?;
        Ok(Self::with_sink(app, Arc::new(client)))
    }

    /// Wrap `app`, reporting to an arbitrary sink.
    pub fn with_sink(app: A, sink: Arc<dyn EventSink>) -> Self {
        Self {
            app: Arc::new(app),
            sink,
            host: None,
        }
    }

    /// Report every event as coming from `host` instead of the request's hostname.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Apply reporting settings from configuration.
    pub fn with_reporting(self, config: &ReportingConfig) -> Self {
        match &config.host {
            Some(host) if !host.trim().is_empty() => self.with_host(host.trim()),
            _ => self,
        }
    }

    /// The wrapped application.
    pub fn app(&self) -> &A {
        &self.app
    }

    /// Handle one request. Nothing runs until the returned stream is polled.
    pub fn handle(&self, ctx: RequestContext, start: Arc<dyn StartResponse>) -> Relay {
        let host = match &self.host {
            Some(host) => host.clone(),
            None => ctx.hostname(),
        };

        let app = self.app.clone();
        let downstream = start.clone();
        let call = async move { app.call(ctx, downstream).await }.boxed();

        Relay::new(call, host, self.sink.clone(), start)
    }
}

#[async_trait]
impl<A: Application> Application for Interceptor<A> {
    async fn call(
        &self,
        ctx: RequestContext,
        start: Arc<dyn StartResponse>,
    ) -> Result<AppBody, AppError> {
        Ok(AppBody::new(self.handle(ctx, start)))
    }
}
