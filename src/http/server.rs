//! HTTP server hosting an intercepted application.
//!
//! # Responsibilities
//! - Create Axum Router that sends every path through the interceptor
//! - Wire up middleware (tracing, request timeout)
//! - Translate requests into a RequestContext (CGI-style environment + body)
//! - Translate the declared head and relayed chunks into a streaming response
//!
//! # Failure Rendering
//! - Error before the first chunk: nothing was sent yet, so the response is a
//!   plain `500 Internal Server Error`
//! - Error after the first chunk: the status line is already out; the body
//!   stream ends with an error and hyper aborts the connection

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, request::Parts, HeaderName, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use futures_util::stream::{self, StreamExt};
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::app::{AppError, Application, RequestContext, ResponseHead, StartedHead};
use crate::config::MiddlewareConfig;
use crate::interceptor::{error_headers, Interceptor, ERROR_STATUS};

/// Application state injected into the dispatch handler.
struct HostState<A> {
    interceptor: Interceptor<A>,
    max_body_bytes: usize,
}

impl<A> Clone for HostState<A> {
    fn clone(&self) -> Self {
        Self {
            interceptor: self.interceptor.clone(),
            max_body_bytes: self.max_body_bytes,
        }
    }
}

/// HTTP server for an intercepted application.
pub struct HttpServer {
    router: Router,
    config: MiddlewareConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new<A: Application>(interceptor: Interceptor<A>, config: MiddlewareConfig) -> Self {
        let state = HostState {
            interceptor,
            max_body_bytes: config.listener.max_body_bytes,
        };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router<A: Application>(config: &MiddlewareConfig, state: HostState<A>) -> Router {
        Router::new()
            .route("/", any(dispatch::<A>))
            .route("/{*path}", any(dispatch::<A>))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.listener.request_timeout_secs,
            )))
            .layer(TraceLayer::new_for_http())
    }

    /// The router, for embedding or driving directly.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` resolves.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &MiddlewareConfig {
        &self.config
    }
}

/// Serve one request through the interceptor.
async fn dispatch<A: Application>(State(state): State<HostState<A>>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let ctx = request_context(&parts);

    let input = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, path = %parts.uri.path(), "Rejected request body");
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    let head = Arc::new(ResponseHead::new());
    let mut relay = state.interceptor.handle(ctx.with_input(input), head.clone());

    // Drive the application until it has declared its head and produced
    // its first chunk, or failed.
    let first = relay.next().await;

    match (first, head.started()) {
        (Some(Err(err)), _) => {
            tracing::debug!(error = %err, "Request failed before any output");
            error_response()
        }
        (None, Some(started)) => build_response(&started, Body::empty()),
        (Some(Ok(chunk)), Some(started)) => {
            let chunks = stream::iter([Ok(chunk)])
                .chain(relay)
                .map(|item| item.map_err(AppError::into_std));
            build_response(&started, Body::from_stream(chunks))
        }
        (_, None) => {
            tracing::warn!(path = %parts.uri.path(), "Application produced a body without starting a response");
            error_response()
        }
    }
}

/// CGI-style environment for a request.
pub fn request_context(parts: &Parts) -> RequestContext {
    let mut ctx = RequestContext::new()
        .with_var("REQUEST_METHOD", parts.method.as_str())
        .with_var("SCRIPT_NAME", "")
        .with_var("PATH_INFO", parts.uri.path())
        .with_var("QUERY_STRING", parts.uri.query().unwrap_or(""))
        .with_var("SERVER_PROTOCOL", format!("{:?}", parts.version));

    if let Some(ConnectInfo(addr)) = parts.extensions.get::<ConnectInfo<SocketAddr>>() {
        ctx.insert("REMOTE_ADDR", addr.ip().to_string());
        ctx.insert("REMOTE_PORT", addr.port().to_string());
    }

    for name in parts.headers.keys() {
        let value = parts
            .headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect::<Vec<_>>()
            .join(",");

        let key = if *name == header::CONTENT_TYPE {
            "CONTENT_TYPE".to_string()
        } else if *name == header::CONTENT_LENGTH {
            "CONTENT_LENGTH".to_string()
        } else {
            format!("HTTP_{}", name.as_str().to_ascii_uppercase().replace('-', "_"))
        };
        ctx.insert(key, value);
    }

    if let Some(host) = parts.headers.get(header::HOST).and_then(|v| v.to_str().ok()) {
        let server_name = host.rsplit_once(':').map_or(host, |(name, _)| name);
        ctx.insert("SERVER_NAME", server_name);
    }

    ctx
}

/// Convert a declared head into a response around `body`.
pub fn build_response(started: &StartedHead, body: Body) -> Response {
    let status = started
        .status_code()
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let mut response = Response::new(body);
    *response.status_mut() = status;

    for (name, value) in &started.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                response.headers_mut().append(name, value);
            }
            _ => tracing::warn!(header = %name, "Dropping invalid response header"),
        }
    }

    response
}

fn error_response() -> Response {
    let started = StartedHead {
        status: ERROR_STATUS.to_string(),
        headers: error_headers(),
    };
    build_response(&started, Body::from("Internal Server Error"))
}

/// Resolves on Ctrl+C.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
