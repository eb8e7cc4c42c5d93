//! HTTP hosting subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, TraceLayer, TimeoutLayer)
//!     → request → RequestContext (CGI-style environment, buffered body)
//!     → Interceptor::handle → Relay
//!     → first item decides the response head
//!     → remaining chunks streamed with Body::from_stream
//! ```

pub mod server;

pub use server::{build_response, request_context, shutdown_signal, HttpServer};
