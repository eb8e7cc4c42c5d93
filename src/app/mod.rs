//! Downstream application contract.
//!
//! # Data Flow
//! ```text
//! host (http/server.rs)
//!     → context.rs (RequestContext: environment + buffered input)
//!     → Application::call(ctx, start)
//!         → start.rs (StartResponse: status line + headers, once)
//!         → body.rs (AppBody: lazy chunk stream + optional disposer)
//!     → error.rs (AppError: kind, message, causes, backtrace)
//! ```
//!
//! # Design Decisions
//! - The body is a stream, never a buffer; chunks are produced on demand
//! - The disposer is an explicit capability, not a naming convention
//! - Errors are captured as values at the throw site and passed along explicitly

pub mod body;
pub mod context;
pub mod error;
pub mod start;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

pub use body::{AppBody, ChunkStream, Close};
pub use context::{local_hostname, RequestContext, HOSTNAME_KEY};
pub use error::{AppError, ApplicationFailure, PANIC_KIND};
pub use start::{Header, ResponseHead, StartError, StartResponse, StartedHead};

/// A request handler producing a lazily streamed body.
///
/// `call` may invoke `start` before returning the body or while the body is
/// being produced. Errors can surface either from `call` itself or from any
/// item of the returned stream.
#[async_trait]
pub trait Application: Send + Sync + 'static {
    async fn call(
        &self,
        ctx: RequestContext,
        start: Arc<dyn StartResponse>,
    ) -> Result<AppBody, AppError>;
}

#[async_trait]
impl<A: Application> Application for Arc<A> {
    async fn call(
        &self,
        ctx: RequestContext,
        start: Arc<dyn StartResponse>,
    ) -> Result<AppBody, AppError> {
        self.as_ref().call(ctx, start).await
    }
}

/// Application backed by an async closure. Built with [`from_fn`].
#[derive(Clone)]
pub struct FnApplication<F> {
    f: F,
}

/// Wrap an async closure as an [`Application`].
pub fn from_fn<F, Fut>(f: F) -> FnApplication<F>
where
    F: Fn(RequestContext, Arc<dyn StartResponse>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<AppBody, AppError>> + Send + 'static,
{
    FnApplication { f }
}

#[async_trait]
impl<F, Fut> Application for FnApplication<F>
where
    F: Fn(RequestContext, Arc<dyn StartResponse>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<AppBody, AppError>> + Send + 'static,
{
    async fn call(
        &self,
        ctx: RequestContext,
        start: Arc<dyn StartResponse>,
    ) -> Result<AppBody, AppError> {
        (self.f)(ctx, start).await
    }
}
