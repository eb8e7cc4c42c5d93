//! The per-request relay stream.
//!
//! # States
//! ```text
//! Calling ──ok──▶ Streaming ──end──▶ Done
//!    │               │
//!    └──err──┐  ┌─err┘
//!            ▼  ▼
//!          Reporting ──submitted──▶ Done (yields the original error)
//! ```
//!
//! The body is released when the relay reaches `Done` and again, as a no-op,
//! when the relay is dropped. A relay dropped mid-stream releases it there.
//!
//! A panic while calling the application or polling its body counts as a
//! failure: it is caught, reported like any other error and yielded as an
//! [`AppError`] of kind `Panic`.

use std::fmt;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};

use bytes::Bytes;
use futures_util::future::BoxFuture;
use futures_util::stream::{FusedStream, Stream, StreamExt};
use futures_util::FutureExt;

use crate::app::{AppBody, AppError, Header, StartError, StartResponse};
use crate::monitor::{DiagnosticEvent, EventSink};
use crate::observability::metrics;

/// Status line declared when the application fails.
pub const ERROR_STATUS: &str = "500 INTERNAL SERVER ERROR";

/// Headers declared when the application fails.
pub fn error_headers() -> Vec<Header> {
    vec![("Content-Type".to_string(), "text/plain".to_string())]
}

enum State {
    Calling(BoxFuture<'static, Result<AppBody, AppError>>),
    Streaming,
    Reporting(BoxFuture<'static, ()>),
    Done,
}

/// Stream returned by [`Interceptor::handle`](crate::Interceptor::handle).
///
/// Yields the application's chunks unchanged. If the application fails, the
/// last item is the original error, after the failure has been reported.
#[must_use = "streams do nothing unless polled"]
pub struct Relay {
    state: State,
    body: Option<AppBody>,
    failure: Option<AppError>,
    host: String,
    sink: Arc<dyn EventSink>,
    start: Arc<dyn StartResponse>,
}

impl Relay {
    pub(crate) fn new(
        call: BoxFuture<'static, Result<AppBody, AppError>>,
        host: String,
        sink: Arc<dyn EventSink>,
        start: Arc<dyn StartResponse>,
    ) -> Self {
        Self {
            state: State::Calling(call),
            body: None,
            failure: None,
            host,
            sink,
            start,
        }
    }

    /// Capture a failure and begin reporting it.
    fn fail(&mut self, err: AppError) {
        let event = DiagnosticEvent::from_error(&err, self.host.clone());

        tracing::error!(
            kind = %err.kind(),
            message = %err.message(),
            aggregation_key = %event.aggregation_key,
            host = %event.host,
            "Application raised an unhandled error"
        );
        metrics::record_error_captured(err.kind());

        let sink = self.sink.clone();
        self.state = State::Reporting(
            async move {
                match sink.submit_event(&event).await {
                    Ok(()) => metrics::record_event_submitted(),
                    Err(e) => {
                        tracing::error!(
                            error = %e,
                            title = %event.title,
                            "Failed to submit diagnostic event"
                        );
                        metrics::record_submit_failure();
                    }
                }
            }
            .boxed(),
        );
        self.failure = Some(err);
    }

    /// Declare the error status. Always issued, even after an earlier start.
    fn declare_error_status(&self) {
        match self.start.start(ERROR_STATUS, &error_headers()) {
            Ok(()) => {}
            Err(StartError::AlreadyStarted(status)) => {
                tracing::debug!(
                    previous_status = %status,
                    "Response already started; error status not applied"
                );
            }
            Err(e) => tracing::warn!(error = %e, "Error status was refused"),
        }
    }

    /// Run the body's disposer, if any. Idempotent.
    fn release(&mut self) {
        if let Some(body) = self.body.as_mut() {
            body.close();
        }
    }

    fn finish(&mut self) {
        self.release();
        self.state = State::Done;
    }
}

impl Stream for Relay {
    type Item = Result<Bytes, AppError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        loop {
            match &mut this.state {
                State::Calling(call) => {
                    match catch_unwind(AssertUnwindSafe(|| call.as_mut().poll(cx))) {
                        Ok(Poll::Pending) => return Poll::Pending,
                        Ok(Poll::Ready(Ok(body))) => {
                            this.body = Some(body);
                            this.state = State::Streaming;
                        }
                        Ok(Poll::Ready(Err(err))) => this.fail(err),
                        Err(payload) => this.fail(AppError::from_panic(payload)),
                    }
                }
                State::Streaming => {
                    let Some(body) = this.body.as_mut() else {
                        this.finish();
                        continue;
                    };
                    match catch_unwind(AssertUnwindSafe(|| body.poll_next_unpin(cx))) {
                        Ok(Poll::Pending) => return Poll::Pending,
                        Ok(Poll::Ready(Some(Ok(chunk)))) => return Poll::Ready(Some(Ok(chunk))),
                        Ok(Poll::Ready(Some(Err(err)))) => this.fail(err),
                        Ok(Poll::Ready(None)) => {
                            this.finish();
                            return Poll::Ready(None);
                        }
                        Err(payload) => this.fail(AppError::from_panic(payload)),
                    }
                }
                State::Reporting(submit) => {
                    ready!(submit.as_mut().poll(cx));
                    this.declare_error_status();
                    this.finish();
                    return Poll::Ready(this.failure.take().map(Err));
                }
                State::Done => return Poll::Ready(None),
            }
        }
    }
}

impl FusedStream for Relay {
    fn is_terminated(&self) -> bool {
        matches!(self.state, State::Done)
    }
}

impl Drop for Relay {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Relay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            State::Calling(_) => "calling",
            State::Streaming => "streaming",
            State::Reporting(_) => "reporting",
            State::Done => "done",
        };
        f.debug_struct("Relay")
            .field("state", &state)
            .field("host", &self.host)
            .finish()
    }
}
