//! Shared utilities for integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::Poll;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, StreamExt};

use ddmiddleware::app::{self, AppBody, AppError, Application, Header, StartResponse};
use ddmiddleware::monitor::{DiagnosticEvent, EventSink, MonitorError, MonitorResult};

/// Sink that keeps every submitted event in memory.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<DiagnosticEvent>>,
    fail: bool,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A sink that records the event and then reports a submission failure.
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
            fail: true,
        })
    }

    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn submit_event(&self, event: &DiagnosticEvent) -> MonitorResult<()> {
        self.events.lock().unwrap().push(event.clone());
        if self.fail {
            return Err(MonitorError::Other("monitoring backend unavailable".to_string()));
        }
        Ok(())
    }
}

/// What a scripted application does for every request.
#[derive(Clone)]
pub struct Script {
    /// Status declared before returning the body. `None` skips the start call.
    pub status: Option<&'static str>,
    /// Chunks produced before the failure (or before the end).
    pub chunks: Vec<&'static str>,
    /// Error raised after `chunks`, as `(kind, message)`.
    pub fail_with: Option<(&'static str, &'static str)>,
    /// Panic with this message after `chunks` instead of returning an error.
    pub panic_with: Option<&'static str>,
    /// Fail from `call` itself instead of from the body.
    pub fail_on_call: bool,
    /// Attach a disposer to the body.
    pub closeable: bool,
}

impl Script {
    pub fn ok(chunks: Vec<&'static str>) -> Self {
        Self {
            status: Some("200 OK"),
            chunks,
            fail_with: None,
            panic_with: None,
            fail_on_call: false,
            closeable: true,
        }
    }

    pub fn failing_after(chunks: Vec<&'static str>, kind: &'static str, message: &'static str) -> Self {
        Self {
            fail_with: Some((kind, message)),
            ..Self::ok(chunks)
        }
    }

    pub fn panicking_after(chunks: Vec<&'static str>, message: &'static str) -> Self {
        Self {
            panic_with: Some(message),
            ..Self::ok(chunks)
        }
    }
}

/// Application that follows a [`Script`] and counts disposer runs.
pub struct ScriptedApp {
    script: Script,
    pub closes: Arc<AtomicUsize>,
    pub calls: Arc<AtomicUsize>,
}

impl ScriptedApp {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            closes: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Application for ScriptedApp {
    async fn call(
        &self,
        _ctx: app::RequestContext,
        start: Arc<dyn StartResponse>,
    ) -> Result<AppBody, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let (true, Some(message)) = (self.script.fail_on_call, self.script.panic_with) {
            panic!("{message}");
        }

        if self.script.fail_on_call {
            let (kind, message) = self.script.fail_with.unwrap_or(("RuntimeError", "call failed"));
            return Err(AppError::new(kind, message));
        }

        if let Some(status) = self.script.status {
            start.start(status, &[plain_text()])?;
        }

        let mut items: Vec<Result<Bytes, AppError>> = self
            .script
            .chunks
            .iter()
            .map(|chunk| Ok(Bytes::from_static(chunk.as_bytes())))
            .collect();
        if let Some((kind, message)) = self.script.fail_with {
            items.push(Err(AppError::new(kind, message)));
        }

        let chunks = stream::iter(items);
        let body = match self.script.panic_with {
            Some(message) => AppBody::new(chunks.chain(stream::poll_fn(
                move |_| -> Poll<Option<Result<Bytes, AppError>>> { panic!("{message}") },
            ))),
            None => AppBody::new(chunks),
        };
        if self.script.closeable {
            let closes = self.closes.clone();
            Ok(body.with_close(move || {
                closes.fetch_add(1, Ordering::SeqCst);
            }))
        } else {
            Ok(body)
        }
    }
}

pub fn plain_text() -> Header {
    ("Content-Type".to_string(), "text/plain".to_string())
}
