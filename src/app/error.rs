//! Captured application errors.
//!
//! An [`AppError`] is created where the failure happens (explicitly or via `?`)
//! and carries everything needed to report it later: a kind, a message, the
//! messages of its source chain and a backtrace taken at construction.

use std::any::{type_name, Any};
use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error as StdError;
use std::fmt;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Kind given to errors built from caught panics.
pub const PANIC_KIND: &str = "Panic";

/// Error raised by a downstream application.
///
/// Deliberately not a `std::error::Error` itself so that every error type can
/// convert into it with `?`. Use [`AppError::into_std`] where a standard error
/// is required.
pub struct AppError {
    kind: String,
    message: String,
    causes: Vec<String>,
    backtrace: Backtrace,
    inner: Option<BoxError>,
}

impl AppError {
    /// Create an error from an explicit kind and message.
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            causes: Vec::new(),
            backtrace: Backtrace::force_capture(),
            inner: None,
        }
    }

    /// Error for a panic caught while running the application.
    ///
    /// The kind is `Panic`; the message is the panic payload when it is a string.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&'static str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "Box<dyn Any>".to_string()
        };
        Self::new(PANIC_KIND, message)
    }

    /// Short name of the error type, e.g. `ParseIntError` or `io::Error`.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Messages of the source chain, outermost first.
    pub fn causes(&self) -> &[String] {
        &self.causes
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    /// Backtrace rendered as text lines, most recent call first.
    ///
    /// Empty when the platform could not capture a backtrace.
    pub fn frames(&self) -> Vec<String> {
        if self.backtrace.status() != BacktraceStatus::Captured {
            return Vec::new();
        }
        self.backtrace
            .to_string()
            .lines()
            .map(|line| line.trim_end().to_string())
            .filter(|line| !line.is_empty())
            .collect()
    }

    /// `<kind>: <message>`
    pub fn summary(&self) -> String {
        format!("{}: {}", self.kind, self.message)
    }

    /// The original error, when this one was converted from a typed error.
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.inner.as_deref().and_then(|e| e.downcast_ref::<E>())
    }

    /// Wrap as a standard error for transports that require one.
    pub fn into_std(self) -> ApplicationFailure {
        ApplicationFailure(self)
    }
}

impl<E> From<E> for AppError
where
    E: StdError + Send + Sync + 'static,
{
    fn from(err: E) -> Self {
        let mut causes = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }

        Self {
            kind: short_type_name::<E>(),
            message: err.to_string(),
            causes,
            backtrace: Backtrace::force_capture(),
            inner: Some(Box::new(err)),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl fmt::Debug for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppError")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .field("causes", &self.causes)
            .finish()
    }
}

/// An [`AppError`] re-raised through a `std::error::Error` channel.
#[derive(Debug)]
pub struct ApplicationFailure(pub AppError);

impl ApplicationFailure {
    pub fn into_inner(self) -> AppError {
        self.0
    }
}

impl fmt::Display for ApplicationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl StdError for ApplicationFailure {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0
            .inner
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

/// Last path segment of a type name, without generic arguments.
///
/// A type that is just called `Error` keeps the nearest module that names it,
/// so `std::io::error::Error` becomes `io::Error`.
fn short_type_name<T: ?Sized>() -> String {
    let full = type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    let mut segments = base.rsplit("::");
    let last = segments.next().unwrap_or(base);
    if last != "Error" {
        return last.to_string();
    }
    match segments.find(|segment| *segment != "error") {
        Some(module) => format!("{module}::{last}"),
        None => last.to_string(),
    }
}
