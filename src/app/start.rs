//! Response-start callback.
//!
//! # Design Decisions
//! - The caller owns the callback; applications and the interceptor only borrow it
//! - [`ResponseHead`] keeps the first declaration and refuses later ones without
//!   side effects, so a second start after headers went out is harmless

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use thiserror::Error;

/// A `(name, value)` response header.
pub type Header = (String, String);

/// Error returned by a response-start callback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StartError {
    /// A response was already started; the new declaration was ignored.
    #[error("response already started with status {0:?}")]
    AlreadyStarted(String),

    #[error("invalid status line {0:?}")]
    InvalidStatus(String),
}

/// Declares the status line and headers of a response.
pub trait StartResponse: Send + Sync {
    fn start(&self, status: &str, headers: &[Header]) -> Result<(), StartError>;
}

impl<F> StartResponse for F
where
    F: Fn(&str, &[Header]) -> Result<(), StartError> + Send + Sync,
{
    fn start(&self, status: &str, headers: &[Header]) -> Result<(), StartError> {
        self(status, headers)
    }
}

/// A declared status line and header set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedHead {
    pub status: String,
    pub headers: Vec<Header>,
}

impl StartedHead {
    /// Numeric code of the status line (`"404 NOT FOUND"` → `404`).
    pub fn status_code(&self) -> Option<u16> {
        let code = self.status.split_whitespace().next()?;
        if code.len() != 3 {
            return None;
        }
        code.parse().ok()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Records the first response start. Later starts are refused and counted.
#[derive(Debug, Default)]
pub struct ResponseHead {
    head: Mutex<Option<StartedHead>>,
    calls: AtomicUsize,
}

impl ResponseHead {
    pub fn new() -> Self {
        Self::default()
    }

    /// The accepted head, if any start happened.
    pub fn started(&self) -> Option<StartedHead> {
        self.head
            .lock()
            .map(|head| head.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn is_started(&self) -> bool {
        self.started().is_some()
    }

    /// Number of start calls, accepted or not.
    pub fn invocations(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl StartResponse for ResponseHead {
    fn start(&self, status: &str, headers: &[Header]) -> Result<(), StartError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut head = self
            .head
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(existing) = head.as_ref() {
            return Err(StartError::AlreadyStarted(existing.status.clone()));
        }

        let started = StartedHead {
            status: status.to_string(),
            headers: headers.to_vec(),
        };
        if started.status_code().is_none() {
            return Err(StartError::InvalidStatus(status.to_string()));
        }
        *head = Some(started);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> Vec<Header> {
        vec![("Content-Type".to_string(), "text/plain".to_string())]
    }

    #[test]
    fn test_first_start_wins() {
        let head = ResponseHead::new();
        assert!(!head.is_started());

        head.start("200 OK", &plain()).unwrap();
        let err = head.start("500 INTERNAL SERVER ERROR", &[]).unwrap_err();

        assert_eq!(err, StartError::AlreadyStarted("200 OK".to_string()));
        assert_eq!(head.invocations(), 2);
        let started = head.started().unwrap();
        assert_eq!(started.status, "200 OK");
        assert_eq!(started.header("content-type"), Some("text/plain"));
    }

    #[test]
    fn test_invalid_status_is_rejected() {
        let head = ResponseHead::new();
        let err = head.start("OK", &[]).unwrap_err();
        assert_eq!(err, StartError::InvalidStatus("OK".to_string()));
        assert!(!head.is_started());

        // A valid declaration is still accepted afterwards.
        head.start("204 NO CONTENT", &[]).unwrap();
        assert_eq!(head.started().unwrap().status_code(), Some(204));
    }

    #[test]
    fn test_status_code_parsing() {
        let head = |status: &str| StartedHead {
            status: status.to_string(),
            headers: Vec::new(),
        };
        assert_eq!(head("500 INTERNAL SERVER ERROR").status_code(), Some(500));
        assert_eq!(head("404").status_code(), Some(404));
        assert_eq!(head("2000 WHAT").status_code(), None);
        assert_eq!(head("").status_code(), None);
    }

    #[test]
    fn test_closure_callback() {
        let seen = Mutex::new(Vec::new());
        let callback = |status: &str, _headers: &[Header]| {
            seen.lock().unwrap().push(status.to_string());
            Ok::<(), StartError>(())
        };
        callback.start("201 CREATED", &[]).unwrap();
        assert_eq!(seen.into_inner().unwrap(), vec!["201 CREATED".to_string()]);
    }
}
