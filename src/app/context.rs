//! Per-request environment handed to applications.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::sync::OnceLock;

use bytes::Bytes;

/// Context entry that overrides the reported origin host.
pub const HOSTNAME_KEY: &str = "HOSTNAME";

/// CGI-style request environment plus the buffered request body.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    environ: BTreeMap<String, String>,
    input: Bytes,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style variant of [`RequestContext::insert`].
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn with_input(mut self, input: impl Into<Bytes>) -> Self {
        self.input = input.into();
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.environ.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.environ.get(key).map(String::as_str)
    }

    pub fn environ(&self) -> &BTreeMap<String, String> {
        &self.environ
    }

    pub fn input(&self) -> &Bytes {
        &self.input
    }

    /// Host to tag diagnostic events with.
    ///
    /// The `HOSTNAME` entry wins when present; otherwise the local machine name.
    pub fn hostname(&self) -> String {
        match self.get(HOSTNAME_KEY) {
            Some(host) if !host.trim().is_empty() => host.trim().to_string(),
            _ => local_hostname(),
        }
    }
}

/// Name of the machine this process runs on, resolved once per process.
///
/// Asks the operating system (`gethostname(2)` or its platform equivalent)
/// and settles for `localhost` when the name is empty or not valid UTF-8.
pub fn local_hostname() -> String {
    static LOCAL: OnceLock<String> = OnceLock::new();
    LOCAL
        .get_or_init(|| hostname_or_default(&gethostname::gethostname()))
        .clone()
}

fn hostname_or_default(raw: &OsStr) -> String {
    match raw.to_str().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => "localhost".to_string(),
    }
}
