//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! interceptor / monitor / http produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters for captured failures and submissions)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```

pub mod logging;
pub mod metrics;
