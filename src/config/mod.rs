//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize, DD_API_KEY / DD_APP_KEY overrides)
//!     → validation.rs (semantic checks)
//!     → MiddlewareConfig (validated, immutable)
//!     → DatadogConfig handed to Interceptor::new
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs; credentials have none
//! - Missing credentials fail at construction time, never at request time

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{DatadogConfig, ListenerConfig, MiddlewareConfig, ObservabilityConfig, ReportingConfig};
pub use validation::ValidationError;
