//! Prometheus metrics and structured logging for coinboard.
//!
//! - Prometheus metrics for page fetches, merges, live deltas and the feed
//! - Structured logging with tracing (JSON in production, pretty otherwise)

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, TelemetryConfig};
pub use metrics::{gather_text, Metrics};
