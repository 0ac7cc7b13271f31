//! Observability for the output host
//!
//! - Structured logging through `tracing`, keyed by a stable `Event` name
//! - Ack manager metrics behind the `AckMetrics` capability
//!
//! Nothing here is allowed to take the output host down: a logging setup
//! failure is reported and the process carries on without a subscriber.
//!
//! # Usage
//!
//! ```ignore
//! use outputhost::observability::{AckMetrics, Event, MetricsRegistry};
//!
//! tracing::info!(event = %Event::AckMgrStarted, "ack manager started");
//!
//! let metrics = MetricsRegistry::new();
//! metrics.seq_not_found();
//! ```

mod events;
mod logging;
mod metrics;

pub use events::Event;
pub use logging::{init_logging, LogSettings, LoggingError};
pub use metrics::{AckMetrics, MetricsRegistry, MetricsSnapshot};
