//! Observability
//!
//! Logging, metrics, and the per-session JSONL event log.

pub mod events;
pub mod logging;
pub mod metrics;

pub use events::{EndReason, Event, EventEmitter};
pub use logging::{LogFormat, init_logging};
pub use metrics::init_metrics;
