//! Internal telemetry for the Beacon collector.
//!
//! Swallowed ingestion rejects are invisible to trackers by design; the
//! counters here are where they become discoverable again, via `/metrics`.

pub mod health;
pub mod metrics;
pub mod tracing_setup;

pub use health::*;
pub use metrics::*;
pub use tracing_setup::*;
