//! Durable event storage and aggregation.
//!
//! Events land in append-only JSON-lines segment files, one per UTC day,
//! with a persisted rollup index of per-day counters maintained at write
//! time. Aggregation combines rollup counters for whole days with raw scans
//! bounded to the requested window.

pub mod aggregate;
pub mod config;
pub mod log;
pub mod rollup;
pub mod store;

pub use aggregate::{AggregateSnapshot, Aggregator};
pub use config::StoreConfig;
pub use rollup::{DayRollup, RangeCounts, RollupIndex};
pub use store::{EventStore, ScanIter};
