//! Background maintenance for the event store: rollup index flushing,
//! periodic reconciliation against the raw log, and optional retention
//! pruning. All of it is maintenance — never part of request handling.

pub mod reconcile;
pub mod retention;
pub mod scheduler;

pub use reconcile::ReconcileWorker;
pub use retention::RetentionWorker;
pub use scheduler::{WorkerConfig, WorkerScheduler};
