//! Retention worker for segment-based data deletion.
//!
//! Instead of rewriting log files record by record, this worker drops whole
//! day segments older than the retention period. Rollup buckets for pruned
//! days are kept, so all-time counts stay accurate after pruning.

use chrono::{Duration, Utc};
use eventstore::EventStore;
use tracing::{debug, info};

use beacon_core::Result;

/// Worker that enforces the retention policy by dropping old segments.
pub struct RetentionWorker {
    store: EventStore,
    retention_days: u32,
}

impl RetentionWorker {
    pub fn new(store: EventStore, retention_days: u32) -> Self {
        Self {
            store,
            retention_days,
        }
    }

    /// Drops segments older than the retention window.
    pub fn run(&self) -> Result<usize> {
        let cutoff = Utc::now().date_naive() - Duration::days(self.retention_days as i64);

        debug!(%cutoff, retention_days = self.retention_days, "Running retention check");
        let pruned = self.store.prune_before(cutoff)?;

        if pruned > 0 {
            info!(%cutoff, pruned, "Retention pruning complete");
        }
        Ok(pruned)
    }
}
