//! Rollup reconciliation worker.
//!
//! Rollup buckets are updated incrementally at write time and flushed on a
//! short cadence; this worker periodically re-verifies every bucket against
//! its segment's byte watermark, replaying or rebuilding days that drifted
//! (crash between write and flush, external segment tampering).

use eventstore::EventStore;
use tracing::{debug, warn};

use beacon_core::Result;

/// Worker that keeps the rollup index consistent with the raw log.
pub struct ReconcileWorker {
    store: EventStore,
}

impl ReconcileWorker {
    pub fn new(store: EventStore) -> Self {
        Self { store }
    }

    /// Persists pending rollup updates.
    pub fn flush(&self) -> Result<()> {
        self.store.flush()
    }

    /// Full verification pass over all day buckets.
    pub fn run(&self) -> Result<()> {
        debug!("Running rollup reconciliation");
        if let Err(e) = self.store.reconcile() {
            warn!(error = %e, "Rollup reconciliation failed");
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use eventstore::StoreConfig;

    #[test]
    fn test_reconcile_rebuilds_dropped_index() {
        let dir = tempfile::tempdir().unwrap();
        let store = EventStore::open(StoreConfig {
            data_dir: dir.path().to_path_buf(),
            fsync: false,
        })
        .unwrap();

        let ts = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();
        store
            .append_blocking(beacon_core::Event {
                id: 0,
                timestamp: ts,
                received_at: ts,
                visitor_id: "v1".into(),
                session_id: "s1".into(),
                url: String::new(),
                path: "/".into(),
                hostname: String::new(),
                referrer: String::new(),
                title: String::new(),
                browser: String::new(),
                os: String::new(),
                device_type: String::new(),
                user_agent: None,
                screen_width: None,
                screen_height: None,
                viewport_width: None,
                viewport_height: None,
                language: None,
                timezone: None,
                ip: None,
                data: beacon_core::EventData::Pageview,
            })
            .unwrap();

        let worker = ReconcileWorker::new(store.clone());
        worker.run().unwrap();

        let (events, days) = store.totals();
        assert_eq!((events, days), (1, 1));
    }
}
