//! Common test setup functions.

use api::{router, AppState};
use axum::Router;
use eventstore::{EventStore, StoreConfig};
use tempfile::TempDir;

/// Test context with the real router over a temp-dir store.
///
/// Exercises the production code paths: the full Axum router with all
/// layers, the real normalizer, and a real (throwaway) event store.
pub struct TestContext {
    /// Keeps the data dir alive for the test's duration
    pub data_dir: TempDir,
    pub store: EventStore,
    pub router: Router,
}

impl TestContext {
    /// Create a new test context with all components initialized.
    pub fn new() -> Self {
        let data_dir = tempfile::tempdir().expect("Failed to create temp data dir");

        let store = EventStore::open(StoreConfig {
            data_dir: data_dir.path().to_path_buf(),
            fsync: false,
        })
        .expect("Failed to open event store");

        telemetry::health().store.set_healthy();

        let state = AppState::new(store.clone());
        let router = router(state);

        Self {
            data_dir,
            store,
            router,
        }
    }

    /// Count of events the store has accepted.
    pub fn stored_event_count(&self) -> u64 {
        self.store.totals().0
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
