//! Application state shared across handlers.

use eventstore::{AggregateSnapshot, Aggregator, EventStore};
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cached snapshots kept per (range, hostname) key.
const SNAPSHOT_CACHE_MAX_CAPACITY: u64 = 64;

/// HTTP layer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Budget for one aggregation before falling back to a cached
    /// snapshot (seconds). Deployment parameter, not a core invariant.
    #[serde(default = "default_aggregate_timeout_secs")]
    pub aggregate_timeout_secs: u64,
    /// How long a computed snapshot stays usable as a timeout fallback
    /// (seconds).
    #[serde(default = "default_snapshot_ttl_secs")]
    pub snapshot_ttl_secs: u64,
}

fn default_aggregate_timeout_secs() -> u64 {
    10
}

fn default_snapshot_ttl_secs() -> u64 {
    300
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            aggregate_timeout_secs: default_aggregate_timeout_secs(),
            snapshot_ttl_secs: default_snapshot_ttl_secs(),
        }
    }
}

impl ApiConfig {
    pub fn aggregate_timeout(&self) -> Duration {
        Duration::from_secs(self.aggregate_timeout_secs)
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Durable event log + rollups
    pub store: EventStore,
    /// Snapshot computation over the store
    pub aggregator: Aggregator,
    /// Last successful snapshot per query key; served only when a fresh
    /// aggregation exceeds its timeout
    pub snapshot_cache: Cache<String, AggregateSnapshot>,
    pub config: ApiConfig,
}

impl AppState {
    pub fn new(store: EventStore) -> Self {
        Self::with_config(store, ApiConfig::default())
    }

    /// Create with custom API config.
    pub fn with_config(store: EventStore, config: ApiConfig) -> Self {
        let aggregator = Aggregator::new(store.clone());
        let snapshot_cache = Cache::builder()
            .max_capacity(SNAPSHOT_CACHE_MAX_CAPACITY)
            .time_to_live(Duration::from_secs(config.snapshot_ttl_secs.max(1)))
            .build();

        Self {
            store,
            aggregator,
            snapshot_cache,
            config,
        }
    }
}
