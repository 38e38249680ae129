//! Worker scheduler for background tasks.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info};

use eventstore::EventStore;

use crate::reconcile::ReconcileWorker;
use crate::retention::RetentionWorker;

/// Worker scheduler configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Rollup index flush interval
    pub flush_interval: Duration,
    /// Full reconciliation interval
    pub reconcile_interval: Duration,
    /// Retention check interval
    pub retention_interval: Duration,
    /// Days of raw segments to keep; `None` disables pruning
    pub retention_days: Option<u32>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            flush_interval: Duration::from_secs(5),
            reconcile_interval: Duration::from_secs(3600), // 1 hour
            retention_interval: Duration::from_secs(3600), // 1 hour
            retention_days: None,
        }
    }
}

/// Background worker scheduler.
pub struct WorkerScheduler {
    config: WorkerConfig,
    store: EventStore,
}

impl WorkerScheduler {
    pub fn new(config: WorkerConfig, store: EventStore) -> Self {
        Self { config, store }
    }

    /// Starts all background workers.
    pub fn start(self: Arc<Self>) -> Vec<tokio::task::JoinHandle<()>> {
        let mut handles = Vec::new();

        // Rollup flush worker
        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_flush_worker().await;
        }));

        // Reconciliation worker
        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_reconcile_worker().await;
        }));

        // Retention worker, only when a retention window is configured
        if self.config.retention_days.is_some() {
            let scheduler = self.clone();
            handles.push(tokio::spawn(async move {
                scheduler.run_retention_worker().await;
            }));
        }

        info!(
            retention = ?self.config.retention_days,
            "Background workers started"
        );
        handles
    }

    async fn run_flush_worker(&self) {
        let mut ticker = interval(self.config.flush_interval);

        loop {
            ticker.tick().await;
            let store = self.store.clone();
            let result = tokio::task::spawn_blocking(move || {
                ReconcileWorker::new(store).flush()
            })
            .await;

            match result {
                Ok(Err(e)) => error!(error = %e, "Rollup flush failed"),
                Err(e) => error!(error = %e, "Flush task panicked"),
                Ok(Ok(())) => {}
            }
        }
    }

    async fn run_reconcile_worker(&self) {
        let store = self.store.clone();
        let mut ticker = interval(self.config.reconcile_interval);

        // The first tick fires immediately; skip it, open() just reconciled
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let store = store.clone();
            let result = tokio::task::spawn_blocking(move || {
                ReconcileWorker::new(store).run()
            })
            .await;

            match result {
                Ok(Err(e)) => error!(error = %e, "Reconciliation failed"),
                Err(e) => error!(error = %e, "Reconciliation task panicked"),
                Ok(Ok(())) => {}
            }
        }
    }

    async fn run_retention_worker(&self) {
        let days = match self.config.retention_days {
            Some(days) => days,
            None => return,
        };
        let mut ticker = interval(self.config.retention_interval);

        loop {
            ticker.tick().await;
            let store = self.store.clone();
            let result = tokio::task::spawn_blocking(move || {
                RetentionWorker::new(store, days).run()
            })
            .await;

            match result {
                Ok(Err(e)) => error!(error = %e, "Retention check failed"),
                Err(e) => error!(error = %e, "Retention task panicked"),
                Ok(Ok(_)) => {}
            }
        }
    }
}
