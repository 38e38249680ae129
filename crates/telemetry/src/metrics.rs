//! Internal metrics collection.
//!
//! Collects metrics in-memory; `/metrics` serves a JSON snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// A gauge metric (can go up or down).
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn set(&self, val: u64) {
        self.0.store(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Histogram for latency tracking.
#[derive(Debug)]
pub struct Histogram {
    /// Buckets: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 5s, 10s
    buckets: [AtomicU64; 11],
    sum: AtomicU64,
    count: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    const BUCKET_BOUNDS: [u64; 11] = [1, 5, 10, 25, 50, 100, 250, 500, 1000, 5000, 10000];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Records a value in milliseconds.
    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        for (i, &bound) in Self::BUCKET_BOUNDS.iter().enumerate() {
            if ms <= bound {
                self.buckets[i].fetch_add(1, Ordering::Relaxed);
                return;
            }
        }
        // Value exceeds all buckets, add to last
        self.buckets[10].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum() as f64 / count as f64
        }
    }

    /// Returns bucket counts.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Collected metrics for the collector.
#[derive(Debug, Default)]
pub struct Metrics {
    // Ingestion metrics
    pub requests_total: Counter,
    pub events_collected: Counter,
    pub events_rejected: Counter,
    pub rejects_malformed: Counter,
    pub rejects_too_large: Counter,
    pub rejects_missing_identity: Counter,
    pub rejects_invalid_range: Counter,

    // Store metrics
    pub store_appends: Counter,
    pub store_write_errors: Counter,
    pub rollup_flushes: Counter,
    pub segments_pruned: Counter,

    // Query metrics
    pub queries_total: Counter,
    pub query_cache_hits: Counter,
    pub query_timeouts: Counter,
    pub query_errors: Counter,

    // Latency histograms
    pub collect_latency_ms: Histogram,
    pub append_latency_ms: Histogram,
    pub aggregate_latency_ms: Histogram,

    // Gauges
    pub stored_events: Gauge,
    pub stored_days: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts a payload reject under its reason label.
    pub fn record_reject(&self, label: &str) {
        self.events_rejected.inc();
        match label {
            "malformed_payload" => self.rejects_malformed.inc(),
            "too_large" => self.rejects_too_large.inc(),
            "missing_identity" => self.rejects_missing_identity.inc(),
            "invalid_range" => self.rejects_invalid_range.inc(),
            _ => {}
        }
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub requests_total: u64,
    pub events_collected: u64,
    pub events_rejected: u64,
    pub rejects_malformed: u64,
    pub rejects_too_large: u64,
    pub rejects_missing_identity: u64,
    pub rejects_invalid_range: u64,
    pub store_appends: u64,
    pub store_write_errors: u64,
    pub rollup_flushes: u64,
    pub segments_pruned: u64,
    pub queries_total: u64,
    pub query_cache_hits: u64,
    pub query_timeouts: u64,
    pub query_errors: u64,
    pub collect_latency_mean_ms: f64,
    pub append_latency_mean_ms: f64,
    pub aggregate_latency_mean_ms: f64,
    pub stored_events: u64,
    pub stored_days: u64,
}

impl Metrics {
    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            requests_total: self.requests_total.get(),
            events_collected: self.events_collected.get(),
            events_rejected: self.events_rejected.get(),
            rejects_malformed: self.rejects_malformed.get(),
            rejects_too_large: self.rejects_too_large.get(),
            rejects_missing_identity: self.rejects_missing_identity.get(),
            rejects_invalid_range: self.rejects_invalid_range.get(),
            store_appends: self.store_appends.get(),
            store_write_errors: self.store_write_errors.get(),
            rollup_flushes: self.rollup_flushes.get(),
            segments_pruned: self.segments_pruned.get(),
            queries_total: self.queries_total.get(),
            query_cache_hits: self.query_cache_hits.get(),
            query_timeouts: self.query_timeouts.get(),
            query_errors: self.query_errors.get(),
            collect_latency_mean_ms: self.collect_latency_ms.mean(),
            append_latency_mean_ms: self.append_latency_ms.mean(),
            aggregate_latency_mean_ms: self.aggregate_latency_ms.mean(),
            stored_events: self.stored_events.get(),
            stored_days: self.stored_days.get(),
        }
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
