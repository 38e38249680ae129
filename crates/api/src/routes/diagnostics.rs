//! Server-side diagnostics endpoint.
//!
//! Ingestion rejects never fail tracker requests, so this is where they
//! become observable: per-reason reject counters, store errors, and
//! latency means, alongside store totals.

use axum::{extract::State, Json};
use telemetry::{metrics, MetricsSnapshot};

use crate::state::AppState;

/// GET /metrics - JSON metrics snapshot.
pub async fn metrics_handler(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    let (stored_events, stored_days) = state.store.totals();
    metrics().stored_events.set(stored_events);
    metrics().stored_days.set(stored_days);

    Json(metrics().snapshot())
}
