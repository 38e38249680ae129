//! Ingestion endpoint handler.
//!
//! One event per POST. Payload problems never fail the request: the tracker
//! runs inside visitors' pages, and an analytics hiccup must not surface
//! there. Rejects are classified, logged, and counted instead. Only a store
//! that cannot accept the write fails the request.

use axum::{body::Bytes, extract::State, Json};
use beacon_core::normalize_bytes;
use chrono::Utc;
use std::time::Instant;
use telemetry::metrics;
use tracing::{debug, error, warn};

use crate::extractors::ClientIp;
use crate::response::{ApiError, CollectResponse};
use crate::state::AppState;

/// POST /collect - tracker ingestion endpoint.
pub async fn collect_handler(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    body: Bytes,
) -> Result<Json<CollectResponse>, ApiError> {
    let start = Instant::now();

    metrics().requests_total.inc();
    let received_at = Utc::now();

    let mut event = match normalize_bytes(&body, received_at) {
        Ok(event) => event,
        Err(reason) => {
            warn!(
                code = reason.code(),
                reason = reason.as_str(),
                payload_size = body.len(),
                "Event rejected"
            );
            metrics().record_reject(reason.as_str());

            // Swallowed by design; still a success to the tracker
            metrics()
                .collect_latency_ms
                .observe(start.elapsed().as_millis() as u64);
            return Ok(Json(CollectResponse::accepted(None)));
        }
    };

    event.ip = client_ip;

    let stored = state.store.append(event).await.map_err(|e| {
        error!(error = %e, "Failed to store event");
        ApiError::store_failed("Failed to save event")
    })?;

    metrics().events_collected.inc();
    debug!(
        event_id = stored.id,
        event_type = stored.event_type().as_str(),
        path = %stored.path,
        "Event stored"
    );

    metrics()
        .collect_latency_ms
        .observe(start.elapsed().as_millis() as u64);

    Ok(Json(CollectResponse::accepted(Some(stored.id))))
}
