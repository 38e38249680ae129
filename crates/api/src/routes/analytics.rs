//! Dashboard query endpoint.

use axum::{
    extract::{Query, State},
    Json,
};
use beacon_core::RangeSelector;
use chrono::Utc;
use eventstore::AggregateSnapshot;
use serde::Deserialize;
use telemetry::metrics;
use tracing::{error, warn};

use crate::response::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery {
    /// Time range: 24h, 7d, 30d, all
    pub range: Option<String>,
    /// Filter by hostname
    pub hostname: Option<String>,
}

/// GET /api/analytics - aggregate snapshot for a named range.
///
/// An unrecognized range falls back to the 7d default rather than failing
/// the dashboard; the reject is still counted. If aggregation exceeds its
/// timeout, the last cached snapshot for the same query is served instead.
pub async fn analytics_handler(
    State(state): State<AppState>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<AggregateSnapshot>, ApiError> {
    metrics().queries_total.inc();

    let (selector, reject) = RangeSelector::parse_or_default(query.range.as_deref());
    if let Some(reason) = reject {
        warn!(
            code = reason.code(),
            requested = query.range.as_deref().unwrap_or(""),
            fallback = selector.as_str(),
            "Unknown range selector"
        );
        metrics().record_reject(reason.as_str());
    }

    let range = selector.resolve(Utc::now());
    let cache_key = format!("{}|{}", selector, query.hostname.as_deref().unwrap_or(""));

    let work = state.aggregator.aggregate(range, query.hostname.clone());
    match tokio::time::timeout(state.config.aggregate_timeout(), work).await {
        Ok(Ok(snapshot)) => {
            state
                .snapshot_cache
                .insert(cache_key, snapshot.clone())
                .await;
            Ok(Json(snapshot))
        }
        Ok(Err(e)) => {
            metrics().query_errors.inc();
            error!(error = %e, range = selector.as_str(), "Aggregation failed");
            Err(ApiError::internal("Failed to fetch analytics"))
        }
        Err(_) => {
            metrics().query_timeouts.inc();
            if let Some(cached) = state.snapshot_cache.get(&cache_key).await {
                metrics().query_cache_hits.inc();
                warn!(
                    range = selector.as_str(),
                    "Aggregation timed out, serving cached snapshot"
                );
                Ok(Json(cached))
            } else {
                error!(range = selector.as_str(), "Aggregation timed out, no cached snapshot");
                Err(ApiError::timeout("Analytics query timed out"))
            }
        }
    }
}
