//! Windowed aggregation over the event store.
//!
//! Totals, averages and the per-day series come from the hybrid rollup
//! counter path; distinct counts and per-item groupings come from a raw
//! scan bounded to the requested window. Every ranking breaks ties by a
//! stable rule (count descending, then key ascending), so an identical
//! event set and range always produce an identical snapshot.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::time::Instant;

use beacon_core::limits::{RECENT_ERRORS, RECENT_EVENTS, TOP_ITEMS};
use beacon_core::{Error, Event, EventData, Result, TimeRange};
use telemetry::metrics;

use crate::rollup::{DayRollup, RangeCounts};
use crate::store::EventStore;

/// Totals block of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_pageviews: u64,
    pub unique_visitors: u64,
    pub unique_sessions: u64,
    pub total_events: u64,
    /// Mean of `timeOnPage` over time-on-page events (ms)
    pub avg_time_on_page: f64,
    /// Mean of `maxScrollDepth` over scroll events (percent)
    pub avg_scroll_depth: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageCount {
    pub page: String,
    pub views: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferrerCount {
    pub referrer: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowserCount {
    pub browser: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OsCount {
    pub os: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceCount {
    pub device: String,
    pub count: u64,
}

/// Clicked-element ranking entry, grouped by `(tag, data-track or id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickCount {
    pub element_type: String,
    pub label: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorCount {
    pub message: String,
    pub count: u64,
}

/// Rounded performance timing averages (ms), as the dashboard displays them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceAverages {
    pub page_load_time: f64,
    pub dom_content_loaded: f64,
    pub first_byte: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayViews {
    pub date: NaiveDate,
    pub views: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub path: String,
    pub timestamp: DateTime<Utc>,
    /// Truncated visitor id, enough to eyeball correlation
    pub visitor_id: String,
    pub browser: String,
    pub device: String,
}

/// Aggregate view over a time range; derived, cacheable, never
/// authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateSnapshot {
    pub summary: Summary,
    pub top_pages: Vec<PageCount>,
    pub top_referrers: Vec<ReferrerCount>,
    pub browsers: Vec<BrowserCount>,
    pub operating_systems: Vec<OsCount>,
    pub devices: Vec<DeviceCount>,
    pub top_clicks: Vec<ClickCount>,
    pub error_count: u64,
    pub top_errors: Vec<ErrorCount>,
    /// Most recent error messages, newest first, verbatim
    pub recent_errors: Vec<String>,
    pub avg_performance: Option<PerformanceAverages>,
    pub views_over_time: Vec<DayViews>,
    /// Latest events in the window, newest first
    pub recent_events: Vec<RecentEvent>,
}

/// Computes [`AggregateSnapshot`]s from an [`EventStore`].
#[derive(Clone)]
pub struct Aggregator {
    store: EventStore,
}

impl Aggregator {
    pub fn new(store: EventStore) -> Self {
        Self { store }
    }

    /// Aggregates on the blocking pool; reads run concurrently with
    /// appends (eventual read consistency).
    pub async fn aggregate(
        &self,
        range: TimeRange,
        hostname: Option<String>,
    ) -> Result<AggregateSnapshot> {
        let aggregator = self.clone();
        tokio::task::spawn_blocking(move || {
            aggregator.aggregate_blocking(range, hostname.as_deref())
        })
        .await
        .map_err(|e| Error::internal(format!("aggregate task failed: {e}")))?
    }

    /// Synchronous aggregation path.
    pub fn aggregate_blocking(
        &self,
        range: TimeRange,
        hostname: Option<&str>,
    ) -> Result<AggregateSnapshot> {
        let start = Instant::now();

        let mut visitors: HashSet<String> = HashSet::new();
        let mut sessions: HashSet<String> = HashSet::new();
        let mut pages: HashMap<String, u64> = HashMap::new();
        let mut referrers: HashMap<String, u64> = HashMap::new();
        let mut browsers: HashMap<String, u64> = HashMap::new();
        let mut oses: HashMap<String, u64> = HashMap::new();
        let mut devices: HashMap<String, u64> = HashMap::new();
        let mut clicks: HashMap<(String, String), u64> = HashMap::new();
        let mut errors_by_message: HashMap<String, u64> = HashMap::new();
        let mut recent_errors: VecDeque<String> = VecDeque::new();
        let mut recent_events: VecDeque<RecentEvent> = VecDeque::new();

        // With a hostname filter the rollup buckets do not apply (they are
        // not dimensioned by hostname), so counts fold out of this scan.
        let mut scan_buckets: BTreeMap<NaiveDate, DayRollup> = BTreeMap::new();

        for event in self.store.scan(range)? {
            let event = event?;
            if let Some(host) = hostname {
                if event.hostname != host {
                    continue;
                }
            }

            visitors.insert(event.visitor_id.clone());
            sessions.insert(event.session_id.clone());

            match &event.data {
                EventData::Pageview => {
                    *pages.entry(label_or(&event.path, "/")).or_default() += 1;
                    *referrers
                        .entry(label_or(&event.referrer, "direct"))
                        .or_default() += 1;
                    *browsers
                        .entry(label_or(&event.browser, "Unknown"))
                        .or_default() += 1;
                    *oses.entry(label_or(&event.os, "Unknown")).or_default() += 1;
                    *devices
                        .entry(label_or(&event.device_type, "Unknown"))
                        .or_default() += 1;
                }
                EventData::Click(data) => {
                    *clicks.entry(data.group_key()).or_default() += 1;
                }
                EventData::Error(data) => {
                    *errors_by_message.entry(data.message.clone()).or_default() += 1;
                    push_bounded(&mut recent_errors, data.message.clone(), RECENT_ERRORS);
                }
                _ => {}
            }

            push_bounded(&mut recent_events, recent_entry(&event), RECENT_EVENTS);

            if hostname.is_some() {
                scan_buckets.entry(event.day()).or_default().absorb(&event);
            }
        }

        let counts = match hostname {
            None => self.store.range_counts(range)?,
            Some(_) => {
                let mut counts = RangeCounts::default();
                for (day, rollup) in &scan_buckets {
                    counts.add_day(*day, rollup);
                }
                counts
            }
        };

        let snapshot = AggregateSnapshot {
            summary: Summary {
                total_pageviews: counts.pageviews(),
                unique_visitors: visitors.len() as u64,
                unique_sessions: sessions.len() as u64,
                total_events: counts.total_events,
                avg_time_on_page: counts.avg_time_on_page(),
                avg_scroll_depth: counts.avg_scroll_depth(),
            },
            top_pages: top_n(pages, TOP_ITEMS)
                .into_iter()
                .map(|(page, views)| PageCount { page, views })
                .collect(),
            top_referrers: top_referrers(referrers),
            browsers: top_n(browsers, usize::MAX)
                .into_iter()
                .map(|(browser, count)| BrowserCount { browser, count })
                .collect(),
            operating_systems: top_n(oses, usize::MAX)
                .into_iter()
                .map(|(os, count)| OsCount { os, count })
                .collect(),
            devices: top_n(devices, usize::MAX)
                .into_iter()
                .map(|(device, count)| DeviceCount { device, count })
                .collect(),
            top_clicks: top_clicks(clicks),
            error_count: counts.errors(),
            top_errors: top_n(errors_by_message, RECENT_ERRORS)
                .into_iter()
                .map(|(message, count)| ErrorCount { message, count })
                .collect(),
            recent_errors: recent_errors.into_iter().rev().collect(),
            avg_performance: counts.has_performance().then(|| PerformanceAverages {
                page_load_time: counts.avg_page_load().round(),
                dom_content_loaded: counts.avg_dom_loaded().round(),
                first_byte: counts.avg_first_byte().round(),
            }),
            views_over_time: counts
                .views_by_day
                .iter()
                .map(|(date, views)| DayViews {
                    date: *date,
                    views: *views,
                })
                .collect(),
            recent_events: recent_events.into_iter().rev().collect(),
        };

        metrics()
            .aggregate_latency_ms
            .observe(start.elapsed().as_millis() as u64);

        Ok(snapshot)
    }
}

fn label_or(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

fn recent_entry(event: &Event) -> RecentEvent {
    let mut visitor = event.visitor_id.clone();
    visitor.truncate(visitor.char_indices().nth(10).map_or(visitor.len(), |(i, _)| i));

    RecentEvent {
        event_type: event.event_type().as_str().to_string(),
        path: event.path.clone(),
        timestamp: event.timestamp,
        visitor_id: visitor,
        browser: event.browser.clone(),
        device: event.device_type.clone(),
    }
}

/// Keeps the last `cap` items of an ascending stream.
fn push_bounded<T>(queue: &mut VecDeque<T>, item: T, cap: usize) {
    queue.push_back(item);
    if queue.len() > cap {
        queue.pop_front();
    }
}

/// Ranks entries by count descending, key ascending, truncated to `n`.
fn top_n(map: HashMap<String, u64>, n: usize) -> Vec<(String, u64)> {
    let mut entries: Vec<(String, u64)> = map.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.truncate(n);
    entries
}

/// Referrer ranking: `direct` is dropped unless it is itself the top entry.
fn top_referrers(map: HashMap<String, u64>) -> Vec<ReferrerCount> {
    let mut entries = top_n(map, usize::MAX);

    if let Some(pos) = entries.iter().position(|(r, _)| r == "direct") {
        if pos != 0 {
            entries.remove(pos);
        }
    }

    entries.truncate(TOP_ITEMS);
    entries
        .into_iter()
        .map(|(referrer, count)| ReferrerCount { referrer, count })
        .collect()
}

/// Clicked-element ranking with the same stable tie-break.
fn top_clicks(map: HashMap<(String, String), u64>) -> Vec<ClickCount> {
    let mut entries: Vec<((String, String), u64)> = map.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.truncate(TOP_ITEMS);
    entries
        .into_iter()
        .map(|((element_type, label), count)| ClickCount {
            element_type,
            label,
            count,
        })
        .collect()
}
