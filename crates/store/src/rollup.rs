//! Incrementally-maintained day buckets.
//!
//! One [`DayRollup`] per UTC day holds per-event-type counts and sum/count
//! pairs for averaged metrics, plus a byte watermark into the day's segment.
//! The index is persisted as JSON next to the segments and is always
//! rebuildable from the raw log; it is never the sole source of truth.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use beacon_core::{Event, EventData, EventType, Result};

/// File name of the persisted index inside the data dir.
pub const ROLLUP_FILE: &str = "rollups.json";

/// Per-day counters, updated at write time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DayRollup {
    /// Total events this day
    pub events: u64,
    /// Count per event type
    #[serde(default)]
    pub by_type: BTreeMap<EventType, u64>,
    /// Sum/count pairs for averaged metrics
    #[serde(default)]
    pub time_on_page_sum: f64,
    #[serde(default)]
    pub time_on_page_count: u64,
    #[serde(default)]
    pub scroll_depth_sum: f64,
    #[serde(default)]
    pub scroll_depth_count: u64,
    #[serde(default)]
    pub page_load_sum: f64,
    #[serde(default)]
    pub page_load_count: u64,
    #[serde(default)]
    pub dom_loaded_sum: f64,
    #[serde(default)]
    pub dom_loaded_count: u64,
    #[serde(default)]
    pub first_byte_sum: f64,
    #[serde(default)]
    pub first_byte_count: u64,
    /// Byte length of the day's segment prefix this bucket reflects
    #[serde(default)]
    pub bytes_indexed: u64,
}

impl DayRollup {
    /// Folds one event into the bucket.
    pub fn absorb(&mut self, event: &Event) {
        self.events += 1;
        *self.by_type.entry(event.event_type()).or_default() += 1;

        match &event.data {
            EventData::TimeOnPage(data) => {
                self.time_on_page_sum += data.time_on_page;
                self.time_on_page_count += 1;
            }
            EventData::ScrollDepth(data) => {
                self.scroll_depth_sum += data.max_scroll_depth;
                self.scroll_depth_count += 1;
            }
            EventData::Performance(data) => {
                if let Some(v) = data.page_load_time {
                    self.page_load_sum += v;
                    self.page_load_count += 1;
                }
                if let Some(v) = data.dom_content_loaded {
                    self.dom_loaded_sum += v;
                    self.dom_loaded_count += 1;
                }
                if let Some(v) = data.first_byte {
                    self.first_byte_sum += v;
                    self.first_byte_count += 1;
                }
            }
            _ => {}
        }
    }

    /// Count of one event type this day.
    pub fn count_of(&self, event_type: EventType) -> u64 {
        self.by_type.get(&event_type).copied().unwrap_or(0)
    }

    pub fn pageviews(&self) -> u64 {
        self.count_of(EventType::Pageview)
    }
}

/// The persisted rollup index: next id to assign plus all day buckets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RollupIndex {
    /// Next event id the store will assign
    #[serde(default)]
    pub next_id: u64,
    /// Day buckets, keyed by UTC date
    #[serde(default)]
    pub days: BTreeMap<NaiveDate, DayRollup>,
}

impl RollupIndex {
    /// Loads the index from disk; a missing file is an empty index.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read(path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Persists the index atomically (temp file + rename).
    pub fn save(&self, path: &Path) -> Result<()> {
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(self)?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Folds an appended event into its day bucket and advances the
    /// watermark to the segment length after the write.
    pub fn absorb(&mut self, event: &Event, segment_len: u64) {
        let bucket = self.days.entry(event.day()).or_default();
        bucket.absorb(event);
        bucket.bytes_indexed = segment_len;
    }

    /// Total events across all days.
    pub fn total_events(&self) -> u64 {
        self.days.values().map(|d| d.events).sum()
    }
}

/// Counts for a resolved time range, assembled from whole-day buckets and
/// boundary-day scans. Groupings and distinct counts are not here; those
/// always come from a raw scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangeCounts {
    pub total_events: u64,
    pub by_type: BTreeMap<EventType, u64>,
    pub time_on_page_sum: f64,
    pub time_on_page_count: u64,
    pub scroll_depth_sum: f64,
    pub scroll_depth_count: u64,
    pub page_load_sum: f64,
    pub page_load_count: u64,
    pub dom_loaded_sum: f64,
    pub dom_loaded_count: u64,
    pub first_byte_sum: f64,
    pub first_byte_count: u64,
    /// Pageviews per day inside the range (sparse)
    pub views_by_day: BTreeMap<NaiveDate, u64>,
}

impl RangeCounts {
    /// Folds one day bucket into the range totals.
    pub fn add_day(&mut self, day: NaiveDate, rollup: &DayRollup) {
        if rollup.events == 0 {
            return;
        }
        self.total_events += rollup.events;
        for (ty, count) in &rollup.by_type {
            *self.by_type.entry(*ty).or_default() += count;
        }
        self.time_on_page_sum += rollup.time_on_page_sum;
        self.time_on_page_count += rollup.time_on_page_count;
        self.scroll_depth_sum += rollup.scroll_depth_sum;
        self.scroll_depth_count += rollup.scroll_depth_count;
        self.page_load_sum += rollup.page_load_sum;
        self.page_load_count += rollup.page_load_count;
        self.dom_loaded_sum += rollup.dom_loaded_sum;
        self.dom_loaded_count += rollup.dom_loaded_count;
        self.first_byte_sum += rollup.first_byte_sum;
        self.first_byte_count += rollup.first_byte_count;

        let views = rollup.pageviews();
        if views > 0 {
            *self.views_by_day.entry(day).or_default() += views;
        }
    }

    pub fn count_of(&self, event_type: EventType) -> u64 {
        self.by_type.get(&event_type).copied().unwrap_or(0)
    }

    pub fn pageviews(&self) -> u64 {
        self.count_of(EventType::Pageview)
    }

    pub fn errors(&self) -> u64 {
        self.count_of(EventType::Error)
    }

    pub fn avg_time_on_page(&self) -> f64 {
        mean(self.time_on_page_sum, self.time_on_page_count)
    }

    pub fn avg_scroll_depth(&self) -> f64 {
        mean(self.scroll_depth_sum, self.scroll_depth_count)
    }

    pub fn avg_page_load(&self) -> f64 {
        mean(self.page_load_sum, self.page_load_count)
    }

    pub fn avg_dom_loaded(&self) -> f64 {
        mean(self.dom_loaded_sum, self.dom_loaded_count)
    }

    pub fn avg_first_byte(&self) -> f64 {
        mean(self.first_byte_sum, self.first_byte_count)
    }

    /// Whether any performance timing was observed.
    pub fn has_performance(&self) -> bool {
        self.page_load_count > 0 || self.dom_loaded_count > 0 || self.first_byte_count > 0
    }
}

fn mean(sum: f64, count: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
