//! The event store: durable append path, range scans, and hybrid counts.
//!
//! Locking discipline: a single writer mutex serializes appends (held across
//! the fsync of exactly one record); the rollup index sits behind a RwLock
//! and is updated inside the writer critical section so watermarks never
//! regress. Scans never take the writer lock — readers open their own file
//! handles, so a slow disk blocks other writers only.

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, VecDeque};
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use beacon_core::{Error, Event, Result, TimeRange};
use telemetry::metrics;

use crate::config::StoreConfig;
use crate::log;
use crate::rollup::{DayRollup, RangeCounts, RollupIndex, ROLLUP_FILE};

/// Durable, append-only event store with an incrementally-maintained
/// rollup index.
#[derive(Clone)]
pub struct EventStore {
    inner: Arc<Inner>,
}

struct Inner {
    config: StoreConfig,
    rollup_path: PathBuf,
    writer: Mutex<Option<WriterState>>,
    rollups: RwLock<RollupIndex>,
    next_id: AtomicU64,
    dirty: AtomicBool,
}

/// Open handle to the segment currently receiving appends.
struct WriterState {
    day: NaiveDate,
    file: File,
    len: u64,
}

impl EventStore {
    /// Opens the store, recovering segments and the rollup index.
    ///
    /// Recovery walks every segment: days whose segment grew past the
    /// recorded watermark are replayed from it; days whose segment shrank
    /// below it are rebuilt from scratch; torn tails are truncated. The
    /// index is rebuildable from the log, so a missing or stale index file
    /// is never fatal.
    pub fn open(config: StoreConfig) -> Result<Self> {
        fs::create_dir_all(&config.data_dir)?;
        let rollup_path = config.data_dir.join(ROLLUP_FILE);

        let mut index = RollupIndex::load(&rollup_path).unwrap_or_else(|e| {
            warn!(error = %e, "Rollup index unreadable, rebuilding from segments");
            RollupIndex::default()
        });

        let max_seen = recover_segments(&config.data_dir, &mut index)?;
        let next_id = index.next_id.max(max_seen + 1);
        index.next_id = next_id;

        index.save(&rollup_path)?;

        info!(
            data_dir = %config.data_dir.display(),
            days = index.days.len(),
            events = index.total_events(),
            next_id,
            "Event store opened"
        );

        let store = Self {
            inner: Arc::new(Inner {
                config,
                rollup_path,
                writer: Mutex::new(None),
                rollups: RwLock::new(index),
                next_id: AtomicU64::new(next_id),
                dirty: AtomicBool::new(false),
            }),
        };
        store.update_gauges();

        Ok(store)
    }

    /// Appends one event, assigning its id; durable before returning.
    ///
    /// Runs on the blocking pool so disk I/O never stalls the async runtime.
    pub async fn append(&self, event: Event) -> Result<Event> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.append_blocking(event))
            .await
            .map_err(|e| Error::internal(format!("append task failed: {e}")))?
    }

    /// Synchronous append path.
    pub fn append_blocking(&self, mut event: Event) -> Result<Event> {
        let start = Instant::now();
        let inner = &self.inner;

        let mut writer = inner.writer.lock();

        // Id assignment inside the writer lock keeps ids strictly
        // increasing in log order.
        let id = inner.next_id.fetch_add(1, Ordering::SeqCst);
        event.id = id;

        let mut line = serde_json::to_vec(&event)?;
        line.push(b'\n');

        let day = event.day();
        let segment_len = self
            .write_line(&mut *writer, day, &line)
            .map_err(|e| {
                metrics().store_write_errors.inc();
                e
            })?;

        {
            let mut rollups = inner.rollups.write();
            rollups.absorb(&event, segment_len);
            rollups.next_id = id + 1;
        }
        inner.dirty.store(true, Ordering::Release);
        drop(writer);

        metrics().store_appends.inc();
        metrics()
            .append_latency_ms
            .observe(start.elapsed().as_millis() as u64);

        Ok(event)
    }

    /// Writes one line to the day's segment, rolling the handle if the
    /// target day changed. Returns the segment length after the write.
    fn write_line(
        &self,
        writer: &mut Option<WriterState>,
        day: NaiveDate,
        line: &[u8],
    ) -> Result<u64> {
        let inner = &self.inner;

        if writer.as_ref().map(|w| w.day) != Some(day) {
            let path = log::segment_path(&inner.config.data_dir, day);
            let (file, len) = log::open_segment_for_append(&path)
                .map_err(|e| Error::write_failed(format!("open segment {day}: {e}")))?;
            debug!(%day, len, "Rolled to segment");
            *writer = Some(WriterState { day, file, len });
        }

        let state = writer.as_mut().expect("writer state just set");
        state
            .file
            .write_all(line)
            .map_err(|e| Error::write_failed(format!("append to {day}: {e}")))?;
        state
            .file
            .flush()
            .map_err(|e| Error::write_failed(format!("append to {day}: {e}")))?;

        if inner.config.fsync {
            state
                .file
                .sync_data()
                .map_err(|e| Error::write_failed(format!("fsync {day}: {e}")))?;
        }

        state.len += line.len() as u64;
        Ok(state.len)
    }

    /// Lazily scans events in `[range.from, range.to)`, timestamp ascending.
    ///
    /// Day segments partition by event timestamp, so visiting segments in
    /// date order and sorting within each yields a globally ordered stream
    /// with at most one day of events in memory.
    pub fn scan(&self, range: TimeRange) -> Result<ScanIter> {
        let segments = log::list_segments(&self.inner.config.data_dir)?
            .into_iter()
            .filter(|(day, _)| {
                let after_from = match range.from {
                    Some(from) => *day >= from.date_naive(),
                    None => true,
                };
                after_from && *day <= range.to.date_naive()
            })
            .collect();

        Ok(ScanIter {
            range,
            segments,
            current: Vec::new().into_iter(),
            failed: false,
        })
    }

    /// Range counts from the hybrid path: whole days from rollup buckets,
    /// partial boundary days from a raw scan of just those segments.
    pub fn range_counts(&self, range: TimeRange) -> Result<RangeCounts> {
        let mut counts = RangeCounts::default();

        let (full_days, partial_days) = {
            let rollups = self.inner.rollups.read();
            split_days(&rollups.days, range)
        };

        {
            let rollups = self.inner.rollups.read();
            for day in full_days {
                if let Some(rollup) = rollups.days.get(&day) {
                    counts.add_day(day, rollup);
                }
            }
        }

        for day in partial_days {
            let rollup = self.scan_day_filtered(day, range)?;
            counts.add_day(day, &rollup);
        }

        Ok(counts)
    }

    /// Range counts from a pure raw scan; the reference the rollup path
    /// must agree with.
    pub fn raw_counts(&self, range: TimeRange) -> Result<RangeCounts> {
        let mut buckets: BTreeMap<NaiveDate, DayRollup> = BTreeMap::new();
        for event in self.scan(range)? {
            let event = event?;
            buckets.entry(event.day()).or_default().absorb(&event);
        }

        let mut counts = RangeCounts::default();
        for (day, rollup) in &buckets {
            counts.add_day(*day, rollup);
        }
        Ok(counts)
    }

    /// Scans one day's segment, folding only in-range events.
    fn scan_day_filtered(&self, day: NaiveDate, range: TimeRange) -> Result<DayRollup> {
        let path = log::segment_path(&self.inner.config.data_dir, day);
        let mut rollup = DayRollup::default();

        if !path.exists() {
            return Ok(rollup);
        }

        for event in log::read_segment(&path)?.events {
            if range.contains(event.timestamp) {
                rollup.absorb(&event);
            }
        }
        Ok(rollup)
    }

    /// Persists the rollup index if it changed since the last flush.
    pub fn flush(&self) -> Result<()> {
        let inner = &self.inner;
        if !inner.dirty.swap(false, Ordering::AcqRel) {
            return Ok(());
        }

        let snapshot = inner.rollups.read().clone();
        if let Err(e) = snapshot.save(&inner.rollup_path) {
            inner.dirty.store(true, Ordering::Release);
            return Err(e);
        }

        metrics().rollup_flushes.inc();
        self.update_gauges();
        Ok(())
    }

    /// Re-verifies every day bucket against its segment and persists the
    /// index. Replays appended tails, rebuilds mismatched days.
    pub fn reconcile(&self) -> Result<()> {
        let inner = &self.inner;

        // Hold the writer lock so segment lengths are stable underneath us.
        let _writer = inner.writer.lock();
        let mut rollups = inner.rollups.write();
        let max_seen = recover_segments(&inner.config.data_dir, &mut rollups)?;

        let next = inner.next_id.load(Ordering::SeqCst).max(max_seen + 1);
        inner.next_id.store(next, Ordering::SeqCst);
        rollups.next_id = next;

        rollups.save(&inner.rollup_path)?;
        inner.dirty.store(false, Ordering::Release);

        metrics().rollup_flushes.inc();
        drop(rollups);
        self.update_gauges();
        Ok(())
    }

    /// Deletes segment files for days strictly before the cutoff.
    ///
    /// Explicit maintenance, never part of request handling. Rollup buckets
    /// for pruned days are kept, so all-time counts survive pruning.
    pub fn prune_before(&self, cutoff: NaiveDate) -> Result<usize> {
        let _writer = self.inner.writer.lock();
        let mut pruned = 0;

        for (day, path) in log::list_segments(&self.inner.config.data_dir)? {
            if day < cutoff {
                fs::remove_file(&path)?;
                pruned += 1;
                info!(%day, "Pruned segment");
            }
        }

        if pruned > 0 {
            metrics().segments_pruned.inc_by(pruned as u64);
        }
        Ok(pruned)
    }

    /// Total stored (events, days) per the rollup index.
    pub fn totals(&self) -> (u64, u64) {
        let rollups = self.inner.rollups.read();
        (rollups.total_events(), rollups.days.len() as u64)
    }

    fn update_gauges(&self) {
        let (events, days) = self.totals();
        metrics().stored_events.set(events);
        metrics().stored_days.set(days);
    }
}

/// Walks all segments, bringing `index` up to date with the log. Returns
/// the highest event id seen while reading.
fn recover_segments(data_dir: &std::path::Path, index: &mut RollupIndex) -> Result<u64> {
    let mut max_id = 0u64;

    for (day, path) in log::list_segments(data_dir)? {
        let file_len = fs::metadata(&path)?.len();
        let indexed = index.days.get(&day).map(|r| r.bytes_indexed).unwrap_or(0);

        if file_len == indexed {
            continue;
        }

        let (read, rebuilt) = if file_len < indexed {
            // Segment shrank underneath the index: bucket is stale
            warn!(%day, file_len, indexed, "Segment shorter than watermark, rebuilding day");
            (log::read_segment(&path)?, true)
        } else {
            (log::read_segment_from(&path, indexed)?, false)
        };

        if read.valid_len < read.file_len {
            warn!(
                %day,
                torn_bytes = read.file_len - read.valid_len,
                "Truncating torn segment tail"
            );
            log::truncate_segment(&path, read.valid_len)?;
        }

        let bucket = index.days.entry(day).or_default();
        if rebuilt {
            *bucket = DayRollup::default();
        }
        for event in &read.events {
            bucket.absorb(event);
            max_id = max_id.max(event.id);
        }
        bucket.bytes_indexed = read.valid_len;

        if !read.events.is_empty() {
            debug!(%day, replayed = read.events.len(), "Reconciled day bucket");
        }
    }

    Ok(max_id)
}

/// Splits the day span of a range into whole days (served by rollup
/// buckets) and partial boundary days (served by raw scans).
fn split_days(
    days: &BTreeMap<NaiveDate, DayRollup>,
    range: TimeRange,
) -> (Vec<NaiveDate>, Vec<NaiveDate>) {
    let mut full = Vec::new();
    let mut partial = Vec::new();

    for day in days.keys() {
        let day_start = Utc.from_utc_datetime(&day.and_hms_opt(0, 0, 0).expect("midnight"));
        let day_end = day_start + Duration::days(1);

        if day_end <= range.from.unwrap_or(day_start) || day_start >= range.to {
            continue;
        }

        let covered_from = range.from.map_or(true, |from| from <= day_start);
        let covered_to = range.to >= day_end;

        if covered_from && covered_to {
            full.push(*day);
        } else {
            partial.push(*day);
        }
    }

    (full, partial)
}

/// Lazy, restartable scan over stored events, timestamp ascending.
pub struct ScanIter {
    range: TimeRange,
    segments: VecDeque<(NaiveDate, PathBuf)>,
    current: std::vec::IntoIter<Event>,
    failed: bool,
}

impl Iterator for ScanIter {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            if let Some(event) = self.current.next() {
                return Some(Ok(event));
            }

            let (_, path) = self.segments.pop_front()?;
            match log::read_segment(&path) {
                Ok(read) => {
                    let mut events: Vec<Event> = read
                        .events
                        .into_iter()
                        .filter(|e| self.range.contains(e.timestamp))
                        .collect();
                    events.sort_by_key(|e| (e.timestamp, e.id));
                    self.current = events.into_iter();
                }
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
