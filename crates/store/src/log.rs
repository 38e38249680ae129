//! Segment file layout and raw log I/O.
//!
//! One JSON-lines file per UTC day (`events-YYYYMMDD.log`), chosen by event
//! timestamp. Appends always go through a single writer; readers open their
//! own handles and stop at the first malformed trailing line, so a torn
//! write is never observed as a partial record.

use chrono::NaiveDate;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use beacon_core::{Event, Result};

const SEGMENT_PREFIX: &str = "events-";
const SEGMENT_SUFFIX: &str = ".log";
const DAY_FORMAT: &str = "%Y%m%d";

/// Path of the segment file holding the given day.
pub fn segment_path(dir: &Path, day: NaiveDate) -> PathBuf {
    dir.join(format!(
        "{SEGMENT_PREFIX}{}{SEGMENT_SUFFIX}",
        day.format(DAY_FORMAT)
    ))
}

/// Parses the day out of a segment file name.
pub fn segment_day(file_name: &str) -> Option<NaiveDate> {
    let day = file_name
        .strip_prefix(SEGMENT_PREFIX)?
        .strip_suffix(SEGMENT_SUFFIX)?;
    NaiveDate::parse_from_str(day, DAY_FORMAT).ok()
}

/// Lists segment files in the data dir, sorted by day ascending.
pub fn list_segments(dir: &Path) -> Result<Vec<(NaiveDate, PathBuf)>> {
    let mut segments = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if let Some(day) = name.to_str().and_then(segment_day) {
            segments.push((day, entry.path()));
        }
    }

    segments.sort_by_key(|(day, _)| *day);
    Ok(segments)
}

/// Result of reading a segment: parsed events plus byte accounting, so the
/// caller can detect and cut a torn tail.
#[derive(Debug)]
pub struct SegmentRead {
    pub events: Vec<Event>,
    /// Byte length of the well-formed prefix (absolute, from file start)
    pub valid_len: u64,
    /// Total file length at read time
    pub file_len: u64,
}

/// Reads a whole segment file.
pub fn read_segment(path: &Path) -> Result<SegmentRead> {
    read_segment_from(path, 0)
}

/// Reads a segment starting at a byte offset (rollup watermark replay).
///
/// Parsing stops at the first incomplete or malformed trailing line; the
/// bytes before it are the durable prefix.
pub fn read_segment_from(path: &Path, offset: u64) -> Result<SegmentRead> {
    let mut file = File::open(path)?;
    let file_len = file.metadata()?.len();

    if offset > 0 {
        file.seek(SeekFrom::Start(offset))?;
    }

    let mut reader = BufReader::new(file);
    let mut events = Vec::new();
    let mut valid_len = offset;
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let read = reader.read_until(b'\n', &mut buf)?;
        if read == 0 {
            break;
        }
        if buf.last() != Some(&b'\n') {
            // Incomplete trailing line
            break;
        }
        match serde_json::from_slice::<Event>(&buf) {
            Ok(event) => {
                valid_len += read as u64;
                events.push(event);
            }
            Err(_) => break,
        }
    }

    Ok(SegmentRead {
        events,
        valid_len,
        file_len,
    })
}

/// Cuts a segment back to its well-formed prefix.
pub fn truncate_segment(path: &Path, len: u64) -> Result<()> {
    let file = OpenOptions::new().write(true).open(path)?;
    file.set_len(len)?;
    file.sync_data()?;
    Ok(())
}

/// Opens a segment for appending, creating it if needed.
///
/// Returns the handle and its current length.
pub fn open_segment_for_append(path: &Path) -> Result<(File, u64)> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let len = file.metadata()?.len();
    Ok((file, len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_segment_naming_roundtrip() {
        let day = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let path = segment_path(Path::new("/data"), day);
        assert_eq!(path.file_name().unwrap(), "events-20250601.log");
        assert_eq!(segment_day("events-20250601.log"), Some(day));
        assert_eq!(segment_day("rollups.json"), None);
        assert_eq!(segment_day("events-notaday.log"), None);
    }

    #[test]
    fn test_torn_tail_stops_parse() {
        let dir = tempfile::tempdir().unwrap();
        let day = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let path = segment_path(dir.path(), day);

        let event = beacon_core::Event {
            id: 1,
            timestamp: Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap(),
            received_at: Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap(),
            visitor_id: "v1".into(),
            session_id: "s1".into(),
            url: String::new(),
            path: "/".into(),
            hostname: String::new(),
            referrer: String::new(),
            title: String::new(),
            browser: String::new(),
            os: String::new(),
            device_type: String::new(),
            user_agent: None,
            screen_width: None,
            screen_height: None,
            viewport_width: None,
            viewport_height: None,
            language: None,
            timezone: None,
            ip: None,
            data: beacon_core::EventData::Pageview,
        };

        let mut line = serde_json::to_vec(&event).unwrap();
        line.push(b'\n');
        let full_len = line.len() as u64;
        line.extend_from_slice(b"{\"id\":2,\"trunc");
        std::fs::write(&path, &line).unwrap();

        let read = read_segment(&path).unwrap();
        assert_eq!(read.events.len(), 1);
        assert_eq!(read.valid_len, full_len);
        assert!(read.file_len > read.valid_len);

        truncate_segment(&path, read.valid_len).unwrap();
        let read = read_segment(&path).unwrap();
        assert_eq!(read.events.len(), 1);
        assert_eq!(read.file_len, read.valid_len);
    }
}
