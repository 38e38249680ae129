//! Payload normalization: raw tracker JSON to a typed [`Event`].
//!
//! The tracker sends camelCase JSON with a field set that varies per event
//! type. Normalization is a pure transform (clock-skew clamping is the only
//! value mutation) so the same payload always yields the same record, minus
//! the store-assigned id.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use validator::Validate;

use crate::error::RejectReason;
use crate::event::*;
use crate::limits::{
    MAX_ERROR_MESSAGE_LEN, MAX_EVENT_AGE_HOURS, MAX_EVENT_SIZE_BYTES, MAX_FUTURE_SKEW_SECS,
    MAX_STACK_LEN,
};

/// Raw event payload as received from the tracker (camelCase).
///
/// Every field is optional; normalization decides what is required.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    pub event_type: Option<String>,
    /// ISO-8601 string or Unix milliseconds
    pub timestamp: Option<Value>,
    #[validate(length(max = 128))]
    pub visitor_id: Option<String>,
    #[validate(length(max = 128))]
    pub session_id: Option<String>,
    #[validate(length(max = 2048))]
    pub url: Option<String>,
    #[validate(length(max = 2000))]
    pub path: Option<String>,
    #[validate(length(max = 253))]
    pub hostname: Option<String>,
    #[validate(length(max = 2048))]
    pub referrer: Option<String>,
    #[validate(length(max = 500))]
    pub title: Option<String>,
    pub browser: Option<String>,
    pub os: Option<String>,
    pub device_type: Option<String>,
    #[validate(length(max = 512))]
    pub user_agent: Option<String>,
    pub screen_width: Option<u32>,
    pub screen_height: Option<u32>,
    pub viewport_width: Option<u32>,
    pub viewport_height: Option<u32>,
    #[validate(length(max = 16))]
    pub language: Option<String>,
    #[validate(length(max = 64))]
    pub timezone: Option<String>,
    /// Nested timing object on `performance` events
    pub performance: Option<PerformanceData>,
    /// Type-specific fields (message, elementType, maxScrollDepth, ...)
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Parses and normalizes a raw request body.
///
/// Enforces the body size limit before touching the JSON parser.
pub fn normalize_bytes(bytes: &[u8], received_at: DateTime<Utc>) -> Result<Event, RejectReason> {
    if bytes.len() > MAX_EVENT_SIZE_BYTES {
        return Err(RejectReason::TooLarge);
    }

    let raw: RawEvent =
        serde_json::from_slice(bytes).map_err(|_| RejectReason::MalformedPayload)?;

    normalize(raw, received_at)
}

/// Validates and canonicalizes a raw payload into a typed [`Event`].
///
/// The returned event carries `id = 0`; the store assigns the real id at
/// append time.
pub fn normalize(raw: RawEvent, received_at: DateTime<Utc>) -> Result<Event, RejectReason> {
    raw.validate().map_err(|_| RejectReason::MalformedPayload)?;

    let visitor_id = match raw.visitor_id.as_deref() {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => return Err(RejectReason::MissingIdentity),
    };
    let session_id = match raw.session_id.as_deref() {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => return Err(RejectReason::MissingIdentity),
    };

    let timestamp = clamp_timestamp(parse_timestamp(raw.timestamp.as_ref()), received_at);

    let url = raw.url.clone().unwrap_or_default();
    let path = raw
        .path
        .clone()
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| extract_path(&url));
    let hostname = raw
        .hostname
        .clone()
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| extract_hostname(&url));

    let data = build_data(&raw);

    Ok(Event {
        id: 0,
        timestamp,
        received_at,
        visitor_id,
        session_id,
        url,
        path,
        hostname,
        referrer: raw.referrer.unwrap_or_default(),
        title: raw.title.unwrap_or_default(),
        browser: raw.browser.unwrap_or_default(),
        os: raw.os.unwrap_or_default(),
        device_type: raw.device_type.unwrap_or_default(),
        user_agent: raw.user_agent,
        screen_width: raw.screen_width,
        screen_height: raw.screen_height,
        viewport_width: raw.viewport_width,
        viewport_height: raw.viewport_height,
        language: raw.language,
        timezone: raw.timezone,
        ip: None,
        data,
    })
}

/// Parses the client timestamp: ISO-8601 string or Unix milliseconds.
fn parse_timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    match value {
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }
}

/// Clamps skewed client clocks to the server receipt time.
fn clamp_timestamp(parsed: Option<DateTime<Utc>>, received_at: DateTime<Utc>) -> DateTime<Utc> {
    let ts = match parsed {
        Some(ts) => ts,
        None => return received_at,
    };

    let max_future = received_at + Duration::seconds(MAX_FUTURE_SKEW_SECS);
    let max_past = received_at - Duration::hours(MAX_EVENT_AGE_HOURS);

    if ts > max_future || ts < max_past {
        received_at
    } else {
        ts
    }
}

/// Extract path from URL.
fn extract_path(url: &str) -> String {
    url::Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| "/".to_string())
}

/// Extract hostname from URL.
fn extract_hostname(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default()
}

/// Builds the typed payload for the classified event type.
fn build_data(raw: &RawEvent) -> EventData {
    let type_str = raw.event_type.as_deref().unwrap_or("");

    match EventType::classify(type_str) {
        EventType::Pageview => EventData::Pageview,
        EventType::Performance => {
            EventData::Performance(raw.performance.clone().unwrap_or_default())
        }
        EventType::Click => EventData::Click(ClickData {
            element_type: extra_str(raw, "elementType").unwrap_or_else(|| "unknown".into()),
            element_id: extra_str(raw, "elementId"),
            data_track: extra_str(raw, "dataTrack"),
            href: extra_str(raw, "href"),
            text: extra_str(raw, "text"),
        }),
        EventType::ScrollDepth => EventData::ScrollDepth(ScrollDepthData {
            max_scroll_depth: extra_f64(raw, "maxScrollDepth").unwrap_or(0.0),
        }),
        EventType::TimeOnPage => EventData::TimeOnPage(TimeOnPageData {
            time_on_page: extra_f64(raw, "timeOnPage").unwrap_or(0.0),
        }),
        EventType::FormSubmit => EventData::FormSubmit(FormSubmitData {
            form_id: extra_str(raw, "formId"),
            action: extra_str(raw, "action"),
        }),
        EventType::Error => EventData::Error(ErrorData {
            message: truncate(
                extra_str(raw, "message").unwrap_or_else(|| "Unknown error".into()),
                MAX_ERROR_MESSAGE_LEN,
            ),
            source: extra_str(raw, "source"),
            line: extra_u32(raw, "line"),
            column: extra_u32(raw, "colno").or_else(|| extra_u32(raw, "column")),
            stack: extra_str(raw, "stack").map(|s| truncate(s, MAX_STACK_LEN)),
        }),
        EventType::Identify => EventData::Identify(IdentifyData {
            traits: raw
                .extra
                .get("traits")
                .cloned()
                .unwrap_or(Value::Null),
        }),
        EventType::Custom => EventData::Custom(CustomData {
            // For unknown inbound types, keep the original tag as the name
            name: extra_str(raw, "name").or_else(|| {
                (!type_str.is_empty() && type_str != "custom").then(|| type_str.to_string())
            }),
            properties: raw
                .extra
                .get("properties")
                .cloned()
                .unwrap_or(Value::Null),
        }),
    }
}

fn extra_str(raw: &RawEvent, key: &str) -> Option<String> {
    raw.extra
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn extra_f64(raw: &RawEvent, key: &str) -> Option<f64> {
    raw.extra.get(key).and_then(Value::as_f64)
}

fn extra_u32(raw: &RawEvent, key: &str) -> Option<u32> {
    raw.extra
        .get(key)
        .and_then(Value::as_u64)
        .map(|n| n as u32)
}

fn truncate(mut s: String, max: usize) -> String {
    if s.len() > max {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        s.truncate(end);
    }
    s
}
