//! Event record definitions for the collector.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// All supported event types.
///
/// Unknown inbound type strings classify as `Custom` rather than being
/// rejected, so older servers tolerate newer trackers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Pageview,
    Performance,
    Click,
    ScrollDepth,
    TimeOnPage,
    FormSubmit,
    Error,
    Custom,
    Identify,
}

impl EventType {
    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pageview => "pageview",
            Self::Performance => "performance",
            Self::Click => "click",
            Self::ScrollDepth => "scroll_depth",
            Self::TimeOnPage => "time_on_page",
            Self::FormSubmit => "form_submit",
            Self::Error => "error",
            Self::Custom => "custom",
            Self::Identify => "identify",
        }
    }

    /// Classifies an inbound type string, falling back to `Custom`.
    pub fn classify(s: &str) -> Self {
        match s {
            "pageview" => Self::Pageview,
            "performance" => Self::Performance,
            "click" => Self::Click,
            "scroll_depth" => Self::ScrollDepth,
            "time_on_page" => Self::TimeOnPage,
            "form_submit" => Self::FormSubmit,
            "error" => Self::Error,
            "identify" => Self::Identify,
            _ => Self::Custom,
        }
    }
}

/// Page timing data reported by the tracker on `performance` events.
///
/// Aliases accept the tracker's camelCase keys; storage stays snake_case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PerformanceData {
    /// Full page load time (ms)
    #[serde(alias = "pageLoadTime")]
    pub page_load_time: Option<f64>,
    /// DOM Content Loaded (ms)
    #[serde(alias = "domContentLoaded")]
    pub dom_content_loaded: Option<f64>,
    /// Time to first byte (ms)
    #[serde(alias = "firstByte")]
    pub first_byte: Option<f64>,
    /// DNS lookup time (ms)
    #[serde(alias = "dnsLookup")]
    pub dns_lookup: Option<f64>,
    /// TCP connect time (ms)
    #[serde(alias = "tcpConnect")]
    pub tcp_connect: Option<f64>,
}

/// Click event data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ClickData {
    /// Element tag name
    pub element_type: String,
    /// Element id attribute
    pub element_id: Option<String>,
    /// Explicit data-track label, preferred over element_id for grouping
    pub data_track: Option<String>,
    /// Link target for anchor clicks
    pub href: Option<String>,
    /// Element text content (truncated by the tracker)
    pub text: Option<String>,
}

impl ClickData {
    /// Grouping key for clicked-element rankings: `(tag, data-track or id)`.
    pub fn group_key(&self) -> (String, String) {
        let label = self
            .data_track
            .clone()
            .or_else(|| self.element_id.clone())
            .unwrap_or_default();
        (self.element_type.clone(), label)
    }
}

/// Scroll depth event data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrollDepthData {
    /// Deepest scroll position reached, as a percentage (0-100)
    pub max_scroll_depth: f64,
}

/// Time-on-page event data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeOnPageData {
    /// Time spent on the page (ms)
    pub time_on_page: f64,
}

/// Form submission event data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FormSubmitData {
    /// Form id attribute
    pub form_id: Option<String>,
    /// Form action URL
    pub action: Option<String>,
}

/// Script error event data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorData {
    /// Error message, verbatim from the client
    pub message: String,
    /// Script source URL
    pub source: Option<String>,
    /// Source line number
    pub line: Option<u32>,
    /// Source column number
    pub column: Option<u32>,
    /// Stack trace (truncated)
    pub stack: Option<String>,
}

/// Visitor identification data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct IdentifyData {
    /// Free-form traits object supplied by the site
    pub traits: serde_json::Value,
}

/// Custom event data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CustomData {
    /// Custom event name; for unknown inbound types, the original type string
    pub name: Option<String>,
    /// Arbitrary properties
    pub properties: serde_json::Value,
}

/// Type-dependent event payload.
///
/// Known shapes are typed; anything else rides along as schemaless JSON in
/// `Custom`, so the store never forces heterogeneous events into one flat
/// record shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventData {
    Pageview,
    Performance(PerformanceData),
    Click(ClickData),
    ScrollDepth(ScrollDepthData),
    TimeOnPage(TimeOnPageData),
    FormSubmit(FormSubmitData),
    Error(ErrorData),
    Custom(CustomData),
    Identify(IdentifyData),
}

impl EventData {
    /// Returns the event type tag.
    pub fn event_type(&self) -> EventType {
        match self {
            Self::Pageview => EventType::Pageview,
            Self::Performance(_) => EventType::Performance,
            Self::Click(_) => EventType::Click,
            Self::ScrollDepth(_) => EventType::ScrollDepth,
            Self::TimeOnPage(_) => EventType::TimeOnPage,
            Self::FormSubmit(_) => EventType::FormSubmit,
            Self::Error(_) => EventType::Error,
            Self::Custom(_) => EventType::Custom,
            Self::Identify(_) => EventType::Identify,
        }
    }
}

/// A single analytics event, immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Sequence number assigned by the store at append time; 0 before then
    #[serde(default)]
    pub id: u64,
    /// Event occurrence time, clamped to server receipt on excessive skew
    pub timestamp: DateTime<Utc>,
    /// Server receive timestamp
    pub received_at: DateTime<Utc>,
    /// Long-lived client identity correlating sessions across visits
    pub visitor_id: String,
    /// Per-browsing-episode identity
    pub session_id: String,
    /// Full page URL
    #[serde(default)]
    pub url: String,
    /// URL path, derived from `url` when the tracker omits it
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub hostname: String,
    /// Referrer URL; empty means direct traffic
    #[serde(default)]
    pub referrer: String,
    #[serde(default)]
    pub title: String,
    /// Client-derived device fields, trusted as reported
    #[serde(default)]
    pub browser: String,
    #[serde(default)]
    pub os: String,
    #[serde(default)]
    pub device_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen_height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewport_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewport_height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    /// Client IP, set by the server from proxy headers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    /// Type-dependent payload
    #[serde(flatten)]
    pub data: EventData,
}

impl Event {
    /// Returns the event type tag.
    pub fn event_type(&self) -> EventType {
        self.data.event_type()
    }

    /// UTC day the event belongs to (rollup bucket key).
    pub fn day(&self) -> chrono::NaiveDate {
        self.timestamp.date_naive()
    }
}
