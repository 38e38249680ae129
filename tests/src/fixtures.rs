//! Test fixtures and tracker payload generators.

use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

/// Generate a valid tracker payload with unique identities.
pub fn tracker_event(event_type: &str) -> Value {
    json!({
        "eventType": event_type,
        "timestamp": Utc::now().to_rfc3339(),
        "visitorId": Uuid::new_v4().to_string(),
        "sessionId": Uuid::new_v4().to_string(),
        "url": "https://example.com/test",
        "path": "/test",
        "hostname": "example.com",
        "title": "Test Page",
        "browser": "Firefox",
        "os": "Linux",
        "deviceType": "desktop"
    })
}

/// Pageview for a specific path.
pub fn pageview(path: &str) -> Value {
    let mut event = tracker_event("pageview");
    event["path"] = json!(path);
    event["url"] = json!(format!("https://example.com{path}"));
    event
}

/// Pageview attributed to a fixed visitor.
pub fn pageview_for_visitor(path: &str, visitor_id: &str) -> Value {
    let mut event = pageview(path);
    event["visitorId"] = json!(visitor_id);
    event["sessionId"] = json!(format!("{visitor_id}-session"));
    event
}

/// Script error event with a verbatim message.
pub fn error_event(message: &str) -> Value {
    let mut event = tracker_event("error");
    event["message"] = json!(message);
    event["stack"] = json!("at app.js:10:3");
    event
}

/// Click on a tracked element.
pub fn click_event(element_type: &str, data_track: &str) -> Value {
    let mut event = tracker_event("click");
    event["elementType"] = json!(element_type);
    event["dataTrack"] = json!(data_track);
    event
}

/// Payload with no visitor identity.
pub fn missing_identity_event() -> Value {
    let mut event = tracker_event("pageview");
    event.as_object_mut().unwrap().remove("visitorId");
    event
}

/// Payload exceeding the 32KB event limit.
pub fn oversized_event() -> Value {
    let mut event = tracker_event("custom");
    event["properties"] = json!({ "blob": "x".repeat(33 * 1024) });
    event
}
