//! Ingestion rejection behavior.
//!
//! Rejected payloads must look like successes to the tracker while leaving
//! the store untouched.

use axum_test::TestServer;
use integration_tests::{fixtures, setup::TestContext};

#[tokio::test]
async fn test_missing_identity_swallowed() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server
        .post("/collect")
        .json(&fixtures::missing_identity_event())
        .await;

    // Success-shaped response, no eventId, nothing stored
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], true);
    assert!(body.get("eventId").is_none());
    assert_eq!(ctx.stored_event_count(), 0);
}

#[tokio::test]
async fn test_malformed_json_swallowed() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server
        .post("/collect")
        .content_type("application/json")
        .bytes("this is not json".into())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(ctx.stored_event_count(), 0);
}

#[tokio::test]
async fn test_oversized_payload_swallowed() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server
        .post("/collect")
        .json(&fixtures::oversized_event())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(ctx.stored_event_count(), 0);
}

#[tokio::test]
async fn test_rejects_visible_in_diagnostics() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let before: serde_json::Value = server.get("/metrics").await.json();

    server
        .post("/collect")
        .json(&fixtures::missing_identity_event())
        .await
        .assert_status_ok();

    let after: serde_json::Value = server.get("/metrics").await.json();

    // Metrics are process-global, so assert growth rather than totals
    let rejected = |v: &serde_json::Value| {
        v["rejects_missing_identity"].as_u64().unwrap_or(0)
    };
    assert!(rejected(&after) > rejected(&before));
}

#[tokio::test]
async fn test_reject_does_not_break_subsequent_collects() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    server
        .post("/collect")
        .json(&fixtures::missing_identity_event())
        .await
        .assert_status_ok();
    server
        .post("/collect")
        .json(&fixtures::pageview("/after-reject"))
        .await
        .assert_status_ok();

    assert_eq!(ctx.stored_event_count(), 1);
}
