//! Health and diagnostics endpoints.

use axum_test::TestServer;
use integration_tests::{fixtures, setup::TestContext};
use serde_json::Value;

#[tokio::test]
async fn test_health_reports_store() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();

    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store_healthy"], true);
}

#[tokio::test]
async fn test_probes() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    server.get("/health/live").await.assert_status_ok();
    server.get("/health/ready").await.assert_status_ok();
}

#[tokio::test]
async fn test_metrics_shape() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    server
        .post("/collect")
        .json(&fixtures::pageview("/metrics-check"))
        .await
        .assert_status_ok();

    let response = server.get("/metrics").await;
    response.assert_status_ok();
    let body: Value = response.json();

    for key in [
        "requests_total",
        "events_collected",
        "events_rejected",
        "store_appends",
        "store_write_errors",
        "queries_total",
    ] {
        assert!(body.get(key).is_some(), "missing metrics key {key}");
    }
    assert!(body["events_collected"].as_u64().unwrap() >= 1);
}
