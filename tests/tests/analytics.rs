//! Dashboard query behavior over ingested events.

use axum_test::TestServer;
use integration_tests::{fixtures, setup::TestContext};
use serde_json::Value;

async fn ingest(server: &TestServer, payload: &Value) {
    server.post("/collect").json(payload).await.assert_status_ok();
}

#[tokio::test]
async fn test_pageview_totals_and_top_pages() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    for i in 0..3 {
        ingest(&server, &fixtures::pageview_for_visitor("/home", &format!("v{i}"))).await;
    }
    ingest(&server, &fixtures::pageview_for_visitor("/pricing", "v0")).await;

    let response = server.get("/api/analytics").add_query_param("range", "24h").await;
    response.assert_status_ok();
    let body: Value = response.json();

    assert_eq!(body["summary"]["totalPageviews"], 4);
    assert_eq!(body["summary"]["uniqueVisitors"], 3);
    assert_eq!(body["summary"]["uniqueSessions"], 3);

    let top_pages = body["topPages"].as_array().expect("topPages");
    assert_eq!(top_pages.len(), 2);
    assert_eq!(top_pages[0]["page"], "/home");
    assert_eq!(top_pages[0]["views"], 3);
    assert_eq!(top_pages[1]["page"], "/pricing");
    assert_eq!(top_pages[1]["views"], 1);
}

#[tokio::test]
async fn test_error_event_reported_verbatim() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    ingest(&server, &fixtures::error_event("TypeError: x is undefined")).await;

    let response = server.get("/api/analytics").add_query_param("range", "all").await;
    response.assert_status_ok();
    let body: Value = response.json();

    assert_eq!(body["errorCount"], 1);
    assert_eq!(body["recentErrors"][0], "TypeError: x is undefined");
    assert_eq!(body["topErrors"][0]["message"], "TypeError: x is undefined");
    assert_eq!(body["topErrors"][0]["count"], 1);
}

#[tokio::test]
async fn test_unknown_range_falls_back_to_default() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    ingest(&server, &fixtures::pageview("/home")).await;

    // range=foo must resolve to the 7d default, not error
    let response = server.get("/api/analytics").add_query_param("range", "foo").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["summary"]["totalPageviews"], 1);

    // Missing range behaves the same
    let response = server.get("/api/analytics").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["summary"]["totalPageviews"], 1);
}

#[tokio::test]
async fn test_all_ranges_see_fresh_events() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    ingest(&server, &fixtures::pageview("/now")).await;

    for range in ["24h", "7d", "30d", "all"] {
        let response = server.get("/api/analytics").add_query_param("range", range).await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(
            body["summary"]["totalPageviews"], 1,
            "range {range} missed the event"
        );
    }
}

#[tokio::test]
async fn test_click_ranking_in_snapshot() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    ingest(&server, &fixtures::click_event("button", "signup")).await;
    ingest(&server, &fixtures::click_event("button", "signup")).await;
    ingest(&server, &fixtures::click_event("a", "docs-link")).await;

    let response = server.get("/api/analytics").add_query_param("range", "24h").await;
    response.assert_status_ok();
    let body: Value = response.json();

    let clicks = body["topClicks"].as_array().expect("topClicks");
    assert_eq!(clicks.len(), 2);
    assert_eq!(clicks[0]["elementType"], "button");
    assert_eq!(clicks[0]["label"], "signup");
    assert_eq!(clicks[0]["count"], 2);
}

#[tokio::test]
async fn test_hostname_filter() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    ingest(&server, &fixtures::pageview("/main")).await;

    let mut other = fixtures::pageview("/blog-post");
    other["hostname"] = serde_json::json!("blog.example.com");
    ingest(&server, &other).await;

    let response = server
        .get("/api/analytics")
        .add_query_param("range", "24h")
        .add_query_param("hostname", "blog.example.com")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();

    assert_eq!(body["summary"]["totalPageviews"], 1);
    assert_eq!(body["topPages"][0]["page"], "/blog-post");
}

#[tokio::test]
async fn test_empty_store_yields_zero_snapshot() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server.get("/api/analytics").add_query_param("range", "7d").await;
    response.assert_status_ok();
    let body: Value = response.json();

    // "No data yet" is an empty snapshot, not an error state
    assert_eq!(body["summary"]["totalPageviews"], 0);
    assert_eq!(body["summary"]["totalEvents"], 0);
    assert!(body["topPages"].as_array().unwrap().is_empty());
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn test_device_histograms() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    ingest(&server, &fixtures::pageview("/a")).await;
    let mut mobile = fixtures::pageview("/b");
    mobile["browser"] = serde_json::json!("Safari");
    mobile["os"] = serde_json::json!("iOS");
    mobile["deviceType"] = serde_json::json!("mobile");
    ingest(&server, &mobile).await;

    let response = server.get("/api/analytics").add_query_param("range", "24h").await;
    response.assert_status_ok();
    let body: Value = response.json();

    let browsers = body["browsers"].as_array().expect("browsers");
    assert_eq!(browsers.len(), 2);
    let devices = body["devices"].as_array().expect("devices");
    assert!(devices
        .iter()
        .any(|d| d["device"] == "mobile" && d["count"] == 1));
    let oses = body["operatingSystems"].as_array().expect("operatingSystems");
    assert!(oses.iter().any(|o| o["os"] == "iOS"));
}
