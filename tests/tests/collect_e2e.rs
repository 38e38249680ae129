//! End-to-end tests for the ingestion path.
//!
//! POST /collect → normalizer → event store, over the real router with a
//! temp-dir store.

use axum_test::TestServer;
use integration_tests::{fixtures, setup::TestContext};

#[tokio::test]
async fn test_collect_pageview_e2e() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server.post("/collect").json(&fixtures::pageview("/home")).await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["eventId"], 1);

    assert_eq!(ctx.stored_event_count(), 1);
}

#[tokio::test]
async fn test_collect_assigns_increasing_ids() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let mut last_id = 0u64;
    for i in 0..5 {
        let response = server
            .post("/collect")
            .json(&fixtures::pageview(&format!("/page-{i}")))
            .await;
        response.assert_status_ok();

        let body: serde_json::Value = response.json();
        let id = body["eventId"].as_u64().expect("eventId present");
        assert!(id > last_id, "ids must increase: {id} after {last_id}");
        last_id = id;
    }

    assert_eq!(ctx.stored_event_count(), 5);
}

#[tokio::test]
async fn test_collect_survives_reopen() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    for _ in 0..3 {
        server
            .post("/collect")
            .json(&fixtures::tracker_event("pageview"))
            .await
            .assert_status_ok();
    }
    ctx.store.flush().expect("flush");

    // Reopen the same data dir: everything is still there
    let store = eventstore::EventStore::open(eventstore::StoreConfig {
        data_dir: ctx.data_dir.path().to_path_buf(),
        fsync: false,
    })
    .expect("reopen");
    assert_eq!(store.totals().0, 3);
}

#[tokio::test]
async fn test_collect_unknown_event_type_accepted() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server
        .post("/collect")
        .json(&fixtures::tracker_event("brand_new_tracker_event"))
        .await;

    response.assert_status_ok();
    assert_eq!(ctx.stored_event_count(), 1);
}

#[tokio::test]
async fn test_concurrent_collects_all_stored() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    // Near-simultaneous writes from independent sessions; none may be lost
    let send = |i: usize| {
        let server = &server;
        async move {
            server
                .post("/collect")
                .json(&fixtures::pageview(&format!("/burst-{i}")))
                .await
                .assert_status_ok();
        }
    };

    tokio::join!(
        send(0),
        send(1),
        send(2),
        send(3),
        send(4),
        send(5),
        send(6),
        send(7),
        send(8),
        send(9),
    );

    assert_eq!(ctx.stored_event_count(), 10);
}
