//! Worker behavior over HTTP: delay, rate limiting, leaking, switching.

use std::time::{Duration, Instant};

use crate::helpers::*;
use reqwest::StatusCode;
use weaver::worker::{DelayWorker, NormalWorker, SwitchingWorker};
use weaver::Weaver;

/// Test that a DelayWorker holds the request for its delay
#[tokio::test]
async fn test_delay_worker_latency() {
    let server = TestServer::start(&["1x DelayWorker = delay: 150, response: slow"]).await;

    let start = Instant::now();
    let resp = server.get("/").await;
    assert!(start.elapsed() >= Duration::from_millis(150));

    assert_status(&resp, StatusCode::OK);
    assert_body(resp, "slow").await;
}

/// Test that a call arriving too soon is refused
#[tokio::test]
async fn test_max_speed_rejects_rapid_calls() {
    let server = TestServer::start(&["1x MaxSpeedWorker = maxSpeed: 1, response: fine"]).await;

    let first = server.get("/").await;
    assert_status(&first, StatusCode::OK);
    assert_body(first, "fine").await;

    let second = server.get("/").await;
    assert_status(&second, StatusCode::NOT_FOUND);
    assert_body(second, "bad bad bad").await;
}

/// Test the configured rejection code
#[tokio::test]
async fn test_max_speed_custom_bad_code() {
    let server = TestServer::start(&["1x MaxSpeedWorker = maxSpeed: 1, badCode: 429"]).await;

    assert_status(&server.get("/").await, StatusCode::OK);
    assert_status(&server.get("/").await, StatusCode::TOO_MANY_REQUESTS);
}

/// Test that a leaking worker still answers like a NormalWorker
#[tokio::test]
async fn test_memory_leak_worker_answers() {
    let server =
        TestServer::start(&["1x MemoryLeakWorker = keyHeader: x-register, statusCode: 202, response: kept"]).await;

    for _ in 0..3 {
        let resp = server
            .post_with_headers("/", "leaked payload", &[("x-register", "tenant-a")])
            .await;
        assert_status(&resp, StatusCode::ACCEPTED);
        assert_body(resp, "kept").await;
    }
}

/// Test the switching cadence of the nested fixture
#[tokio::test]
async fn test_switching_cadence() {
    let server = TestServer::from_file(&fixture("switching.cfg"), Options::default()).await;

    let mut codes = Vec::new();
    for _ in 0..6 {
        codes.push(server.get("/").await.status().as_u16());
    }

    assert_eq!(codes, vec![333, 200, 201, 333, 200, 202]);
}

/// Test that the nested fixture builds the expected worker tree
#[test]
fn test_switching_fixture_structure() {
    let mut weaver = Weaver::default();
    assert_eq!(weaver.load_file(&fixture("switching.cfg")).unwrap(), 1);

    let pooled = weaver.pool().try_take().expect("switching worker in pool");
    let outer = pooled
        .worker()
        .downcast_ref::<SwitchingWorker>()
        .expect("outer SwitchingWorker");
    assert_eq!(outer.switch_period(), 1010);

    let delegates = outer.delegates();
    assert_eq!(delegates.len(), 3);

    let normal = delegates[0].downcast_ref::<NormalWorker>().unwrap();
    assert_eq!(normal.status_code(), 333);

    let delay = delegates[1].downcast_ref::<DelayWorker>().unwrap();
    assert_eq!(delay.delay_ms(), 100);

    let nested = delegates[2].downcast_ref::<SwitchingWorker>().unwrap();
    assert_eq!(nested.switch_period(), 1000);
    assert_eq!(nested.delegates().len(), 2);
    assert_eq!(delegates[2].name(), "SwitchingWorker");
}
