//! Dispatch behavior over HTTP: failure recycling, exclusivity, timeouts.

use std::time::Duration;

use crate::helpers::*;
use futures_util::future::join_all;
use reqwest::StatusCode;

/// Test that a failing worker answers 500 and stays in the pool
#[tokio::test]
async fn test_failing_worker_is_recycled() {
    let server = TestServer::start(&["1x NormalWorker = statusCode: 42"]).await;

    for _ in 0..3 {
        assert_status(&server.get("/").await, StatusCode::INTERNAL_SERVER_ERROR);
    }

    let stats = server.server().dispatcher().stats();
    assert_eq!(stats.failed, 3);
    assert_eq!(server.server().dispatcher().pool().idle_count(), 1);
}

/// Test that requests queue behind a single busy worker
#[tokio::test]
async fn test_concurrent_requests_share_pool() {
    let server = TestServer::start_with(
        &["2x DelayWorker = delay: 20, response: done"],
        Options {
            threads: 4,
            ..Options::default()
        },
    )
    .await;

    let responses = join_all((0..12).map(|_| server.get("/"))).await;
    for resp in responses {
        assert_status(&resp, StatusCode::OK);
        assert_body(resp, "done").await;
    }

    let stats = server.server().dispatcher().stats();
    assert_eq!(stats.completed, 12);
    assert_eq!(stats.in_flight(), 0);
}

/// Test that an empty pool hits the request timeout
#[tokio::test]
async fn test_empty_pool_times_out() {
    let server = TestServer::start_with(
        &["2x SwitchingWorker = switchPeriod: 5"],
        Options {
            request_timeout: Some(Duration::from_millis(200)),
            ..Options::default()
        },
    )
    .await;

    assert_eq!(server.server().dispatcher().pool().size(), 0);
    assert_status(&server.get("/").await, StatusCode::GATEWAY_TIMEOUT);
}

/// Test that mixed lines build one shared pool
#[tokio::test]
async fn test_mixed_worker_file() {
    let server = TestServer::start_with(
        &[
            "# comment lines and blanks are skipped",
            "",
            "1x NormalWorker = statusCode: 201",
            "not a worker line",
            "1x NoSuchWorker = statusCode: 200",
        ],
        Options {
            shuffle: true,
            ..Options::default()
        },
    )
    .await;

    assert_eq!(server.server().dispatcher().pool().size(), 1);
    assert_status(&server.get("/").await, StatusCode::CREATED);
}
