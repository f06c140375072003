//! Basic HTTP tests: status, body, mirroring, headers.

use crate::helpers::*;
use reqwest::StatusCode;

/// Test the configured status and body of a NormalWorker
#[tokio::test]
async fn test_fixed_response() {
    let server = TestServer::start(&["2x NormalWorker = statusCode: 201, response: created"]).await;
    let resp = server.get("/anything").await;

    assert_status(&resp, StatusCode::CREATED);
    assert_body(resp, "created").await;
}

/// Test that a mirroring worker echoes the request body
#[tokio::test]
async fn test_mirror_request() {
    let server = TestServer::start(&["1x NormalWorker = mirrorRequest: true, response: ignored"]).await;
    let resp = server.post("/echo", "ping payload").await;

    assert_status(&resp, StatusCode::OK);
    assert_body(resp, "ping payload").await;
}

/// Test the empty default answer
#[tokio::test]
async fn test_default_worker_answers_empty_ok() {
    let server = TestServer::start(&["1x NormalWorker = "]).await;
    let resp = server.get("/").await;

    assert_status(&resp, StatusCode::OK);
    assert_body(resp, "").await;
}

/// Test that the status message becomes the HTTP/1 reason phrase
#[tokio::test]
async fn test_status_message_reason_phrase() {
    let server =
        TestServer::start(&["1x NormalWorker = statusCode: 333, statusMessage: Half Way There"]).await;
    let status_line = server.raw_status_line("/").await;

    assert_eq!(status_line, "HTTP/1.1 333 Half Way There");
}

/// Test that X-Request-ID is echoed back
#[tokio::test]
async fn test_request_id_echoed() {
    let server = TestServer::start(&["1x NormalWorker = "]).await;
    let resp = server
        .post_with_headers("/", "", &[("x-request-id", "trace-42")])
        .await;

    assert_header(&resp, "x-request-id", "trace-42");
}

/// Test that a request id is generated when absent
#[tokio::test]
async fn test_request_id_generated() {
    let server = TestServer::start(&["1x NormalWorker = "]).await;
    let resp = server.get("/").await;

    assert_has_header(&resp, "x-request-id");
    let id = resp.headers()["x-request-id"].to_str().unwrap();
    assert_eq!(id.len(), 32);
}

/// Test that idle keep-alive connections close on shutdown
#[tokio::test]
async fn test_shutdown_drains_keep_alive_connections() {
    let server = TestServer::start(&["1x NormalWorker = "]).await;
    assert_status(&server.get("/").await, StatusCode::OK);
    assert_eq!(server.server().active_connections(), 1);

    server.server().trigger_shutdown();
    assert!(
        server
            .server()
            .wait_for_drain(std::time::Duration::from_secs(5))
            .await
    );
    assert_eq!(server.server().active_connections(), 0);
}

/// Test that the listener is released on shutdown
#[tokio::test]
async fn test_shutdown_closes_listener() {
    let server = TestServer::start(&["1x NormalWorker = "]).await;
    assert_status(&server.get("/").await, StatusCode::OK);

    server.server().trigger_shutdown();

    // Give the accept loop a turn to observe the signal.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert!(tokio::net::TcpStream::connect(server.addr).await.is_err());
}
