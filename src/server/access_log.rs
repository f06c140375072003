//! Access logging.
//!
//! Access events go to the `access` target; the JSON formatter renders them
//! as `type: "access"` entries with a `METHOD /path STATUS` message.

/// Log one dispatched request.
pub fn log_request(
    request_id: &str,
    method: &str,
    path: &str,
    status: u16,
    worker: Option<&str>,
    duration_ms: f64,
) {
    tracing::info!(
        target: "access",
        request_id,
        method,
        path,
        status,
        worker = worker.unwrap_or("-"),
        duration_ms,
        "{} {} {}",
        method,
        path,
        status
    );
}
