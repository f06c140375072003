//! Per-connection HTTP handling.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming as IncomingBody;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tracing::{debug, warn};
use uuid::Uuid;

use super::access_log;
use crate::core::{Request, RequestContext, Response};
use crate::dispatch::Dispatcher;
use crate::error::DispatchError;

/// Slowloris protection for the request head.
const HEADER_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Check if an error is a common connection reset or timeout.
#[inline]
fn is_connection_error(err_str: &str) -> bool {
    err_str.contains("connection reset")
        || err_str.contains("broken pipe")
        || err_str.contains("Connection reset")
        || err_str.contains("os error 104")
        || err_str.contains("os error 32")
        || err_str.contains("timed out")
        || err_str.contains("HeaderTimeout")
}

/// Connection handler context shared by all connections.
pub struct ConnectionContext {
    pub dispatcher: Arc<Dispatcher>,
    pub active_connections: Arc<AtomicUsize>,
    pub request_timeout: Option<Duration>,
    pub access_log_enabled: bool,
}

impl ConnectionContext {
    /// Serve one TCP connection until the client closes it or shutdown is
    /// signalled. On shutdown, in-flight requests finish and idle keep-alive
    /// connections close right away.
    pub async fn handle_connection(
        self: Arc<Self>,
        stream: TcpStream,
        remote_addr: SocketAddr,
        mut shutdown: watch::Receiver<bool>,
    ) {
        self.active_connections.fetch_add(1, Ordering::Relaxed);

        let ctx = Arc::clone(&self);
        let service = service_fn(move |req| {
            let ctx = Arc::clone(&ctx);
            async move { ctx.handle_request(req).await }
        });

        let io = TokioIo::new(stream);
        let mut builder = auto::Builder::new(TokioExecutor::new());
        builder
            .http1()
            .timer(TokioTimer::new())
            .header_read_timeout(Some(HEADER_READ_TIMEOUT))
            .keep_alive(true);

        let conn = builder.serve_connection(io, service);
        tokio::pin!(conn);

        let mut draining = false;
        let result = loop {
            tokio::select! {
                result = conn.as_mut() => break result,
                _ = shutdown.changed(), if !draining => {
                    debug!(remote = %remote_addr, "Closing connection for shutdown");
                    draining = true;
                    conn.as_mut().graceful_shutdown();
                }
            }
        };

        if let Err(err) = result {
            let err_str = format!("{:?}", err);
            if !is_connection_error(&err_str) {
                debug!(remote = %remote_addr, "Connection error: {:?}", err);
            }
        }

        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    /// Collect the request, run it on a pooled worker, and convert the outcome.
    async fn handle_request(
        self: Arc<Self>,
        req: http::Request<IncomingBody>,
    ) -> Result<http::Response<Full<Bytes>>, Infallible> {
        let start = Instant::now();
        let (parts, body) = req.into_parts();

        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                debug!("Failed to read request body: {}", e);
                let res = http::Response::builder()
                    .status(http::StatusCode::BAD_REQUEST)
                    .body(Full::new(Bytes::from_static(b"Bad Request")))
                    .unwrap_or_default();
                return Ok(res);
            }
        };

        let request = Request::from(http::Request::from_parts(parts, body));
        let request_id = request
            .request_id()
            .map(str::to_owned)
            .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
        let method = request.method().clone();
        let path = request.path().to_owned();

        let ctx = RequestContext::new(request, request_id.clone());
        let (response, worker) = match self.dispatch(ctx).await {
            Ok(outcome) => {
                let worker = outcome.worker;
                (outcome.into_response(), Some(worker))
            }
            Err(e) if e.is_timeout() => {
                warn!(request_id = %request_id, error = %e, "Request timed out");
                (Response::gateway_timeout(), None)
            }
            Err(e) => {
                warn!(request_id = %request_id, error = %e, "Request not dispatched");
                (Response::service_unavailable(), None)
            }
        };

        if self.access_log_enabled {
            access_log::log_request(
                &request_id,
                method.as_str(),
                &path,
                response.status().as_u16(),
                worker,
                start.elapsed().as_secs_f64() * 1000.0,
            );
        }

        let response = response.with_header("x-request-id", &request_id);
        Ok(response.into_http().map(Full::new))
    }

    async fn dispatch(
        &self,
        ctx: RequestContext,
    ) -> Result<crate::dispatch::DispatchOutcome, DispatchError> {
        match self.request_timeout {
            Some(timeout) => self.dispatcher.execute_with_timeout(ctx, timeout).await,
            None => self.dispatcher.execute(ctx).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_connection_error() {
        assert!(is_connection_error("Io(Os { code: 104, .. }) os error 104"));
        assert!(is_connection_error("broken pipe"));
        assert!(!is_connection_error("invalid HTTP method parsed"));
    }
}
