//! HTTP response produced by a worker.

use bytes::Bytes;
use http::header::HeaderName;
use http::{HeaderMap, HeaderValue, StatusCode};

/// Pre-allocated static bodies for transport-generated responses.
mod static_bodies {
    use super::*;
    pub static WORKER_FAILED: Bytes = Bytes::from_static(b"Internal Server Error");
    pub static SERVICE_UNAVAILABLE: Bytes = Bytes::from_static(b"Service Unavailable");
    pub static GATEWAY_TIMEOUT: Bytes = Bytes::from_static(b"Gateway Timeout");
}

/// Finished HTTP response.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    status_message: Option<String>,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    #[inline]
    pub fn new(status: StatusCode, status_message: Option<String>, body: Bytes) -> Self {
        Self {
            status,
            status_message,
            headers: HeaderMap::new(),
            body,
        }
    }

    /// 500 answered when a worker failed before ending its response.
    #[inline]
    pub fn worker_failed() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            None,
            static_bodies::WORKER_FAILED.clone(),
        )
    }

    /// 503 answered when the dispatcher no longer accepts requests.
    #[inline]
    pub fn service_unavailable() -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            None,
            static_bodies::SERVICE_UNAVAILABLE.clone(),
        )
    }

    /// 504 answered when the optional request timeout elapsed.
    #[inline]
    pub fn gateway_timeout() -> Self {
        Self::new(
            StatusCode::GATEWAY_TIMEOUT,
            None,
            static_bodies::GATEWAY_TIMEOUT.clone(),
        )
    }

    #[inline]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[inline]
    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[inline]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Add a header, silently skipping names or values that are not valid HTTP.
    #[inline]
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name.as_ref()),
            HeaderValue::try_from(value.as_ref()),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Convert into an `http::Response`.
    ///
    /// A custom status message travels as hyper's `ReasonPhrase` extension,
    /// which HTTP/1 connections write on the status line.
    pub fn into_http(self) -> http::Response<Bytes> {
        let mut res = http::Response::new(self.body);
        *res.status_mut() = self.status;
        *res.headers_mut() = self.headers;

        if let Some(message) = self.status_message {
            match hyper::ext::ReasonPhrase::try_from(message.into_bytes()) {
                Ok(phrase) => {
                    res.extensions_mut().insert(phrase);
                }
                Err(_) => tracing::debug!("status message is not a valid reason phrase"),
            }
        }

        res
    }
}
