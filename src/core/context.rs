//! Request context handed to workers.
//!
//! The context pairs the read-only [`Request`] with the mutable response
//! state a worker fills in. A worker sets the status code and an optional
//! status message, then ends the response with or without a body.

use bytes::Bytes;
use http::StatusCode;

use super::{Request, Response};
use crate::error::WorkerError;

/// Mutable response state of an in-flight request.
#[derive(Debug)]
struct ResponseState {
    status: StatusCode,
    status_message: Option<String>,
    body: Option<Bytes>,
}

/// Request/response exchange owned by exactly one worker at a time.
#[derive(Debug)]
pub struct RequestContext {
    request: Request,
    request_id: String,
    response: ResponseState,
}

impl RequestContext {
    pub fn new(request: Request, request_id: impl Into<String>) -> Self {
        Self {
            request,
            request_id: request_id.into(),
            response: ResponseState {
                status: StatusCode::OK,
                status_message: None,
                body: None,
            },
        }
    }

    #[inline]
    pub fn request(&self) -> &Request {
        &self.request
    }

    #[inline]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Set the response status code.
    pub fn set_status(&mut self, code: u16) -> Result<(), WorkerError> {
        self.response.status =
            StatusCode::from_u16(code).map_err(|_| WorkerError::InvalidStatus(code))?;
        Ok(())
    }

    pub fn set_status_message(&mut self, message: impl Into<String>) {
        self.response.status_message = Some(message.into());
    }

    #[inline]
    pub fn status(&self) -> StatusCode {
        self.response.status
    }

    /// End the response without a body.
    pub fn end(&mut self) -> Result<(), WorkerError> {
        self.end_with(Bytes::new())
    }

    /// End the response with a body. A response can be ended only once.
    pub fn end_with(&mut self, body: impl Into<Bytes>) -> Result<(), WorkerError> {
        if self.response.body.is_some() {
            return Err(WorkerError::AlreadyEnded);
        }
        self.response.body = Some(body.into());
        Ok(())
    }

    #[inline]
    pub fn is_ended(&self) -> bool {
        self.response.body.is_some()
    }

    /// The body written by the worker, if it ended the response.
    pub fn response_body(&self) -> Option<&Bytes> {
        self.response.body.as_ref()
    }

    /// Take the finished response, or `None` when no worker ended it.
    pub fn into_response(self) -> Option<Response> {
        let ResponseState {
            status,
            status_message,
            body,
        } = self.response;
        body.map(|body| Response::new(status, status_message, body))
    }

    /// Take the response, ending it with an empty body if still open.
    pub fn finish(self) -> Response {
        let ResponseState {
            status,
            status_message,
            body,
        } = self.response;
        Response::new(status, status_message, body.unwrap_or_default())
    }
}
