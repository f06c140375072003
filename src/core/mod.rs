//! Transport-neutral request/response types.
//!
//! - [`Request`] - HTTP request with collected body
//! - [`Response`] - finished HTTP response
//! - [`RequestContext`] - the exchange a worker reads from and writes to

mod context;
mod request;
mod response;

pub use context::RequestContext;
pub use request::Request;
pub use response::Response;

#[cfg(test)]
pub(crate) use context::test_support;
