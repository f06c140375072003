use std::any::Any;

use super::{properties, Worker};
use crate::core::RequestContext;
use crate::error::{ConstructionError, WorkerError};

/// Answers every request with a configured status and body.
///
/// | Property | Type | Default |
/// |----------|------|---------|
/// | `statusCode` | int | `200` |
/// | `statusMessage` | string | none |
/// | `response` | string | empty |
/// | `mirrorRequest` | bool | `false` |
///
/// With `mirrorRequest` the request body is echoed and `response` is ignored.
#[derive(Debug, Clone)]
pub struct NormalWorker {
    status_code: u16,
    status_message: Option<String>,
    response: String,
    mirror_request: bool,
}

impl Default for NormalWorker {
    fn default() -> Self {
        Self {
            status_code: 200,
            status_message: None,
            response: String::new(),
            mirror_request: false,
        }
    }
}

impl NormalWorker {
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    pub fn response(&self) -> &str {
        &self.response
    }

    pub fn mirror_request(&self) -> bool {
        self.mirror_request
    }

    /// Write the configured answer into `ctx`.
    pub(crate) fn respond(&self, ctx: &mut RequestContext) -> Result<(), WorkerError> {
        if let Some(ref message) = self.status_message {
            ctx.set_status_message(message.clone());
        }
        ctx.set_status(self.status_code)?;

        if self.mirror_request {
            let body = ctx.request().body().clone();
            ctx.end_with(body)
        } else if !self.response.is_empty() {
            ctx.end_with(self.response.clone())
        } else {
            ctx.end()
        }
    }

    pub(crate) fn apply(&mut self, key: &str, value: &str) -> Option<Result<(), ConstructionError>> {
        let applied = match key {
            "statusCode" => properties::int(key, value).map(|v| self.status_code = v),
            "statusMessage" => {
                self.status_message = Some(value.to_string());
                Ok(())
            }
            "response" => {
                self.response = value.to_string();
                Ok(())
            }
            "mirrorRequest" => properties::boolean(key, value).map(|v| self.mirror_request = v),
            _ => return None,
        };
        Some(applied)
    }
}

impl Worker for NormalWorker {
    fn work(&mut self, ctx: &mut RequestContext) -> Result<(), WorkerError> {
        self.respond(ctx)
    }

    fn name(&self) -> &'static str {
        "NormalWorker"
    }

    fn set_property(&mut self, key: &str, value: &str) -> Option<Result<(), ConstructionError>> {
        self.apply(key, value)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
