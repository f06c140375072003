use std::any::Any;
use std::time::Duration;

use super::{properties, NormalWorker, Worker};
use crate::core::RequestContext;
use crate::error::{ConstructionError, WorkerError};

/// [`NormalWorker`] that blocks its dispatch thread for `delay` milliseconds first.
#[derive(Debug, Clone, Default)]
pub struct DelayWorker {
    inner: NormalWorker,
    delay_ms: u64,
}

impl DelayWorker {
    pub fn delay_ms(&self) -> u64 {
        self.delay_ms
    }

    pub fn normal(&self) -> &NormalWorker {
        &self.inner
    }

    pub(crate) fn respond(&self, ctx: &mut RequestContext) -> Result<(), WorkerError> {
        if self.delay_ms > 0 {
            std::thread::sleep(Duration::from_millis(self.delay_ms));
        }
        self.inner.respond(ctx)
    }

    pub(crate) fn apply(&mut self, key: &str, value: &str) -> Option<Result<(), ConstructionError>> {
        match key {
            "delay" => Some(properties::int(key, value).map(|v| self.delay_ms = v)),
            _ => self.inner.apply(key, value),
        }
    }
}

impl Worker for DelayWorker {
    fn work(&mut self, ctx: &mut RequestContext) -> Result<(), WorkerError> {
        self.respond(ctx)
    }

    fn name(&self) -> &'static str {
        "DelayWorker"
    }

    fn set_property(&mut self, key: &str, value: &str) -> Option<Result<(), ConstructionError>> {
        self.apply(key, value)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
