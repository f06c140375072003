use std::any::Any;
use std::time::Instant;

use super::{properties, DelayWorker, Worker};
use crate::core::RequestContext;
use crate::error::{ConstructionError, WorkerError};

const BAD_BODY: &str = "bad bad bad";

/// Rate-limited [`DelayWorker`].
///
/// A call arriving sooner than `1 / maxSpeed` seconds after the previous one
/// is answered with `badCode` and a fixed body. Every call, accepted or not,
/// restarts the interval. With `maxSpeed: 0` every call is refused.
#[derive(Debug, Clone)]
pub struct MaxSpeedWorker {
    inner: DelayWorker,
    max_speed: u32,
    bad_code: u16,
    last_called: Option<Instant>,
}

impl Default for MaxSpeedWorker {
    fn default() -> Self {
        Self {
            inner: DelayWorker::default(),
            max_speed: 1000,
            bad_code: 404,
            last_called: None,
        }
    }
}

impl MaxSpeedWorker {
    pub fn max_speed(&self) -> u32 {
        self.max_speed
    }

    pub fn bad_code(&self) -> u16 {
        self.bad_code
    }

    pub fn delay(&self) -> &DelayWorker {
        &self.inner
    }

    /// Minimum interval between accepted calls, in nanoseconds.
    fn min_interval_nanos(&self) -> f64 {
        1_000_000_000f64 / f64::from(self.max_speed)
    }

    fn is_too_fast(&self, now: Instant) -> bool {
        let min_interval = self.min_interval_nanos();
        match self.last_called {
            Some(last) => now.duration_since(last).as_nanos() as f64 <= min_interval,
            None => min_interval.is_infinite(),
        }
    }
}

impl Worker for MaxSpeedWorker {
    fn work(&mut self, ctx: &mut RequestContext) -> Result<(), WorkerError> {
        if self.is_too_fast(Instant::now()) {
            self.last_called = Some(Instant::now());
            ctx.set_status(self.bad_code)?;
            ctx.end_with(BAD_BODY)
        } else {
            let result = self.inner.respond(ctx);
            self.last_called = Some(Instant::now());
            result
        }
    }

    fn name(&self) -> &'static str {
        "MaxSpeedWorker"
    }

    fn set_property(&mut self, key: &str, value: &str) -> Option<Result<(), ConstructionError>> {
        match key {
            "maxSpeed" => Some(properties::int(key, value).map(|v| self.max_speed = v)),
            "badCode" => Some(properties::int(key, value).map(|v| self.bad_code = v)),
            _ => self.inner.apply(key, value),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_support::context;
    use std::time::Duration;

    fn worker(max_speed: &str) -> MaxSpeedWorker {
        let mut worker = MaxSpeedWorker::default();
        worker.set_property("maxSpeed", max_speed).unwrap().unwrap();
        worker.set_property("badCode", "429").unwrap().unwrap();
        worker.set_property("response", "ok").unwrap().unwrap();
        worker
    }

    #[test]
    fn test_first_call_passes() {
        let mut worker = worker("1");
        let mut ctx = context("", &[]);
        worker.work(&mut ctx).unwrap();
        assert_eq!(ctx.status().as_u16(), 200);
        assert_eq!(ctx.response_body().unwrap().as_ref(), b"ok");
    }

    #[test]
    fn test_fast_call_is_rejected() {
        let mut worker = worker("1");
        worker.work(&mut context("", &[])).unwrap();

        let mut ctx = context("", &[]);
        worker.work(&mut ctx).unwrap();
        assert_eq!(ctx.status().as_u16(), 429);
        assert_eq!(ctx.response_body().unwrap().as_ref(), BAD_BODY.as_bytes());
    }

    #[test]
    fn test_slow_call_passes() {
        let mut worker = worker("20");
        worker.work(&mut context("", &[])).unwrap();
        std::thread::sleep(Duration::from_millis(80));

        let mut ctx = context("", &[]);
        worker.work(&mut ctx).unwrap();
        assert_eq!(ctx.status().as_u16(), 200);
    }

    #[test]
    fn test_zero_speed_rejects_every_call() {
        let mut worker = worker("0");
        for _ in 0..2 {
            let mut ctx = context("", &[]);
            worker.work(&mut ctx).unwrap();
            assert_eq!(ctx.status().as_u16(), 429);
            assert_eq!(ctx.response_body().unwrap().as_ref(), BAD_BODY.as_bytes());
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn test_inherits_delay_properties() {
        let mut worker = MaxSpeedWorker::default();
        worker.set_property("delay", "7").unwrap().unwrap();
        worker.set_property("statusCode", "201").unwrap().unwrap();
        assert_eq!(worker.delay().delay_ms(), 7);
        assert_eq!(worker.delay().normal().status_code(), 201);
        assert_eq!(worker.max_speed(), 1000);
        assert_eq!(worker.bad_code(), 404);
    }
}
