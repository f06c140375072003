//! Dispatch engine.
//!
//! A fixed set of named threads pulls requests from an unbounded queue. For
//! each request a thread leases one worker from the shared [`WorkerPool`],
//! runs it, and returns it to the pool whatever the outcome.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Dispatcher                           │
//! ├──────────────────────────────────────────────────────────────┤
//! │  execute() ──▶ crossbeam channel (unbounded) ──┐             │
//! │     ▲                                          │             │
//! │     │ oneshot      ┌──────────────┬───────────┴──┐          │
//! │     │              ▼              ▼              ▼          │
//! │     │      worker-thread-0  worker-thread-1  ...            │
//! │     │              │  lease ▲ / drop ▼                       │
//! │     │              └──────▶ WorkerPool ◀─────────┘          │
//! │     └──────────── DispatchOutcome                            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Worker failures never reach the caller as errors: an `Err` or a panic
//! from [`Worker::work`](crate::worker::Worker::work) is logged and the
//! outcome carries it, while the worker goes back to the pool unchanged.

mod state;
mod stats;

pub use state::RequestState;
pub use stats::{DispatchStats, StatsSnapshot};

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, error, info, trace};

use crate::core::{RequestContext, Response};
use crate::error::{DispatchError, DispatchResult, WorkerError};
use crate::pool::WorkerPool;

/// Name prefix of dispatch threads.
pub const THREAD_NAME_PREFIX: &str = "worker-thread";

/// A queued request with its reply channel.
struct Job {
    ctx: RequestContext,
    reply: oneshot::Sender<DispatchOutcome>,
    queued_at: Instant,
}

/// Result of running one request through a pooled worker.
#[derive(Debug)]
pub struct DispatchOutcome {
    /// Pool id of the worker that handled the request.
    pub worker_id: usize,
    pub worker: &'static str,
    /// `Completed` or `Failed`.
    pub state: RequestState,
    pub error: Option<WorkerError>,
    /// Response to send, if the worker produced one.
    pub response: Option<Response>,
    /// Time spent waiting for a thread and a worker.
    pub queued: Duration,
    /// Time spent inside the worker.
    pub elapsed: Duration,
}

impl DispatchOutcome {
    #[inline]
    pub fn succeeded(&self) -> bool {
        self.state == RequestState::Completed
    }

    /// Response for the transport: the worker's, or `500` when it failed
    /// before ending the response.
    pub fn into_response(self) -> Response {
        self.response.unwrap_or_else(Response::worker_failed)
    }
}

/// Fixed-size executor binding requests to pooled workers.
pub struct Dispatcher {
    jobs: Mutex<Option<Sender<Job>>>,
    threads: Mutex<Vec<JoinHandle<()>>>,
    thread_count: usize,
    pool: Arc<WorkerPool>,
    stats: Arc<DispatchStats>,
}

impl Dispatcher {
    /// Spawn `thread_count` dispatch threads serving `pool`.
    pub fn new(pool: Arc<WorkerPool>, thread_count: usize) -> std::io::Result<Self> {
        let (tx, rx) = channel::unbounded::<Job>();
        let stats = Arc::new(DispatchStats::default());

        let mut threads = Vec::with_capacity(thread_count);
        for index in 0..thread_count {
            let rx = rx.clone();
            let pool = Arc::clone(&pool);
            let stats = Arc::clone(&stats);

            let handle = thread::Builder::new()
                .name(format!("{}-{}", THREAD_NAME_PREFIX, index))
                .spawn(move || dispatch_loop(index, rx, pool, stats))?;
            threads.push(handle);
        }

        info!(
            threads = thread_count,
            workers = pool.size(),
            "dispatcher started"
        );

        Ok(Self {
            jobs: Mutex::new(Some(tx)),
            threads: Mutex::new(threads),
            thread_count,
            pool,
            stats,
        })
    }

    /// Queue a request and wait for its outcome.
    ///
    /// Waits as long as the worker takes, including forever.
    pub async fn execute(&self, ctx: RequestContext) -> DispatchResult<DispatchOutcome> {
        let reply = self.submit(ctx)?;
        reply.await.map_err(|_| DispatchError::ChannelClosed)
    }

    /// Queue a request and stop waiting after `timeout`.
    ///
    /// The request keeps its dispatch thread and worker until the worker
    /// returns; only the caller gives up.
    pub async fn execute_with_timeout(
        &self,
        ctx: RequestContext,
        timeout: Duration,
    ) -> DispatchResult<DispatchOutcome> {
        let reply = self.submit(ctx)?;
        match tokio::time::timeout(timeout, reply).await {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(_)) => Err(DispatchError::ChannelClosed),
            Err(_) => Err(DispatchError::Timeout(timeout)),
        }
    }

    fn submit(&self, ctx: RequestContext) -> DispatchResult<oneshot::Receiver<DispatchOutcome>> {
        let (reply, rx) = oneshot::channel();
        let job = Job {
            ctx,
            reply,
            queued_at: Instant::now(),
        };

        let jobs = self.jobs.lock();
        let tx = jobs.as_ref().ok_or(DispatchError::Shutdown)?;
        tx.send(job).map_err(|_| DispatchError::Shutdown)?;
        self.stats.record_submitted();
        Ok(rx)
    }

    #[inline]
    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    #[inline]
    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn is_shutdown(&self) -> bool {
        self.jobs.lock().is_none()
    }

    /// Stop accepting requests. Threads exit once the queue is drained.
    pub fn shutdown(&self) {
        if self.jobs.lock().take().is_some() {
            info!(threads = self.thread_count, "shutting down dispatcher");
        }
    }

    /// Wait for all dispatch threads to exit (call after shutdown).
    pub fn join(&self) {
        let threads: Vec<_> = self.threads.lock().drain(..).collect();
        for handle in threads {
            let _ = handle.join();
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Dispatch thread main loop.
fn dispatch_loop(
    index: usize,
    jobs: Receiver<Job>,
    pool: Arc<WorkerPool>,
    stats: Arc<DispatchStats>,
) {
    debug!(thread = index, "dispatch thread started");

    for Job {
        ctx,
        reply,
        queued_at,
    } in jobs.iter()
    {
        let outcome = run(&pool, ctx, queued_at);
        if outcome.succeeded() {
            stats.record_completed();
        } else {
            stats.record_failed();
        }
        // The caller may have timed out and dropped the receiver.
        let _ = reply.send(outcome);
    }

    debug!(thread = index, "dispatch thread stopped");
}

/// Run one request on a leased worker.
fn run(pool: &Arc<WorkerPool>, mut ctx: RequestContext, queued_at: Instant) -> DispatchOutcome {
    let mut state = RequestState::Received;

    let mut lease = pool.lease();
    state = transition(state, RequestState::WorkerAcquired);
    let worker_id = lease.id();
    let worker = lease.name();
    let queued = queued_at.elapsed();
    trace!(request_id = ctx.request_id(), worker, worker_id, %state);

    state = transition(state, RequestState::Executing);
    let started = Instant::now();
    let result = catch_unwind(AssertUnwindSafe(|| lease.worker_mut().work(&mut ctx)))
        .unwrap_or_else(|payload| Err(WorkerError::Panic(panic_message(payload.as_ref()))));
    let elapsed = started.elapsed();

    let (error, response) = match result {
        Ok(()) => {
            state = transition(state, RequestState::Completed);
            (None, Some(ctx.finish()))
        }
        Err(e) => {
            state = transition(state, RequestState::Failed);
            error!(
                request_id = ctx.request_id(),
                worker,
                worker_id,
                error = %e,
                "Error processing request"
            );
            (Some(e), ctx.into_response())
        }
    };
    let outcome_state = state;

    drop(lease);
    state = transition(state, RequestState::WorkerReleased);
    trace!(worker, worker_id, %state);

    DispatchOutcome {
        worker_id,
        worker,
        state: outcome_state,
        error,
        response,
        queued,
        elapsed,
    }
}

fn transition(from: RequestState, to: RequestState) -> RequestState {
    debug_assert!(
        from.advance(to).is_some(),
        "illegal request transition {} -> {}",
        from,
        to
    );
    to
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_support::context;
    use crate::worker::{DelayWorker, NormalWorker, PropertyMap, Worker, WorkerFactory};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn normal(status: &str) -> Box<dyn Worker> {
        let props: PropertyMap = [("statusCode", status), ("response", "ok")]
            .into_iter()
            .collect();
        WorkerFactory::with_builtin()
            .construct("NormalWorker", &props)
            .unwrap()
    }

    fn pool_with(workers: Vec<Box<dyn Worker>>) -> Arc<WorkerPool> {
        let pool = Arc::new(WorkerPool::new());
        for worker in workers {
            pool.admit(worker);
        }
        pool
    }

    /// Fails or panics depending on the request body.
    #[derive(Default)]
    struct Flaky {
        calls: usize,
    }

    impl Worker for Flaky {
        fn work(&mut self, ctx: &mut RequestContext) -> Result<(), WorkerError> {
            self.calls += 1;
            match ctx.request().body().as_ref() {
                b"panic" => panic!("flaky worker panicked"),
                b"fail" => Err(WorkerError::Failed("flaky".into())),
                b"late" => {
                    ctx.end_with("partial")?;
                    Err(WorkerError::Failed("after end".into()))
                }
                _ => ctx.end_with(format!("call {}", self.calls)),
            }
        }

        fn name(&self) -> &'static str {
            "Flaky"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    /// Records whether two requests ever hold the same instance.
    struct Exclusive {
        busy: AtomicBool,
        violations: Arc<AtomicUsize>,
    }

    impl Worker for Exclusive {
        fn work(&mut self, ctx: &mut RequestContext) -> Result<(), WorkerError> {
            if self.busy.swap(true, Ordering::SeqCst) {
                self.violations.fetch_add(1, Ordering::SeqCst);
            }
            thread::sleep(Duration::from_millis(1));
            self.busy.store(false, Ordering::SeqCst);
            ctx.end()
        }

        fn name(&self) -> &'static str {
            "Exclusive"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[tokio::test]
    async fn test_basic_execution() {
        let dispatcher = Dispatcher::new(pool_with(vec![normal("201")]), 1).unwrap();

        let outcome = dispatcher.execute(context("", &[])).await.unwrap();
        assert!(outcome.succeeded());
        assert_eq!(outcome.worker, "NormalWorker");

        let response = outcome.into_response();
        assert_eq!(response.status().as_u16(), 201);
        assert_eq!(response.body().as_ref(), b"ok");
        assert_eq!(dispatcher.stats().completed, 1);
    }

    #[tokio::test]
    async fn test_failure_recycles_worker() {
        let pool = pool_with(vec![Box::new(Flaky::default())]);
        let dispatcher = Dispatcher::new(Arc::clone(&pool), 1).unwrap();

        let outcome = dispatcher.execute(context("fail", &[])).await.unwrap();
        assert_eq!(outcome.state, RequestState::Failed);
        assert_eq!(outcome.error, Some(WorkerError::Failed("flaky".into())));
        assert_eq!(outcome.into_response().status().as_u16(), 500);

        let outcome = dispatcher.execute(context("", &[])).await.unwrap();
        assert!(outcome.succeeded());
        assert_eq!(outcome.into_response().body().as_ref(), b"call 2");
        assert_eq!(pool.idle_count(), 1);
    }

    #[tokio::test]
    async fn test_panic_is_caught_and_worker_returned() {
        let pool = pool_with(vec![Box::new(Flaky::default())]);
        let dispatcher = Dispatcher::new(Arc::clone(&pool), 1).unwrap();

        let outcome = dispatcher.execute(context("panic", &[])).await.unwrap();
        assert_eq!(
            outcome.error,
            Some(WorkerError::Panic("flaky worker panicked".into()))
        );

        let outcome = dispatcher.execute(context("", &[])).await.unwrap();
        assert_eq!(outcome.worker_id, 0);
        assert!(outcome.succeeded());
        assert_eq!(pool.idle_count(), 1);
        assert_eq!(dispatcher.stats().failed, 1);
    }

    #[tokio::test]
    async fn test_response_ended_before_failure_is_kept() {
        let dispatcher = Dispatcher::new(pool_with(vec![Box::new(Flaky::default())]), 1).unwrap();

        let outcome = dispatcher.execute(context("late", &[])).await.unwrap();
        assert!(!outcome.succeeded());
        let response = outcome.into_response();
        assert_eq!(response.status().as_u16(), 200);
        assert_eq!(response.body().as_ref(), b"partial");
    }

    #[tokio::test]
    async fn test_at_most_one_holder_under_load() {
        let violations = Arc::new(AtomicUsize::new(0));
        let workers = (0..3)
            .map(|_| {
                Box::new(Exclusive {
                    busy: AtomicBool::new(false),
                    violations: Arc::clone(&violations),
                }) as Box<dyn Worker>
            })
            .collect();
        let pool = pool_with(workers);
        let dispatcher = Dispatcher::new(Arc::clone(&pool), 3).unwrap();

        let futures: Vec<_> = (0..60).map(|_| dispatcher.execute(context("", &[]))).collect();
        let outcomes = futures_util::future::join_all(futures).await;

        assert!(outcomes.iter().all(|o| o.as_ref().unwrap().succeeded()));
        assert_eq!(violations.load(Ordering::SeqCst), 0);
        assert_eq!(pool.idle_count(), 3);
        assert_eq!(dispatcher.stats().in_flight(), 0);
    }

    #[tokio::test]
    async fn test_timeout() {
        let mut slow = DelayWorker::default();
        slow.set_property("delay", "2000").unwrap().unwrap();
        let dispatcher = Dispatcher::new(pool_with(vec![Box::new(slow)]), 1).unwrap();

        let result = dispatcher
            .execute_with_timeout(context("", &[]), Duration::from_millis(100))
            .await;
        assert!(result.unwrap_err().is_timeout());
    }

    #[tokio::test]
    async fn test_shutdown_rejects_new_requests() {
        let dispatcher = Dispatcher::new(pool_with(vec![Box::new(NormalWorker::default())]), 2).unwrap();
        assert_eq!(dispatcher.thread_count(), 2);

        dispatcher.shutdown();
        assert!(dispatcher.is_shutdown());
        let result = dispatcher.execute(context("", &[])).await;
        assert!(result.unwrap_err().is_shutdown());

        dispatcher.join();
    }

    #[test]
    fn test_threads_are_named() {
        let pool = pool_with(vec![normal("200")]);
        let dispatcher = Dispatcher::new(pool, 2).unwrap();
        let names: Vec<_> = dispatcher
            .threads
            .lock()
            .iter()
            .map(|h| h.thread().name().unwrap_or_default().to_string())
            .collect();
        assert_eq!(names, vec!["worker-thread-0", "worker-thread-1"]);
    }
}
