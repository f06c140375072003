//! Shared pool of ready workers.
//!
//! The pool is the only contended resource of the dispatch engine. It hands
//! out each worker to one holder at a time and takes it back afterwards:
//!
//! ```text
//!            take / lease                 give_back / lease drop
//! ┌──────────────────────────┐  ──────▶  ┌──────────────┐  ──────▶  ┌────────────┐
//! │ idle: [w3, w4, w0, ...]  │           │ worker-thread │           │ idle: [.., │
//! │ (FIFO, front is next)    │  ◀──────  │ runs w.work() │           │   w3]      │
//! └──────────────────────────┘           └──────────────┘           └────────────┘
//! ```
//!
//! Taking from an empty pool blocks until a worker is returned.

mod lease;

pub use lease::WorkerLease;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::worker::Worker;

/// A worker admitted to the pool, tagged with its admission order.
pub struct PooledWorker {
    id: usize,
    worker: Box<dyn Worker>,
}

impl PooledWorker {
    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    #[inline]
    pub fn worker(&self) -> &dyn Worker {
        self.worker.as_ref()
    }

    #[inline]
    pub fn worker_mut(&mut self) -> &mut dyn Worker {
        self.worker.as_mut()
    }
}

impl std::fmt::Debug for PooledWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledWorker")
            .field("id", &self.id)
            .field("worker", &self.worker.name())
            .finish()
    }
}

/// Thread-safe FIFO collection of idle workers.
pub struct WorkerPool {
    idle: Mutex<VecDeque<PooledWorker>>,
    available: Condvar,
    admitted: AtomicUsize,
}

impl WorkerPool {
    pub fn new() -> Self {
        Self {
            idle: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
            admitted: AtomicUsize::new(0),
        }
    }

    /// Add a newly built worker at the back of the queue. Returns its id.
    pub fn admit(&self, worker: Box<dyn Worker>) -> usize {
        let id = self.admitted.fetch_add(1, Ordering::SeqCst);
        self.give_back(PooledWorker { id, worker });
        id
    }

    /// Remove the front worker, blocking while the pool is empty.
    pub fn take(&self) -> PooledWorker {
        let mut idle = self.idle.lock();
        loop {
            if let Some(worker) = idle.pop_front() {
                return worker;
            }
            self.available.wait(&mut idle);
        }
    }

    /// Remove the front worker if one is idle.
    pub fn try_take(&self) -> Option<PooledWorker> {
        self.idle.lock().pop_front()
    }

    /// Return a worker to the back of the queue.
    pub fn give_back(&self, worker: PooledWorker) {
        self.idle.lock().push_back(worker);
        self.available.notify_one();
    }

    /// Take a worker that returns itself to the pool when dropped.
    pub fn lease(self: &Arc<Self>) -> WorkerLease {
        WorkerLease::new(Arc::clone(self), self.take())
    }

    /// Total number of workers ever admitted.
    pub fn size(&self) -> usize {
        self.admitted.load(Ordering::SeqCst)
    }

    /// Number of workers currently idle.
    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Ids of idle workers, front first.
    pub fn idle_ids(&self) -> Vec<usize> {
        self.idle.lock().iter().map(PooledWorker::id).collect()
    }

    /// Randomly reorder the idle workers.
    pub fn shuffle<R: Rng + ?Sized>(&self, rng: &mut R) {
        self.idle.lock().make_contiguous().shuffle(rng);
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new()
    }
}
