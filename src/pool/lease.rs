use std::sync::Arc;

use super::{PooledWorker, WorkerPool};
use crate::worker::Worker;

/// Exclusive hold on one pooled worker.
///
/// The worker goes back to the pool when the lease is dropped, including
/// during unwinding.
pub struct WorkerLease {
    pool: Arc<WorkerPool>,
    worker: Option<PooledWorker>,
}

impl WorkerLease {
    pub(super) fn new(pool: Arc<WorkerPool>, worker: PooledWorker) -> Self {
        Self {
            pool,
            worker: Some(worker),
        }
    }

    fn held(&self) -> &PooledWorker {
        match &self.worker {
            Some(worker) => worker,
            None => unreachable!("lease already released"),
        }
    }

    pub fn id(&self) -> usize {
        self.held().id()
    }

    pub fn name(&self) -> &'static str {
        self.held().worker().name()
    }

    pub fn worker_mut(&mut self) -> &mut dyn Worker {
        match &mut self.worker {
            Some(worker) => worker.worker_mut(),
            None => unreachable!("lease already released"),
        }
    }
}

impl Drop for WorkerLease {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            self.pool.give_back(worker);
        }
    }
}
