//! Per-request lifecycle.

use std::fmt;

/// Lifecycle of one dispatched request.
///
/// ```text
/// Received ─▶ WorkerAcquired ─▶ Executing ─┬─▶ Completed ─┬─▶ WorkerReleased
///                                          └─▶ Failed ────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Received,
    WorkerAcquired,
    Executing,
    Completed,
    Failed,
    WorkerReleased,
}

impl RequestState {
    /// Advance to `next`, returning it when the transition is legal.
    pub fn advance(self, next: RequestState) -> Option<RequestState> {
        use RequestState::*;
        let legal = matches!(
            (self, next),
            (Received, WorkerAcquired)
                | (WorkerAcquired, Executing)
                | (Executing, Completed)
                | (Executing, Failed)
                | (Completed, WorkerReleased)
                | (Failed, WorkerReleased)
        );
        legal.then_some(next)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestState::Received => "received",
            RequestState::WorkerAcquired => "worker_acquired",
            RequestState::Executing => "executing",
            RequestState::Completed => "completed",
            RequestState::Failed => "failed",
            RequestState::WorkerReleased => "worker_released",
        }
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
