//! Rendezvous between callers asking for logs and the camera polling for work.
//!
//! A caller [`submit`](Coordinator::submit)s a range and blocks; the camera's
//! long-poll [`poll`](Coordinator::poll)s claim requests in FIFO order; the
//! camera's answer is routed back by [`report`](Coordinator::report) using the
//! correlation id.
//!
//! # Locking
//!
//! One mutex guards the pending queue and the in-flight table. Critical
//! sections only mutate the tables and signal; nothing is awaited while the
//! lock is held. Pollers park on a shared [`Notify`] that every submit wakes.
//! Each submitter parks on its own one-shot channel, which is filled by the
//! report under the same lock that a timeout uses to remove the entry, so
//! exactly one of the two wins.

mod pending;

pub use pending::RequestState;

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{oneshot, Notify};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{Result, TetherError};
use crate::models::{
    CoordinatorStats, LogRecord, LogsResponse, PollOutcome, Report, RequestId, ResolveStatus,
    TimeRange,
};
use pending::{PendingRequest, Tables};

/// Stand-in deadline for waits too long to represent as an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Shared state for one camera. Construct once and share behind an `Arc`.
#[derive(Debug, Default)]
pub struct Coordinator {
    tables: Mutex<Tables>,
    work_ready: Notify,
}

impl Coordinator {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        // Critical sections cannot leave the tables half-updated, so a
        // poisoned lock is still consistent.
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Ask the camera for the logs in `[start, end]` and wait for the answer.
    ///
    /// Fails with [`TetherError::InvalidRange`] before anything is queued if
    /// `start > end`.
    pub async fn submit(&self, start: f64, end: f64, max_wait: Duration) -> Result<LogsResponse> {
        let range = TimeRange::new(start, end)?;
        self.submit_range(range, max_wait).await
    }

    /// Queue a request for `range` and wait up to `max_wait` for its report.
    ///
    /// If this future is dropped before completing, the request is removed
    /// exactly as on timeout.
    pub async fn submit_range(&self, range: TimeRange, max_wait: Duration) -> Result<LogsResponse> {
        let (request, mut receiver) = PendingRequest::new(range);
        let id = request.id;
        self.tables().enqueue(request);
        self.work_ready.notify_waiters();
        debug!(request_id = %id, "Queued log request for {:?}", range);

        let mut guard = AbandonGuard {
            coordinator: self,
            id,
            armed: true,
        };

        let report = match tokio::time::timeout(max_wait, &mut receiver).await {
            Ok(Ok(report)) => report,
            Ok(Err(_)) => {
                guard.armed = false;
                return Err(TetherError::Other(format!(
                    "request {} was dropped without an outcome",
                    id
                )));
            }
            Err(_) => {
                guard.armed = false;
                self.settle_after_deadline(&id, &mut receiver, max_wait)?
            }
        };
        guard.armed = false;

        match report {
            Report::Logs(logs) => {
                debug!(request_id = %id, "Log request resolved with {} records", logs.len());
                Ok(LogsResponse {
                    request_id: id,
                    logs,
                })
            }
            Report::Failed(reason) => Err(TetherError::RequestFailed { id, reason }),
        }
    }

    /// Decide the outcome once the caller's wait has elapsed.
    ///
    /// Whoever removes the entry first wins: if expiry finds it gone, a
    /// report already took it and its value is waiting in `receiver`.
    fn settle_after_deadline(
        &self,
        id: &RequestId,
        receiver: &mut oneshot::Receiver<Report>,
        max_wait: Duration,
    ) -> Result<Report> {
        if self.expire(id) {
            info!(request_id = %id, "Log request timed out after {:?}", max_wait);
            return Err(TetherError::Timeout(max_wait));
        }
        receiver
            .try_recv()
            .map_err(|_| TetherError::Timeout(max_wait))
    }

    /// Long-poll for the oldest queued request.
    ///
    /// Returns [`PollOutcome::NoWork`] if nothing is queued within `max_wait`.
    pub async fn poll(&self, max_wait: Duration) -> PollOutcome {
        let now = Instant::now();
        let deadline = now.checked_add(max_wait).unwrap_or_else(|| now + FAR_FUTURE);
        loop {
            // Register interest before looking at the queue so a submit
            // landing between the check and the await is not missed.
            let notified = self.work_ready.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(dispatch) = self.tables().claim_next() {
                debug!(request_id = %dispatch.id, "Dispatched log request to poller");
                return PollOutcome::Dispatched(dispatch);
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return PollOutcome::NoWork;
            }
        }
    }

    /// Deliver the logs for an in-flight request.
    pub fn resolve(&self, id: &RequestId, logs: Vec<LogRecord>) -> ResolveStatus {
        self.report(id, Report::Logs(logs))
    }

    /// Deliver a device-side failure for an in-flight request.
    pub fn fail(&self, id: &RequestId, reason: impl Into<String>) -> ResolveStatus {
        self.report(id, Report::Failed(reason.into()))
    }

    /// Route a report to the caller waiting on `id`.
    ///
    /// Unknown, already answered or expired ids are ignored.
    pub fn report(&self, id: &RequestId, report: Report) -> ResolveStatus {
        let mut tables = self.tables();
        let Some(request) = tables.take_in_flight(id) else {
            drop(tables);
            warn!(request_id = %id, "Ignoring report for unknown or expired request");
            return ResolveStatus::Ignored;
        };
        let state = request.complete(report);
        drop(tables);
        debug!(request_id = %id, "Request reached {:?}", state);
        ResolveStatus::Accepted
    }

    /// Current lifecycle state, or `None` once the request left both tables.
    pub fn state_of(&self, id: &RequestId) -> Option<RequestState> {
        self.tables().state_of(id)
    }

    pub fn stats(&self) -> CoordinatorStats {
        let tables = self.tables();
        CoordinatorStats {
            queued: tables.queued(),
            in_flight: tables.in_flight(),
        }
    }

    /// Remove `id` from whichever table holds it. Returns false if a report
    /// (or an earlier expiry) got there first.
    fn expire(&self, id: &RequestId) -> bool {
        let Some(request) = self.tables().take_any(id) else {
            return false;
        };
        request.expire();
        true
    }
}

/// Removes the request if the submitting future is dropped mid-wait.
struct AbandonGuard<'a> {
    coordinator: &'a Coordinator,
    id: RequestId,
    armed: bool,
}

impl Drop for AbandonGuard<'_> {
    fn drop(&mut self) {
        if self.armed && self.coordinator.expire(&self.id) {
            info!(request_id = %self.id, "Log request abandoned by caller");
        }
    }
}
