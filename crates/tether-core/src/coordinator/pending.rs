//! Pending request bookkeeping behind the coordinator lock.

use std::collections::{HashMap, VecDeque};

use tokio::sync::oneshot;

use crate::models::{Dispatch, Report, RequestId, TimeRange};

/// Lifecycle of a submitted request.
///
/// `Queued -> InFlight -> {Resolved | Failed | Expired}`; a queued request may
/// also expire directly. Terminal states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Queued,
    InFlight,
    Resolved,
    Failed,
    Expired,
}

impl RequestState {
    fn can_transition_to(&self, next: RequestState) -> bool {
        matches!(
            (self, next),
            (RequestState::Queued, RequestState::InFlight)
                | (RequestState::Queued, RequestState::Expired)
                | (RequestState::InFlight, RequestState::Resolved)
                | (RequestState::InFlight, RequestState::Failed)
                | (RequestState::InFlight, RequestState::Expired)
        )
    }
}

/// One caller's outstanding ask, owned by the coordinator.
///
/// The caller only ever holds the id and the receiving half of `responder`.
#[derive(Debug)]
pub(crate) struct PendingRequest {
    pub(crate) id: RequestId,
    pub(crate) range: TimeRange,
    state: RequestState,
    responder: Option<oneshot::Sender<Report>>,
}

impl PendingRequest {
    pub(crate) fn new(range: TimeRange) -> (Self, oneshot::Receiver<Report>) {
        let (tx, rx) = oneshot::channel();
        let request = Self {
            id: RequestId::new(),
            range,
            state: RequestState::Queued,
            responder: Some(tx),
        };
        (request, rx)
    }

    pub(crate) fn state(&self) -> RequestState {
        self.state
    }

    fn transition(&mut self, next: RequestState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {:?} -> {:?} for request {}",
            self.state,
            next,
            self.id
        );
        self.state = next;
    }

    /// Deliver the terminal report to the waiting caller.
    ///
    /// Returns the terminal state reached. Must be called with the
    /// coordinator lock held so a racing timeout sees the value already sent.
    pub(crate) fn complete(mut self, report: Report) -> RequestState {
        let next = match report {
            Report::Logs(_) => RequestState::Resolved,
            Report::Failed(_) => RequestState::Failed,
        };
        self.transition(next);
        if let Some(responder) = self.responder.take() {
            // The receiver only disappears after its guard removed this entry,
            // so a closed channel here means nobody can observe the result.
            let _ = responder.send(report);
        }
        next
    }

    /// Mark expired and drop the responder without sending.
    pub(crate) fn expire(mut self) -> RequestState {
        self.transition(RequestState::Expired);
        RequestState::Expired
    }
}

/// The pending FIFO and the in-flight table. An id lives in at most one.
#[derive(Debug, Default)]
pub(crate) struct Tables {
    queue: VecDeque<PendingRequest>,
    in_flight: HashMap<RequestId, PendingRequest>,
}

impl Tables {
    pub(crate) fn enqueue(&mut self, request: PendingRequest) {
        debug_assert!(
            !self.contains(&request.id),
            "request {} enqueued twice",
            request.id
        );
        self.queue.push_back(request);
    }

    /// Pop the oldest queued request and move it in flight.
    pub(crate) fn claim_next(&mut self) -> Option<Dispatch> {
        let mut request = self.queue.pop_front()?;
        request.transition(RequestState::InFlight);
        let dispatch = Dispatch {
            id: request.id,
            range: request.range,
        };
        let previous = self.in_flight.insert(request.id, request);
        debug_assert!(
            previous.is_none(),
            "request {} claimed twice",
            dispatch.id
        );
        Some(dispatch)
    }

    /// Remove an in-flight request, if still tracked.
    pub(crate) fn take_in_flight(&mut self, id: &RequestId) -> Option<PendingRequest> {
        self.in_flight.remove(id)
    }

    /// Remove a request from whichever table holds it.
    pub(crate) fn take_any(&mut self, id: &RequestId) -> Option<PendingRequest> {
        if let Some(request) = self.in_flight.remove(id) {
            debug_assert!(
                !self.queue.iter().any(|queued| queued.id == *id),
                "request {} both queued and in flight",
                id
            );
            return Some(request);
        }
        let position = self.queue.iter().position(|queued| queued.id == *id)?;
        self.queue.remove(position)
    }

    pub(crate) fn state_of(&self, id: &RequestId) -> Option<RequestState> {
        self.in_flight
            .get(id)
            .or_else(|| self.queue.iter().find(|queued| queued.id == *id))
            .map(PendingRequest::state)
    }

    fn contains(&self, id: &RequestId) -> bool {
        self.state_of(id).is_some()
    }

    pub(crate) fn queued(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}
