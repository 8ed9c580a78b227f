//! Shared data types and wire payloads.
//!
//! Field names on the wire are camelCase (`requestId`, `startTimestamp`, ...)
//! so the camera and any HTTP caller see the same shapes.

use crate::error::{Result, TetherError};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Correlation token linking a submitted request to its poll claim and report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generate a fresh, globally unique id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Closed time interval `[start, end]` in unix seconds.
///
/// Unbounded sides are stored as infinities and travel on the wire as absent
/// fields, since JSON has no representation for them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRange {
    start: f64,
    end: f64,
}

impl TimeRange {
    /// Build a range, rejecting `start > end` (and NaN bounds).
    pub fn new(start: f64, end: f64) -> Result<Self> {
        if start.is_nan() || end.is_nan() || start > end {
            return Err(TetherError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Build a range from optional bounds; a missing bound is unbounded.
    pub fn from_bounds(start: Option<f64>, end: Option<f64>) -> Result<Self> {
        Self::new(
            start.unwrap_or(f64::NEG_INFINITY),
            end.unwrap_or(f64::INFINITY),
        )
    }

    /// The range covering every possible timestamp.
    pub fn all_time() -> Self {
        Self {
            start: f64::NEG_INFINITY,
            end: f64::INFINITY,
        }
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    /// Lower bound, or `None` if unbounded.
    pub fn start_bound(&self) -> Option<f64> {
        self.start.is_finite().then_some(self.start)
    }

    /// Upper bound, or `None` if unbounded.
    pub fn end_bound(&self) -> Option<f64> {
        self.end.is_finite().then_some(self.end)
    }

    pub fn contains(&self, timestamp: f64) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }
}

/// One immutable camera log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Unix timestamp in seconds.
    pub timestamp: f64,
    pub description: String,
}

impl LogRecord {
    pub fn new(timestamp: f64, description: impl Into<String>) -> Self {
        Self {
            timestamp,
            description: description.into(),
        }
    }
}

/// A request handed to a poller: what to fetch and which id to answer with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dispatch {
    pub id: RequestId,
    pub range: TimeRange,
}

/// Result of a long-poll on the coordinator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PollOutcome {
    Dispatched(Dispatch),
    /// The wait window elapsed with nothing queued. Not an error.
    NoWork,
}

/// What a poller reports back for a dispatched request.
#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    Logs(Vec<LogRecord>),
    Failed(String),
}

/// Whether a report reached a waiting caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveStatus {
    /// The waiting caller was woken with this report.
    Accepted,
    /// Unknown or already expired id; the report was discarded.
    Ignored,
}

/// Logs collected for a submitted request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsResponse {
    pub request_id: RequestId,
    pub logs: Vec<LogRecord>,
}

/// Command returned to the camera by `/poll_for_command`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    SendLogs {
        #[serde(rename = "requestId", default)]
        request_id: Option<RequestId>,
        #[serde(
            rename = "startTimestamp",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        start_timestamp: Option<f64>,
        #[serde(
            rename = "endTimestamp",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        end_timestamp: Option<f64>,
    },
    Noop,
    /// Any command this build does not understand.
    #[serde(other)]
    Unknown,
}

impl From<PollOutcome> for Command {
    fn from(outcome: PollOutcome) -> Self {
        match outcome {
            PollOutcome::Dispatched(dispatch) => Command::SendLogs {
                request_id: Some(dispatch.id),
                start_timestamp: dispatch.range.start_bound(),
                end_timestamp: dispatch.range.end_bound(),
            },
            PollOutcome::NoWork => Command::Noop,
        }
    }
}

impl Command {
    /// The correlation id carried by a `send_logs` command, if any.
    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            Command::SendLogs { request_id, .. } => *request_id,
            Command::Noop | Command::Unknown => None,
        }
    }

    /// Extract the dispatched request, if this command carries one.
    ///
    /// `Noop` and unknown commands yield `Ok(None)`; a `send_logs` without a
    /// request id or with an inverted range is an error.
    pub fn into_dispatch(self) -> Result<Option<Dispatch>> {
        match self {
            Command::SendLogs {
                request_id,
                start_timestamp,
                end_timestamp,
            } => {
                let id = request_id
                    .ok_or_else(|| TetherError::validation("requestId", "missing in command"))?;
                let range = TimeRange::from_bounds(start_timestamp, end_timestamp)?;
                Ok(Some(Dispatch { id, range }))
            }
            Command::Noop | Command::Unknown => Ok(None),
        }
    }
}

/// Body of `POST /send_logs`, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RequestId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<Vec<LogRecord>>,
    /// Set instead of `logs` when the camera could not answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReportPayload {
    pub fn logs(id: RequestId, logs: Vec<LogRecord>) -> Self {
        Self {
            request_id: Some(id),
            logs: Some(logs),
            error: None,
        }
    }

    pub fn failed(id: RequestId, reason: impl Into<String>) -> Self {
        Self {
            request_id: Some(id),
            logs: None,
            error: Some(reason.into()),
        }
    }

    /// Validate into a correlated report. An `error` wins over `logs`.
    pub fn into_report(self) -> Result<(RequestId, Report)> {
        let id = self
            .request_id
            .ok_or_else(|| TetherError::validation("requestId", "missing"))?;
        if let Some(reason) = self.error {
            return Ok((id, Report::Failed(reason)));
        }
        let logs = self
            .logs
            .ok_or_else(|| TetherError::validation("logs", "missing"))?;
        Ok((id, Report::Logs(logs)))
    }
}

/// Acknowledgment returned by `POST /send_logs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportAck {
    pub status: ResolveStatus,
}

/// Point-in-time view of the coordinator tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinatorStats {
    pub queued: usize,
    pub in_flight: usize,
}
