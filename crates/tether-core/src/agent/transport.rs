//! The two remote calls the camera makes.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Command, ReportAck, ReportPayload};

/// Outbound channel from the camera to the control plane.
///
/// Both calls are idempotent from the camera's point of view: a repeated
/// poll may return a different command, and a repeated report for an
/// already answered id is acknowledged as ignored.
#[async_trait]
pub trait CommandTransport: Send + Sync {
    /// Long-poll for the next command.
    async fn poll_for_command(&self) -> Result<Command>;

    /// Send the answer for a dispatched request.
    async fn send_report(&self, payload: &ReportPayload) -> Result<ReportAck>;
}
