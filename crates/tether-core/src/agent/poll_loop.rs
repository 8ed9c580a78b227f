use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::transport::CommandTransport;
use crate::cancel::CancellationToken;
use crate::error::{Result, TetherError};
use crate::log_store::LogStore;
use crate::models::{Dispatch, ReportPayload, RequestId, ResolveStatus};
use crate::network::{retry_async, Backoff, RetryConfig};

/// What one poll/report exchange did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cycle {
    /// The server had no work (or sent a command this build ignores).
    Idle,
    /// A request was answered; `status` says whether the caller was still waiting.
    Answered {
        id: RequestId,
        records: usize,
        status: ResolveStatus,
    },
    /// A `send_logs` command had no request id and was dropped.
    Skipped,
    /// A `send_logs` command was malformed; its caller was sent a failure.
    Refused { id: RequestId, status: ResolveStatus },
}

/// Counters accumulated by [`PollLoop::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub idle: u64,
    pub answered: u64,
    /// Answers the server discarded because the caller had already given up.
    pub ignored: u64,
    /// Malformed commands, whether dropped or refused.
    pub skipped: u64,
    pub failures: u64,
}

impl LoopStats {
    fn record(&mut self, cycle: &Cycle) {
        match cycle {
            Cycle::Idle => self.idle += 1,
            Cycle::Answered { status, .. } => {
                self.answered += 1;
                if *status == ResolveStatus::Ignored {
                    self.ignored += 1;
                }
            }
            Cycle::Skipped | Cycle::Refused { .. } => self.skipped += 1,
        }
    }
}

/// Device-side supervisor: poll, filter the log store, report, repeat.
///
/// Any failed exchange is logged and retried after a backoff; nothing here
/// is fatal, since a lost report only makes the caller's request time out.
pub struct PollLoop<T> {
    transport: T,
    store: Arc<LogStore>,
    report_retry: RetryConfig,
    backoff: RetryConfig,
}

impl<T: CommandTransport> PollLoop<T> {
    pub fn new(transport: T, store: Arc<LogStore>) -> Self {
        Self {
            transport,
            store,
            report_retry: RetryConfig::default(),
            backoff: RetryConfig::default(),
        }
    }

    /// Retry policy for a single report.
    pub fn with_report_retry(mut self, config: RetryConfig) -> Self {
        self.report_retry = config;
        self
    }

    /// Backoff applied between failed exchanges.
    pub fn with_backoff(mut self, config: RetryConfig) -> Self {
        self.backoff = config;
        self
    }

    /// Perform one poll and, if work arrived, one report.
    pub async fn run_once(&self) -> Result<Cycle> {
        debug!("Polling for command...");
        let command = self.transport.poll_for_command().await?;
        let request_id = command.request_id();

        let dispatch = match command.into_dispatch() {
            Ok(Some(dispatch)) => dispatch,
            Ok(None) => return Ok(Cycle::Idle),
            Err(e) => {
                let Some(id) = request_id else {
                    error!("Dropping malformed command: {}", e);
                    return Ok(Cycle::Skipped);
                };
                error!(request_id = %id, "Refusing malformed command: {}", e);
                let status = self
                    .deliver(id, ReportPayload::failed(id, e.to_string()))
                    .await?;
                return Ok(Cycle::Refused { id, status });
            }
        };

        self.answer(dispatch).await
    }

    async fn answer(&self, dispatch: Dispatch) -> Result<Cycle> {
        let logs = self.store.filter(&dispatch.range);
        let records = logs.len();
        debug!(
            request_id = %dispatch.id,
            "Responding with {} records between {:?} and {:?}",
            records,
            dispatch.range.start_bound(),
            dispatch.range.end_bound()
        );

        let status = self
            .deliver(dispatch.id, ReportPayload::logs(dispatch.id, logs))
            .await?;
        Ok(Cycle::Answered {
            id: dispatch.id,
            records,
            status,
        })
    }

    /// Send one report, retrying transient failures.
    async fn deliver(&self, id: RequestId, payload: ReportPayload) -> Result<ResolveStatus> {
        let (result, stats) = retry_async(
            &self.report_retry,
            || self.transport.send_report(&payload),
            TetherError::is_retryable,
        )
        .await;
        let ack = result?;

        if ack.status == ResolveStatus::Ignored {
            warn!(request_id = %id, "Server ignored report; caller already gone");
        } else if stats.attempts > 1 {
            info!(request_id = %id, "Report delivered after {} attempts", stats.attempts);
        }
        Ok(ack.status)
    }

    /// Loop until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) -> LoopStats {
        let mut stats = LoopStats::default();
        let mut backoff = Backoff::new(self.backoff.clone());

        info!("Poll loop started");
        loop {
            let outcome = tokio::select! {
                _ = cancel.cancelled() => break,
                outcome = self.run_once() => outcome,
            };

            match outcome {
                Ok(cycle) => {
                    backoff.reset();
                    stats.record(&cycle);
                }
                Err(e) => {
                    stats.failures += 1;
                    let delay = backoff.next_delay();
                    error!("Camera error on poll/report: {}. Retrying in {:?}", e, delay);
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
        info!("Poll loop stopped: {:?}", stats);
        stats
    }
}
