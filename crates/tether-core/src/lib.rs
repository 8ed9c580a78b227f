//! Tether Core - long-poll command rendezvous for cameras behind NAT.
//!
//! The control plane cannot open a connection to the camera, so the camera
//! keeps asking for work instead. This crate provides both halves:
//!
//! - [`Coordinator`]: server-side queue and correlation table. Callers
//!   [`submit`](Coordinator::submit) a time range and block; the camera's
//!   long-polls [`poll`](Coordinator::poll) for requests; its answers are
//!   routed back by [`report`](Coordinator::report).
//! - [`CameraAgent`]: the device side, a [`LogProducer`] filling a
//!   [`LogStore`] and a [`PollLoop`] answering commands over a
//!   [`CommandTransport`] (HTTP by default, see [`HttpTransport`]).
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tether_core::Coordinator;
//!
//! let coordinator = Arc::new(Coordinator::new());
//!
//! // In the request handler:
//! let response = coordinator.submit(100.0, 200.0, Duration::from_secs(45)).await?;
//! println!("{} logs for {}", response.logs.len(), response.request_id);
//! ```

pub mod agent;
pub mod camera;
pub mod cancel;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod log_store;
pub mod models;
pub mod network;

pub use agent::{CameraAgent, CommandTransport, Cycle, LoopStats, PollLoop};
pub use camera::{CameraEvent, LogProducer};
pub use cancel::CancellationToken;
pub use config::TimeoutBudget;
pub use coordinator::{Coordinator, RequestState};
pub use error::{Result, TetherError};
pub use log_store::LogStore;
pub use models::{
    Command, CoordinatorStats, Dispatch, LogRecord, LogsResponse, PollOutcome, Report,
    ReportAck, ReportPayload, RequestId, ResolveStatus, TimeRange,
};
pub use network::{HttpTransport, RetryConfig};
