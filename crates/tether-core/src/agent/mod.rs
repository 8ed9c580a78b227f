//! The camera side of the long-poll protocol.
//!
//! A [`CameraAgent`] runs two independent activities that share only the
//! [`LogStore`]: the [`LogProducer`] appending records, and the [`PollLoop`]
//! answering commands from the control plane.

mod poll_loop;
mod transport;

pub use poll_loop::{Cycle, LoopStats, PollLoop};
pub use transport::CommandTransport;

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::camera::LogProducer;
use crate::cancel::CancellationToken;
use crate::log_store::LogStore;

/// A camera: log producer plus poll loop over one transport.
pub struct CameraAgent<T> {
    store: Arc<LogStore>,
    producer: LogProducer,
    poll_loop: PollLoop<T>,
}

impl<T: CommandTransport> CameraAgent<T> {
    pub fn new(transport: T, log_period: Duration) -> Self {
        let store = Arc::new(LogStore::new());
        Self {
            producer: LogProducer::new(store.clone(), log_period),
            poll_loop: PollLoop::new(transport, store.clone()),
            store,
        }
    }

    pub fn store(&self) -> &Arc<LogStore> {
        &self.store
    }

    /// Run until `cancel` fires, then stop the producer and return the poll
    /// loop's counters.
    pub async fn run(self, cancel: CancellationToken) -> LoopStats {
        let producer = self.producer.spawn(cancel.clone());
        let stats = self.poll_loop.run(cancel).await;
        let produced = producer.stop().await;
        info!(
            "Camera stopped: {} records produced, {} requests answered",
            produced, stats.answered
        );
        stats
    }
}
