use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::CameraEvent;
use crate::cancel::CancellationToken;
use crate::log_store::LogStore;
use crate::models::LogRecord;

/// Background task appending one generated record per period.
///
/// Only touches the log store, never the network, so a slow or stuck poll
/// cannot delay it.
#[derive(Debug, Clone)]
pub struct LogProducer {
    store: Arc<LogStore>,
    period: Duration,
}

impl LogProducer {
    pub fn new(store: Arc<LogStore>, period: Duration) -> Self {
        Self { store, period }
    }

    /// Generate and append a single record.
    pub fn produce_one(&self) -> LogRecord {
        let description = {
            let mut rng = rand::rng();
            CameraEvent::random(&mut rng).describe(&mut rng)
        };
        self.store.append(description)
    }

    /// Append a record immediately and then every period until cancelled.
    ///
    /// Returns the number of records appended.
    pub async fn run(self, cancel: CancellationToken) -> usize {
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut produced = 0;

        info!("Log producer started with period {:?}", self.period);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let record = self.produce_one();
                    debug!("Recorded camera event: {}", record.description);
                    produced += 1;
                }
            }
        }
        info!("Log producer stopped after {} records", produced);
        produced
    }

    /// Run on the tokio runtime.
    pub fn spawn(self, cancel: CancellationToken) -> ProducerHandle {
        let task = tokio::spawn(self.run(cancel.clone()));
        ProducerHandle { cancel, task }
    }
}

/// Handle to a spawned [`LogProducer`].
#[derive(Debug)]
pub struct ProducerHandle {
    cancel: CancellationToken,
    task: JoinHandle<usize>,
}

impl ProducerHandle {
    /// Cancel the producer and wait for it to finish.
    ///
    /// Returns the number of records it appended.
    pub async fn stop(self) -> usize {
        self.cancel.cancel();
        self.task.await.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_producer_appends_every_period() {
        let store = Arc::new(LogStore::new());
        let handle = LogProducer::new(store.clone(), Duration::from_secs(10))
            .spawn(CancellationToken::new());

        // Ticks at 0s, 10s, 20s.
        tokio::time::sleep(Duration::from_secs(25)).await;
        let produced = handle.stop().await;

        assert_eq!(produced, 3);
        assert_eq!(store.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_producer_stops_promptly_on_cancel() {
        let store = Arc::new(LogStore::new());
        let cancel = CancellationToken::new();
        let task = tokio::spawn(
            LogProducer::new(store.clone(), Duration::from_secs(3600)).run(cancel.clone()),
        );

        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();
        let produced = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("producer did not stop")
            .unwrap();
        assert_eq!(produced, 1);
    }

    #[test]
    fn test_produce_one_appends_known_event() {
        let store = Arc::new(LogStore::new());
        let producer = LogProducer::new(store.clone(), Duration::from_secs(1));
        let record = producer.produce_one();
        assert!(CameraEvent::ALL
            .iter()
            .any(|event| record.description.starts_with(event.as_str())));
        assert_eq!(store.len(), 1);
    }
}
