//! Camera-side log generation.
//!
//! [`LogProducer`] appends a randomly generated [`CameraEvent`] to the
//! [`LogStore`](crate::log_store::LogStore) at a fixed period.

mod events;
mod producer;

pub use events::CameraEvent;
pub use producer::{LogProducer, ProducerHandle};
