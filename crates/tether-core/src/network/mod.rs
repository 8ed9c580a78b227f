//! Camera-side networking: the HTTP transport and retry/backoff helpers.

mod client;
mod retry;

pub use client::HttpTransport;
pub use retry::{retry_async, Backoff, RetryConfig, RetryStats};
