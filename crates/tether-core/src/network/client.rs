//! HTTP transport from the camera to the control plane.
//!
//! Wraps reqwest with:
//! - One outbound timeout for every call, longer than the server's
//!   long-poll window
//! - Status checking that turns non-2xx answers into [`TetherError::Http`]
//! - A fixed user agent

use crate::agent::CommandTransport;
use crate::config::{AppConfig, TimeoutConfig};
use crate::models::{Command, ReportAck, ReportPayload};
use crate::{Result, TetherError};
use async_trait::async_trait;
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::debug;

/// Camera-side client for `/poll_for_command` and `/send_logs`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpTransport {
    /// Create a transport with the default device request timeout.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, TimeoutConfig::DEVICE_REQUEST_TIMEOUT)
    }

    /// Create a transport with a custom outbound timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(TetherError::Config {
                message: format!("API base URL must be http(s), got '{}'", base_url),
            });
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(AppConfig::USER_AGENT)
            .build()
            .map_err(|e| TetherError::Network {
                message: format!("Failed to create HTTP client: {}", e),
                source: Some(e),
            })?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        Err(TetherError::Http {
            status: status.as_u16(),
            url: response.url().to_string(),
        })
    }
}

#[async_trait]
impl CommandTransport for HttpTransport {
    async fn poll_for_command(&self) -> Result<Command> {
        let url = self.url("poll_for_command");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| TetherError::Network {
                message: format!("GET {} failed: {}", url, e),
                source: Some(e),
            })?;
        let command = Self::check_status(response)?.json::<Command>().await?;
        debug!("Received command: {:?}", command);
        Ok(command)
    }

    async fn send_report(&self, payload: &ReportPayload) -> Result<ReportAck> {
        let url = self.url("send_logs");
        let response = self
            .client
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| TetherError::Network {
                message: format!("POST {} failed: {}", url, e),
                source: Some(e),
            })?;
        Ok(Self::check_status(response)?.json::<ReportAck>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_normalized() {
        let transport = HttpTransport::new("http://localhost:8080/").unwrap();
        assert_eq!(transport.base_url(), "http://localhost:8080");
        assert_eq!(
            transport.url("poll_for_command"),
            "http://localhost:8080/poll_for_command"
        );
        assert_eq!(transport.timeout(), TimeoutConfig::DEVICE_REQUEST_TIMEOUT);
    }

    #[test]
    fn test_rejects_non_http_url() {
        assert!(matches!(
            HttpTransport::new("localhost:8080"),
            Err(TetherError::Config { .. })
        ));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_retryable_error() {
        // Port 9 (discard) on localhost is not expected to serve HTTP.
        let transport =
            HttpTransport::with_timeout("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let err = transport.poll_for_command().await.unwrap_err();
        assert!(err.is_retryable(), "unexpected error: {}", err);
    }
}
