//! Centralized configuration for Tether.
//!
//! Constant tables hold the defaults; [`TimeoutBudget`] carries the values a
//! process actually runs with and checks that they are ordered sensibly.

use crate::error::{Result, TetherError};
use std::time::Duration;

/// Application-level configuration.
pub struct AppConfig;

impl AppConfig {
    pub const APP_NAME: &'static str = "Tether";
    pub const USER_AGENT: &'static str = "Tether-Camera/0.1";
    /// Environment variable consulted for the log level when `RUST_LOG` is unset.
    pub const LOG_LEVEL_ENV: &'static str = "LOG_LEVEL";
}

/// Wait windows on both sides of the long-poll.
pub struct TimeoutConfig;

impl TimeoutConfig {
    /// How long `/poll_for_command` holds a request open with nothing queued.
    pub const POLL_WAIT: Duration = Duration::from_secs(30);
    /// How long `/logs` waits for the camera to answer.
    pub const SUBMIT_WAIT: Duration = Duration::from_secs(45);
    /// Outbound HTTP timeout on the camera.
    pub const DEVICE_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
    /// Minimum slack a poll/report round trip needs on top of the poll window.
    pub const ROUND_TRIP_ALLOWANCE: Duration = Duration::from_secs(1);
}

/// Camera behaviour.
pub struct CameraConfig;

impl CameraConfig {
    /// Interval between generated log records.
    pub const LOG_PERIOD: Duration = Duration::from_secs(10);
    /// Backoff before retrying after a failed poll or report.
    pub const RETRY_BASE_DELAY: Duration = Duration::from_millis(250);
    pub const RETRY_MAX_DELAY: Duration = Duration::from_secs(10);
    pub const API_BASE_URL_ENV: &'static str = "API_BASE_URL";
}

/// Control plane HTTP server.
pub struct ServerConfig;

impl ServerConfig {
    pub const DEFAULT_HOST: &'static str = "127.0.0.1";
    pub const DEFAULT_PORT: u16 = 8080;
    /// Line printed on stdout once the listener is bound.
    pub const PORT_ANNOUNCE_PREFIX: &'static str = "API_PORT=";
}

/// The three timers of the long-poll protocol.
///
/// Invariants checked by [`TimeoutBudget::validate`]:
/// - `poll_wait < device_request_timeout`, so the camera never cuts off a
///   poll the server is about to answer;
/// - `submit_wait >= poll_wait + ROUND_TRIP_ALLOWANCE`, so a request can be
///   claimed by at least one poll cycle and answered before the caller gives up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutBudget {
    pub poll_wait: Duration,
    pub submit_wait: Duration,
    pub device_request_timeout: Duration,
}

impl Default for TimeoutBudget {
    fn default() -> Self {
        Self {
            poll_wait: TimeoutConfig::POLL_WAIT,
            submit_wait: TimeoutConfig::SUBMIT_WAIT,
            device_request_timeout: TimeoutConfig::DEVICE_REQUEST_TIMEOUT,
        }
    }
}

impl TimeoutBudget {
    pub fn with_poll_wait(mut self, wait: Duration) -> Self {
        self.poll_wait = wait;
        self
    }

    pub fn with_submit_wait(mut self, wait: Duration) -> Self {
        self.submit_wait = wait;
        self
    }

    pub fn with_device_request_timeout(mut self, timeout: Duration) -> Self {
        self.device_request_timeout = timeout;
        self
    }

    /// Check the ordering between the timers.
    pub fn validate(&self) -> Result<()> {
        self.validate_poll_window()?;
        if self.submit_wait < self.poll_wait + TimeoutConfig::ROUND_TRIP_ALLOWANCE {
            return Err(TetherError::Config {
                message: format!(
                    "submit wait {:?} must exceed poll wait {:?} by at least {:?}",
                    self.submit_wait,
                    self.poll_wait,
                    TimeoutConfig::ROUND_TRIP_ALLOWANCE
                ),
            });
        }
        Ok(())
    }

    /// The camera's half of [`validate`](Self::validate): its outbound
    /// timeout must outlast the server's long-poll window.
    pub fn validate_poll_window(&self) -> Result<()> {
        if self.poll_wait.is_zero() {
            return Err(TetherError::Config {
                message: "poll wait must be greater than zero".to_string(),
            });
        }
        if self.poll_wait >= self.device_request_timeout {
            return Err(TetherError::Config {
                message: format!(
                    "poll wait {:?} must be shorter than the device request timeout {:?}",
                    self.poll_wait, self.device_request_timeout
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_ordered() {
        assert!(TimeoutBudget::default().validate().is_ok());
        assert!(TimeoutConfig::POLL_WAIT < TimeoutConfig::DEVICE_REQUEST_TIMEOUT);
        assert!(CameraConfig::RETRY_BASE_DELAY < CameraConfig::RETRY_MAX_DELAY);
    }

    #[test]
    fn test_poll_wait_must_fit_device_timeout() {
        let budget = TimeoutBudget::default()
            .with_poll_wait(Duration::from_secs(60))
            .with_submit_wait(Duration::from_secs(90));
        assert!(matches!(budget.validate(), Err(TetherError::Config { .. })));
    }

    #[test]
    fn test_submit_wait_must_cover_a_poll_cycle() {
        let budget = TimeoutBudget::default()
            .with_poll_wait(Duration::from_secs(30))
            .with_submit_wait(Duration::from_secs(30));
        assert!(budget.validate().is_err());

        let budget = budget.with_submit_wait(Duration::from_secs(31));
        assert!(budget.validate().is_ok());
    }

    #[test]
    fn test_zero_poll_wait_rejected() {
        let budget = TimeoutBudget::default().with_poll_wait(Duration::ZERO);
        assert!(budget.validate().is_err());
    }

    #[test]
    fn test_poll_window_ignores_submit_wait() {
        let device = TimeoutBudget::default()
            .with_poll_wait(Duration::from_secs(50))
            .with_device_request_timeout(Duration::from_secs(55));
        assert!(device.validate_poll_window().is_ok());
        assert!(device.validate().is_err());

        let short = device.with_device_request_timeout(Duration::from_secs(1));
        assert!(short.validate_poll_window().is_err());
    }
}
