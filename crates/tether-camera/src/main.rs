//! Tether Camera - simulated device behind NAT.
//!
//! Appends a random event to its in-memory log every period and keeps a
//! long-poll open to the API server, answering each `send_logs` command
//! with the records in the requested range.

use anyhow::Result;
use clap::Parser;
use std::time::Duration;
use tether_core::config::{AppConfig, CameraConfig, TimeoutConfig};
use tether_core::{CameraAgent, CancellationToken, HttpTransport, TimeoutBudget};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "tether-camera")]
#[command(about = "Camera agent that answers log requests over long-poll")]
struct Args {
    /// Base URL of the API server
    #[arg(long, env = CameraConfig::API_BASE_URL_ENV)]
    api_base_url: String,

    /// Seconds between generated log events
    #[arg(long, default_value_t = CameraConfig::LOG_PERIOD.as_secs())]
    log_period_secs: u64,

    /// Outbound HTTP timeout; must exceed the server's poll wait
    #[arg(long, default_value_t = TimeoutConfig::DEVICE_REQUEST_TIMEOUT.as_secs())]
    request_timeout_secs: u64,

    /// Poll wait the API server is configured with
    #[arg(long, default_value_t = TimeoutConfig::POLL_WAIT.as_secs())]
    poll_wait_secs: u64,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

impl Args {
    /// Timers this camera runs with, checked against the server's poll wait.
    fn budget(&self) -> Result<TimeoutBudget> {
        if self.log_period_secs == 0 {
            anyhow::bail!("--log-period-secs must be at least 1");
        }
        let budget = TimeoutBudget::default()
            .with_poll_wait(Duration::from_secs(self.poll_wait_secs))
            .with_device_request_timeout(Duration::from_secs(self.request_timeout_secs));
        budget.validate_poll_window()?;
        Ok(budget)
    }
}

/// `RUST_LOG` wins, then `LOG_LEVEL`, then the `--debug` flag.
fn env_filter(debug: bool) -> EnvFilter {
    let fallback = if debug { "debug" } else { "info" };
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_from_env(AppConfig::LOG_LEVEL_ENV))
        .unwrap_or_else(|_| EnvFilter::new(fallback))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    FmtSubscriber::builder()
        .with_env_filter(env_filter(args.debug))
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    let budget = args.budget()?;
    let transport =
        HttpTransport::with_timeout(&args.api_base_url, budget.device_request_timeout)?;
    info!(
        "Starting camera against {} (timeout {:?})",
        transport.base_url(),
        transport.timeout()
    );

    let agent = CameraAgent::new(transport, Duration::from_secs(args.log_period_secs));

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Shutdown signal received, stopping camera"),
                Err(e) => warn!("Failed to listen for shutdown signal: {}", e),
            }
            cancel.cancel();
        });
    }

    let stats = agent.run(cancel).await;
    info!(
        "Camera exited: {} answered ({} ignored), {} idle polls, {} failures",
        stats.answered, stats.ignored, stats.idle, stats.failures
    );

    Ok(())
}
