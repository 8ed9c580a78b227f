//! Tether API Server - control plane for cameras behind NAT.
//!
//! Callers ask for camera logs with `GET /logs`; the request waits until the
//! camera picks it up through `GET /poll_for_command` and answers on
//! `POST /send_logs`.

mod handler;
mod server;

use anyhow::Result;
use clap::Parser;
use std::time::Duration;
use tether_core::config::{AppConfig, ServerConfig, TimeoutConfig};
use tether_core::TimeoutBudget;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "tether-api")]
#[command(about = "Long-poll command server for camera log retrieval")]
struct Args {
    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value_t = ServerConfig::DEFAULT_PORT)]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = ServerConfig::DEFAULT_HOST)]
    host: String,

    /// Seconds a camera poll is held open waiting for work
    #[arg(long, default_value_t = TimeoutConfig::POLL_WAIT.as_secs_f64())]
    poll_wait_secs: f64,

    /// Seconds a /logs caller waits for the camera's answer
    #[arg(long, default_value_t = TimeoutConfig::SUBMIT_WAIT.as_secs_f64())]
    submit_wait_secs: f64,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

impl Args {
    fn budget(&self) -> Result<TimeoutBudget> {
        let budget = TimeoutBudget::default()
            .with_poll_wait(secs("poll-wait-secs", self.poll_wait_secs)?)
            .with_submit_wait(secs("submit-wait-secs", self.submit_wait_secs)?);
        budget.validate()?;
        Ok(budget)
    }
}

fn secs(flag: &str, value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value)
        .map_err(|e| anyhow::anyhow!("--{} must be a non-negative number: {}", flag, e))
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

    info!("Starting {} API server", AppConfig::APP_NAME);

    let budget = args.budget()?;
    info!(
        "Poll wait {:?}, submit wait {:?}",
        budget.poll_wait, budget.submit_wait
    );

    let addr = server::start_server(server::AppState::new(budget), &args.host, args.port).await?;

    // Intentional stdout: launchers and tests read the bound port from here
    println!("{}{}", ServerConfig::PORT_ANNOUNCE_PREFIX, addr.port());

    info!("API server running on {}", addr);

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_args_give_valid_budget() {
        let args = Args::parse_from(["tether-api"]);
        assert_eq!(args.port, ServerConfig::DEFAULT_PORT);
        assert_eq!(args.budget().unwrap(), TimeoutBudget::default());
    }

    #[test]
    fn test_submit_wait_shorter_than_poll_rejected() {
        let args = Args::parse_from([
            "tether-api",
            "--poll-wait-secs",
            "30",
            "--submit-wait-secs",
            "10",
        ]);
        assert!(args.budget().is_err());
    }

    #[test]
    fn test_negative_wait_rejected() {
        let args = Args::parse_from(["tether-api", "--poll-wait-secs=-1"]);
        assert!(args.budget().is_err());
    }
}
