//! HTTP server implementation using Axum.

use crate::handler::{
    handle_get_logs, handle_health, handle_poll_for_command, handle_send_logs, handle_status,
};
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tether_core::{Coordinator, TimeoutBudget};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Application state shared across handlers.
pub struct AppState {
    /// Pending queue and in-flight table shared by callers and the camera
    pub coordinator: Arc<Coordinator>,
    /// Long-poll and submit windows
    pub budget: TimeoutBudget,
}

impl AppState {
    pub fn new(budget: TimeoutBudget) -> Self {
        Self {
            coordinator: Arc::new(Coordinator::new()),
            budget,
        }
    }
}

/// Build the router with all endpoints and middleware.
pub fn router(state: Arc<AppState>) -> Router {
    // Cameras and dashboards call from anywhere
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/status", get(handle_status))
        .route("/logs", get(handle_get_logs))
        .route("/poll_for_command", get(handle_poll_for_command))
        .route("/send_logs", post(handle_send_logs))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Start the HTTP server.
///
/// Returns the actual address the server is bound to (useful when port=0).
pub async fn start_server(state: AppState, host: &str, port: u16) -> anyhow::Result<SocketAddr> {
    let app = router(Arc::new(state));

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("Server listening on {}", actual_addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Server error: {}", e);
        }
    });

    Ok(actual_addr)
}
