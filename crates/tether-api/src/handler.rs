//! Request handlers for the log retrieval endpoints.

use crate::server::AppState;
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tether_core::{Command, LogsResponse, ReportAck, ReportPayload, TetherError, TimeRange};
use tracing::{debug, error};

/// Error response: a [`TetherError`] rendered as `{"error", "kind"}` with the
/// status from [`TetherError::status_code`].
#[derive(Debug)]
pub struct ApiError(TetherError);

impl From<TetherError> for ApiError {
    fn from(err: TetherError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(TetherError::validation("body", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!("Request failed ({}): {}", status, self.0);
        } else {
            debug!("Request rejected ({}): {}", status, self.0);
        }
        let body = json!({
            "error": self.0.to_string(),
            "kind": self.0.kind(),
        });
        (status, Json(body)).into_response()
    }
}

/// Query string for `GET /logs`. Bounds stay strings until parsed so a
/// non-numeric value produces our own validation error.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsQuery {
    pub start_timestamp: Option<String>,
    pub end_timestamp: Option<String>,
}

impl LogsQuery {
    /// Missing bounds are open; present ones must be finite numbers.
    pub fn range(&self) -> Result<TimeRange, TetherError> {
        let start = parse_bound("startTimestamp", self.start_timestamp.as_deref())?;
        let end = parse_bound("endTimestamp", self.end_timestamp.as_deref())?;
        TimeRange::from_bounds(start, end)
    }
}

fn parse_bound(field: &str, raw: Option<&str>) -> Result<Option<f64>, TetherError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(TetherError::validation(
            field,
            format!("expected a unix timestamp, got '{}'", raw),
        )),
    }
}

/// Health check endpoint.
pub async fn handle_health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

/// Queue and in-flight counts.
pub async fn handle_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.coordinator.stats())
}

/// `GET /logs`: ask the camera for a time range and block until it answers.
pub async fn handle_get_logs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<LogsResponse>, ApiError> {
    let range = query.range()?;
    debug!(
        "Log request for {:?}..{:?}",
        range.start_bound(),
        range.end_bound()
    );
    let response = state
        .coordinator
        .submit_range(range, state.budget.submit_wait)
        .await?;
    Ok(Json(response))
}

/// `GET /poll_for_command`: long-poll for the next request.
pub async fn handle_poll_for_command(State(state): State<Arc<AppState>>) -> Json<Command> {
    let outcome = state.coordinator.poll(state.budget.poll_wait).await;
    Json(Command::from(outcome))
}

/// `POST /send_logs`: the camera's answer to a dispatched request.
pub async fn handle_send_logs(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ReportPayload>, JsonRejection>,
) -> Result<Json<ReportAck>, ApiError> {
    let Json(payload) = payload?;
    let (id, report) = payload.into_report()?;
    debug!(request_id = %id, "Report received");
    let status = state.coordinator.report(&id, report);
    Ok(Json(ReportAck { status }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(start: Option<&str>, end: Option<&str>) -> LogsQuery {
        LogsQuery {
            start_timestamp: start.map(String::from),
            end_timestamp: end.map(String::from),
        }
    }

    #[test]
    fn test_query_parses_bounds() {
        let range = query(Some("100"), Some("200.5")).range().unwrap();
        assert_eq!(range.start(), 100.0);
        assert_eq!(range.end(), 200.5);
    }

    #[test]
    fn test_missing_bounds_are_open() {
        let range = query(None, Some("")).range().unwrap();
        assert_eq!(range.start_bound(), None);
        assert_eq!(range.end_bound(), None);
        assert!(range.contains(0.0));
    }

    #[test]
    fn test_non_numeric_bound_rejected() {
        let err = query(Some("yesterday"), None).range().unwrap_err();
        assert!(matches!(err, TetherError::Validation { ref field, .. } if field == "startTimestamp"));
        assert_eq!(err.status_code(), 400);

        let err = query(None, Some("inf")).range().unwrap_err();
        assert!(matches!(err, TetherError::Validation { .. }));
    }

    #[test]
    fn test_reversed_range_rejected() {
        let err = query(Some("200"), Some("100")).range().unwrap_err();
        assert!(matches!(err, TetherError::InvalidRange { .. }));
    }

    #[test]
    fn test_api_error_status() {
        let response = ApiError::from(TetherError::Timeout(std::time::Duration::from_secs(1)))
            .into_response();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);

        let response = ApiError::from(TetherError::RequestFailed {
            id: tether_core::RequestId::new(),
            reason: "disk error".into(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
