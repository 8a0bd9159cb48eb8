//! Request handlers.

use super::AppState;
use crate::analysis::{compute, AggregateError, DATA_UNAVAILABLE_MESSAGE};
use crate::models::{ErrorBody, HealthStatus, MetricsRequest, RegionMetricsMap};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::{debug, error};

/// Failures surfaced to HTTP clients.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    #[error("metrics task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Aggregate(AggregateError::DataUnavailable) => {
                (StatusCode::SERVICE_UNAVAILABLE, DATA_UNAVAILABLE_MESSAGE)
            }
            ApiError::Task(e) => {
                error!("Metrics computation failed: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to compute telemetry metrics.",
                )
            }
        };

        (status, Json(ErrorBody::new(message))).into_response()
    }
}

/// `POST /api`: per-region metrics for the requested regions.
pub async fn compute_metrics(
    State(state): State<AppState>,
    Json(request): Json<MetricsRequest>,
) -> Result<Json<RegionMetricsMap>, ApiError> {
    debug!(
        "Metrics request: {} region(s), threshold {}ms",
        request.regions.len(),
        request.threshold_ms
    );

    let dataset = state.dataset.clone();
    let results = tokio::task::spawn_blocking(move || {
        compute(&dataset, &request.regions, request.threshold_ms)
    })
    .await??;

    debug!("Returning metrics for {} region(s)", results.len());
    Ok(Json(results))
}

/// `GET /health`: whether telemetry is loaded and how much of it.
pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus::from_dataset(&state.dataset))
}
