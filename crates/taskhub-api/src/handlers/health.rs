//! Health check handlers.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use tracing::warn;

use crate::dto::response::{ApiResponse, DetailedHealthResponse, HealthResponse};
use crate::state::AppState;

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::ok(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    }))
}

/// GET /api/health/detailed
pub async fn health_detailed(
    State(state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<DetailedHealthResponse>>) {
    let database = match state.store.health_check().await {
        Ok(()) => "connected",
        Err(e) => {
            warn!(error = %e, "Database health check failed");
            "unavailable"
        }
    };
    let jobs = match state.queue.stats().await {
        Ok(stats) => Some(stats),
        Err(e) => {
            warn!(error = %e, queue = %state.queue.name(), "Queue health check failed");
            None
        }
    };

    let healthy = database == "connected" && jobs.is_some();
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ApiResponse::ok(DetailedHealthResponse {
            status: if healthy { "ok" } else { "degraded" }.to_string(),
            database: database.to_string(),
            queue: if jobs.is_some() { "connected" } else { "unavailable" }.to_string(),
            jobs,
        })),
    )
}
