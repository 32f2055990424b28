//! Route definitions for the TaskHub HTTP API.
//!
//! All routes are mounted under `/api`. The router receives `AppState`
//! and passes it to all handlers via Axum's `State` extractor.

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use taskhub_core::config::CorsConfig;

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState, cors: &CorsConfig) -> Router {
    let api_routes = Router::new()
        .merge(report_routes())
        .merge(health_routes());

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::cors::build_cors_layer(cors))
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}

/// Report request, listing, detail and retry
fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/reports", get(handlers::reports::list_reports))
        .route("/reports/generate", post(handlers::reports::generate_report))
        .route("/reports/summary", get(handlers::reports::report_summary))
        .route("/reports/{id}", get(handlers::reports::get_report))
        .route("/reports/{id}/retry", post(handlers::reports::retry_report))
}

/// Liveness and dependency checks
fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/health/detailed", get(handlers::health::health_detailed))
}
