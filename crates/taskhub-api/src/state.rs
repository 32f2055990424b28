//! Application state shared across all handlers and middleware.

use std::sync::Arc;
use std::time::Instant;

use taskhub_auth::JwtDecoder;
use taskhub_core::traits::queue::JobQueue;
use taskhub_database::ReportStore;
use taskhub_service::ReportService;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Report use cases.
    pub report_service: Arc<ReportService>,
    /// Persistence, probed by the detailed health check.
    pub store: Arc<dyn ReportStore>,
    /// Report queue, probed by the detailed health check.
    pub queue: Arc<dyn JobQueue>,
    /// Access token verification.
    pub jwt_decoder: Arc<JwtDecoder>,
    /// Process start, for uptime.
    pub started_at: Instant,
}

impl AppState {
    /// Wire the state; the report service shares `store` and `queue`.
    pub fn new(
        store: Arc<dyn ReportStore>,
        queue: Arc<dyn JobQueue>,
        jwt_decoder: JwtDecoder,
        max_attempts: u32,
    ) -> Self {
        Self {
            report_service: Arc::new(ReportService::new(
                store.clone(),
                queue.clone(),
                max_attempts,
            )),
            store,
            queue,
            jwt_decoder: Arc::new(jwt_decoder),
            started_at: Instant::now(),
        }
    }
}
