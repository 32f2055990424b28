//! Report handlers.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use validator::Validate;

use taskhub_core::types::pagination::PageResponse;
use taskhub_entity::report::{Report, ReportSummary};
use taskhub_service::ReportDetail;

use crate::dto::request::{GenerateReportRequest, ListReportsQuery};
use crate::dto::response::{ApiResponse, GenerateReportResponse};
use crate::error::ApiError;
use crate::extractors::{AuthUser, parse_report_id};
use crate::state::AppState;

/// POST /api/reports/generate
pub async fn generate_report(
    State(state): State<AppState>,
    auth: AuthUser,
    body: Result<Json<GenerateReportRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<GenerateReportResponse>>), ApiError> {
    let Json(body) = body?;
    body.validate()?;

    let report = state.report_service.request(&auth, body.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(GenerateReportResponse {
            report_id: report.id,
        })),
    ))
}

/// GET /api/reports
pub async fn list_reports(
    State(state): State<AppState>,
    auth: AuthUser,
    query: Result<Query<ListReportsQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<PageResponse<Report>>>, ApiError> {
    let Query(query) = query?;
    let page = state
        .report_service
        .list(&auth, query.status, &query.page_request())
        .await?;
    Ok(Json(ApiResponse::ok(page)))
}

/// GET /api/reports/summary
pub async fn report_summary(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<ReportSummary>>, ApiError> {
    let summary = state.report_service.summary(&auth).await?;
    Ok(Json(ApiResponse::ok(summary)))
}

/// GET /api/reports/{id}
pub async fn get_report(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ReportDetail>>, ApiError> {
    let id = parse_report_id(&id)?;
    let detail = state.report_service.detail(&auth, id).await?;
    Ok(Json(ApiResponse::ok(detail)))
}

/// POST /api/reports/{id}/retry
pub async fn retry_report(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Report>>, ApiError> {
    let id = parse_report_id(&id)?;
    let report = state.report_service.retry(&auth, id).await?;
    Ok(Json(ApiResponse::ok(report)))
}
