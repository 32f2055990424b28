//! Object paths of report artifacts, namespaced by tenant and report.

use taskhub_core::types::{ReportId, TenantId, UserId};

/// Content type of PDF artifacts.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Content type of the metrics workbook.
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// `{tenant}/{report}/{user}.pdf`
pub fn user_pdf(tenant_id: TenantId, report_id: ReportId, user_id: UserId) -> String {
    format!("{tenant_id}/{report_id}/{user_id}.pdf")
}

/// `{tenant}/{report}/summary.pdf`
pub fn summary_pdf(tenant_id: TenantId, report_id: ReportId) -> String {
    format!("{tenant_id}/{report_id}/summary.pdf")
}

/// `{tenant}/{report}/report.xlsx`
pub fn workbook(tenant_id: TenantId, report_id: ReportId) -> String {
    format!("{tenant_id}/{report_id}/report.xlsx")
}

/// Join a base URL, a bucket and an object path with single slashes.
pub fn join_url(base: &str, bucket: &str, path: &str) -> String {
    format!(
        "{}/{}/{}",
        base.trim_end_matches('/'),
        bucket.trim_matches('/'),
        path.trim_start_matches('/')
    )
}
