//! Report service behaviour over the in-memory store and queue.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;

use taskhub_core::error::ErrorKind;
use taskhub_core::traits::queue::{EnqueueOutcome, JobQueue};
use taskhub_core::types::pagination::PageRequest;
use taskhub_core::types::{ReportId, TenantId, UserId};
use taskhub_database::{MemoryReportStore, ReportStore};
use taskhub_entity::job::{GENERATE_REPORT_JOB, ReportJob};
use taskhub_entity::report::{ReportScope, ReportStatusKind, ReportType};
use taskhub_entity::user::UserRole;
use taskhub_queue::memory::MemoryJobQueue;
use taskhub_service::{ReportRequest, ReportService, RequestContext};

struct Harness {
    store: Arc<MemoryReportStore>,
    queue: Arc<MemoryJobQueue>,
    service: ReportService,
    tenant: TenantId,
}

impl Harness {
    fn new() -> Self {
        let store = Arc::new(MemoryReportStore::new());
        let queue = Arc::new(MemoryJobQueue::new("report-generation"));
        let service = ReportService::new(store.clone(), queue.clone(), 1);
        Self {
            store,
            queue,
            service,
            tenant: TenantId::new(),
        }
    }

    fn ctx(&self, role: UserRole) -> RequestContext {
        RequestContext::new(UserId::new(), self.tenant, role, "Tester".to_string())
    }
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).expect("valid date")
}

fn weekly(scope: ReportScope) -> ReportRequest {
    ReportRequest {
        report_type: ReportType::Weekly,
        from_date: date(1),
        to_date: date(7),
        scope,
        employee_ids: Vec::new(),
    }
}

#[tokio::test]
async fn test_request_creates_report_and_enqueues_job() {
    let h = Harness::new();
    let ctx = h.ctx(UserRole::Manager);

    let report = h
        .service
        .request(&ctx, weekly(ReportScope::Team))
        .await
        .expect("request");
    assert_eq!(report.status, ReportStatusKind::Generating);
    assert_eq!(report.requested_by, ctx.user_id);

    let delivery = h
        .queue
        .reserve("test", Duration::from_secs(30))
        .await
        .expect("reserve")
        .expect("job waiting");
    assert_eq!(delivery.job_id, report.id.to_string());
    assert_eq!(delivery.name, GENERATE_REPORT_JOB);
    let job: ReportJob = serde_json::from_value(delivery.payload).expect("payload");
    assert_eq!(job.report_id, report.id);
    assert_eq!(job.scope, Some(ReportScope::Team));
}

#[tokio::test]
async fn test_operator_cannot_request_team_report() {
    let h = Harness::new();
    let ctx = h.ctx(UserRole::Operator);

    let err = h
        .service
        .request(&ctx, weekly(ReportScope::Team))
        .await
        .expect_err("forbidden");
    assert_eq!(err.kind, ErrorKind::Authorization);

    let summary = h.service.summary(&ctx).await.expect("summary");
    assert_eq!(summary.total, 0);
    assert_eq!(h.queue.stats().await.expect("stats").waiting, 0);
}

#[tokio::test]
async fn test_invalid_range_is_rejected() {
    let h = Harness::new();
    let ctx = h.ctx(UserRole::ProjectManager);

    let mut req = weekly(ReportScope::Employee);
    req.from_date = date(8);
    let err = h.service.request(&ctx, req).await.expect_err("inverted");
    assert_eq!(err.kind, ErrorKind::Validation);

    let mut req = weekly(ReportScope::Employee);
    req.from_date = NaiveDate::from_ymd_opt(2022, 1, 1).expect("date");
    let err = h.service.request(&ctx, req).await.expect_err("too long");
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn test_enqueue_failure_marks_report_failed() {
    let h = Harness::new();
    let ctx = h.ctx(UserRole::Operator);
    h.queue.set_reachable(false);

    let err = h
        .service
        .request(&ctx, weekly(ReportScope::Employee))
        .await
        .expect_err("queue down");
    assert_eq!(err.kind, ErrorKind::ServiceUnavailable);

    let page = h
        .service
        .list(&ctx, None, &PageRequest::default())
        .await
        .expect("list");
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].status, ReportStatusKind::Failed);
    assert!(
        page.items[0]
            .failure_reason
            .as_deref()
            .is_some_and(|r| r.contains("ECONNREFUSED"))
    );
}

#[tokio::test]
async fn test_listing_follows_role() {
    let h = Harness::new();
    let pm = h.ctx(UserRole::ProjectManager);
    let op = h.ctx(UserRole::Operator);
    let other_op = h.ctx(UserRole::Operator);

    h.service
        .request(&pm, weekly(ReportScope::Team))
        .await
        .expect("pm report");
    h.service
        .request(&op, weekly(ReportScope::Employee))
        .await
        .expect("op report");

    let all = h
        .service
        .list(&pm, None, &PageRequest::default())
        .await
        .expect("list");
    assert_eq!(all.total_items, 2);

    let own = h
        .service
        .list(&op, None, &PageRequest::default())
        .await
        .expect("list");
    assert_eq!(own.total_items, 1);
    assert_eq!(own.items[0].requested_by, op.user_id);

    let none = h
        .service
        .list(&other_op, Some(ReportStatusKind::Generating), &PageRequest::default())
        .await
        .expect("list");
    assert_eq!(none.total_items, 0);

    let summary = h.service.summary(&pm).await.expect("summary");
    assert_eq!(summary.total, 2);
    assert_eq!(summary.generating, 2);
    assert_eq!(summary.weekly, 2);
}

#[tokio::test]
async fn test_detail_hides_reports_of_other_users() {
    let h = Harness::new();
    let op = h.ctx(UserRole::Operator);
    let other_op = h.ctx(UserRole::Operator);

    let report = h
        .service
        .request(&op, weekly(ReportScope::Employee))
        .await
        .expect("request");

    let detail = h.service.detail(&op, report.id).await.expect("detail");
    assert_eq!(detail.report.id, report.id);
    assert!(detail.snapshots.is_empty());

    let err = h
        .service
        .detail(&other_op, report.id)
        .await
        .expect_err("hidden");
    assert_eq!(err.kind, ErrorKind::NotFound);

    let foreign = RequestContext::new(
        UserId::new(),
        TenantId::new(),
        UserRole::ProjectManager,
        "Foreign".to_string(),
    );
    let err = h
        .service
        .detail(&foreign, report.id)
        .await
        .expect_err("other tenant");
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_retry_only_from_failed() {
    let h = Harness::new();
    let ctx = h.ctx(UserRole::Manager);
    let report = h
        .service
        .request(&ctx, weekly(ReportScope::Team))
        .await
        .expect("request");

    let err = h
        .service
        .retry(&ctx, report.id)
        .await
        .expect_err("still generating");
    assert_eq!(err.kind, ErrorKind::Conflict);

    let delivery = h
        .queue
        .reserve("test", Duration::from_secs(30))
        .await
        .expect("reserve")
        .expect("job");
    h.queue
        .fail(&delivery, "browser missing", false)
        .await
        .expect("fail");
    h.store
        .mark_failed(report.id, "browser missing", None)
        .await
        .expect("mark failed");

    let retried = h.service.retry(&ctx, report.id).await.expect("retry");
    assert_eq!(retried.status, ReportStatusKind::Generating);
    assert_eq!(h.queue.stats().await.expect("stats").waiting, 1);
}

#[tokio::test]
async fn test_requeue_rejects_ready_reports() {
    let h = Harness::new();
    let ctx = h.ctx(UserRole::Manager);
    let report = h
        .service
        .request(&ctx, weekly(ReportScope::Team))
        .await
        .expect("request");

    let outcome = h.service.requeue(report.id).await.expect("requeue");
    assert_eq!(outcome, EnqueueOutcome::Duplicate);

    h.store
        .mark_ready(report.id, Default::default(), &Default::default())
        .await
        .expect("ready");
    let err = h.service.requeue(report.id).await.expect_err("ready");
    assert_eq!(err.kind, ErrorKind::Conflict);

    let err = h
        .service
        .requeue(ReportId::new())
        .await
        .expect_err("missing");
    assert_eq!(err.kind, ErrorKind::NotFound);
}
