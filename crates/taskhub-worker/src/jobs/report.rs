//! `generate-report` job: snapshots, per-user PDFs, workbook and summary.

use std::pin::pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use tracing::{error, info, warn};

use taskhub_core::config::WorkerConfig;
use taskhub_core::error::AppError;
use taskhub_core::result::AppResult;
use taskhub_core::traits::queue::Delivery;
use taskhub_core::traits::storage::StorageProvider;
use taskhub_core::types::ReportId;
use taskhub_database::{ReportArtifacts, ReportStore};
use taskhub_entity::job::{GENERATE_REPORT_JOB, ReportJob};
use taskhub_entity::report::{BatchOutcome, Report, ReportStatusKind};
use taskhub_entity::snapshot::SnapshotStats;
use taskhub_entity::user::User;
use taskhub_render::template::{
    SummaryRow, SummaryView, UserReportView, summary_html, user_report_html,
};
use taskhub_render::trend::daily_completions;
use taskhub_render::{DocumentRenderer, WorkbookBuilder};
use taskhub_service::{ReportAggregator, resolve_scope};
use taskhub_storage::paths;

use crate::executor::{JobExecutionError, JobHandler};

/// A failed run with whatever per-user results were collected.
#[derive(Debug)]
struct RunFailure {
    error: AppError,
    outcome: Option<BatchOutcome>,
}

impl From<AppError> for RunFailure {
    fn from(error: AppError) -> Self {
        Self {
            error,
            outcome: None,
        }
    }
}

/// Handles report generation.
#[derive(Debug)]
pub struct ReportJobHandler {
    /// Persistence.
    store: Arc<dyn ReportStore>,
    /// Artifact bucket.
    storage: Arc<dyn StorageProvider>,
    /// PDF renderer, normally a bounded pool.
    renderer: Arc<dyn DocumentRenderer>,
    /// Snapshot writer.
    aggregator: ReportAggregator,
    /// Users processed concurrently within one report.
    user_concurrency: usize,
}

impl ReportJobHandler {
    /// Create a new report job handler.
    pub fn new(
        store: Arc<dyn ReportStore>,
        storage: Arc<dyn StorageProvider>,
        renderer: Arc<dyn DocumentRenderer>,
        config: &WorkerConfig,
    ) -> Self {
        Self {
            aggregator: ReportAggregator::new(store.clone(), config.snapshot_policy),
            store,
            storage,
            renderer,
            user_concurrency: config.user_concurrency.max(1),
        }
    }

    async fn generate(&self, job: &ReportJob) -> Result<(), RunFailure> {
        let Some(report) = self.store.begin_attempt(job.report_id).await? else {
            return match self.store.find_report(job.report_id).await? {
                None => {
                    Err(AppError::not_found(format!("Report {} not found", job.report_id)).into())
                }
                Some(report) if report.status == ReportStatusKind::Ready => {
                    info!(report_id = %report.id, "Report already READY; acknowledging");
                    Ok(())
                }
                Some(report) => Err(AppError::conflict(format!(
                    "Report {} could not be started from {}",
                    report.id, report.status
                ))
                .into()),
            };
        };

        let scope = job.scope.unwrap_or(report.scope);
        let employee_ids = job
            .employee_ids
            .as_deref()
            .unwrap_or(report.employee_ids.as_slice());
        let users = resolve_scope(self.store.as_ref(), &report, scope, employee_ids).await?;

        info!(
            report_id = %report.id,
            tenant_id = %report.tenant_id,
            scope = %scope,
            attempt = report.attempts,
            users = users.len(),
            "Generating report"
        );

        let (outcome, rows) = self.process_users(&report, users).await?;

        if outcome.all_failed() {
            return Err(RunFailure {
                error: AppError::render(format!("all {} users failed", outcome.total())),
                outcome: Some(outcome),
            });
        }

        let artifacts = match self.publish_artifacts(&report, &rows, &outcome).await {
            Ok(artifacts) => artifacts,
            Err(error) => {
                return Err(RunFailure {
                    error,
                    outcome: Some(outcome),
                });
            }
        };
        self.store
            .mark_ready(report.id, artifacts, &outcome)
            .await
            .map_err(|error| RunFailure {
                error,
                outcome: Some(outcome.clone()),
            })?;

        info!(
            report_id = %report.id,
            succeeded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "Report READY"
        );
        Ok(())
    }

    /// Snapshot and PDF for every user. Input-scoped errors are recorded
    /// in the outcome; any other error aborts the run.
    async fn process_users(
        &self,
        report: &Report,
        users: Vec<User>,
    ) -> Result<(BatchOutcome, Vec<(User, SnapshotStats)>), RunFailure> {
        let mut outcome = BatchOutcome::default();
        let mut rows = Vec::with_capacity(users.len());

        let mut results = pin!(
            stream::iter(users)
                .map(|user| async move {
                    let result = self.process_user(report, &user).await;
                    (user, result)
                })
                .buffered(self.user_concurrency)
        );

        while let Some((user, result)) = results.next().await {
            match result {
                Ok(stats) => {
                    outcome.record_success(user.id);
                    rows.push((user, stats));
                }
                Err(e) if e.kind.is_input_scoped() => {
                    warn!(report_id = %report.id, user_id = %user.id, error = %e, "User skipped");
                    outcome.record_failure(user.id, e.message);
                }
                Err(error) => {
                    return Err(RunFailure {
                        error,
                        outcome: Some(outcome),
                    });
                }
            }
        }

        Ok((outcome, rows))
    }

    async fn process_user(&self, report: &Report, user: &User) -> AppResult<SnapshotStats> {
        let aggregate = self.aggregator.aggregate(report, user).await?;
        let stats = aggregate.snapshot.stats();
        let trend = daily_completions(&report.range(), &aggregate.tasks);

        let html = user_report_html(&UserReportView {
            report,
            user,
            stats: &stats,
            trend: &trend,
        });
        let pdf = self.renderer.render_pdf(&html).await?;

        let path = paths::user_pdf(report.tenant_id, report.id, user.id);
        self.storage
            .upload(&path, pdf, paths::PDF_CONTENT_TYPE)
            .await?;
        self.store
            .set_snapshot_pdf(report.id, user.id, &self.storage.public_url(&path))
            .await?;

        Ok(stats)
    }

    async fn publish_artifacts(
        &self,
        report: &Report,
        rows: &[(User, SnapshotStats)],
        outcome: &BatchOutcome,
    ) -> AppResult<ReportArtifacts> {
        let mut workbook = WorkbookBuilder::new();
        for (user, stats) in rows {
            workbook.add_metrics_sheet(&user.display_name, stats);
        }
        let xlsx = workbook.build()?;

        let summary_rows: Vec<SummaryRow<'_>> = rows
            .iter()
            .map(|(user, stats)| SummaryRow { user, stats })
            .collect();
        let html = summary_html(&SummaryView {
            report,
            rows: &summary_rows,
            outcome,
        });
        let pdf = self.renderer.render_pdf(&html).await?;

        let workbook_path = paths::workbook(report.tenant_id, report.id);
        self.storage
            .upload(&workbook_path, xlsx, paths::XLSX_CONTENT_TYPE)
            .await?;
        let summary_path = paths::summary_pdf(report.tenant_id, report.id);
        self.storage
            .upload(&summary_path, pdf, paths::PDF_CONTENT_TYPE)
            .await?;

        Ok(ReportArtifacts {
            pdf_url: Some(self.storage.public_url(&summary_path)),
            excel_url: Some(self.storage.public_url(&workbook_path)),
        })
    }

    async fn record_failure(
        &self,
        report_id: ReportId,
        reason: &str,
        outcome: Option<&BatchOutcome>,
    ) {
        if let Err(e) = self.store.mark_failed(report_id, reason, outcome).await {
            error!(report_id = %report_id, error = %e, "Failed to mark report FAILED");
        } else {
            warn!(report_id = %report_id, reason, "Report FAILED");
        }
    }
}

fn parse_job(delivery: &Delivery) -> Result<ReportJob, JobExecutionError> {
    serde_json::from_value(delivery.payload.clone())
        .map_err(|e| JobExecutionError::Permanent(format!("Invalid report job payload: {e}")))
}

#[async_trait]
impl JobHandler for ReportJobHandler {
    fn job_name(&self) -> &str {
        GENERATE_REPORT_JOB
    }

    async fn execute(&self, delivery: &Delivery) -> Result<(), JobExecutionError> {
        let job = parse_job(delivery)?;

        match self.generate(&job).await {
            Ok(()) => Ok(()),
            Err(failure) => {
                self.record_failure(
                    job.report_id,
                    &failure.error.message,
                    failure.outcome.as_ref(),
                )
                .await;
                Err(JobExecutionError::from_app_error(failure.error))
            }
        }
    }

    async fn on_abandoned(&self, delivery: &Delivery, reason: &str) {
        if let Ok(job) = parse_job(delivery) {
            self.record_failure(job.report_id, reason, None).await;
        }
    }
}
