//! Alert emails for the administrator.
//!
//! Every send is best-effort: a transport error is logged and never
//! propagated to the caller.

use std::sync::Arc;

use tracing::{error, info, warn};

use taskhub_core::traits::mailer::{EmailMessage, EmailTransport};
use taskhub_core::traits::queue::Delivery;
use taskhub_database::ReportStore;
use taskhub_entity::job::ReportJob;
use taskhub_entity::report::ReportStatusKind;
use taskhub_render::template::escape_html;

use super::supervisor::SupervisorSignal;

const SUBJECT_PREFIX: &str = "[TaskHub]";

/// Builds and sends failure alerts.
#[derive(Debug, Clone)]
pub struct FailureNotifier {
    /// Delivery channel.
    transport: Arc<dyn EmailTransport>,
    /// Used to re-check a report before alerting on a lost lease.
    store: Arc<dyn ReportStore>,
    /// Recipient of every alert.
    admin_email: String,
    /// Name of this worker process.
    worker_name: String,
    /// Queue the worker consumes.
    queue_name: String,
}

impl FailureNotifier {
    /// Creates a new notifier.
    pub fn new(
        transport: Arc<dyn EmailTransport>,
        store: Arc<dyn ReportStore>,
        admin_email: impl Into<String>,
        worker_name: impl Into<String>,
        queue_name: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            store,
            admin_email: admin_email.into(),
            worker_name: worker_name.into(),
            queue_name: queue_name.into(),
        }
    }

    /// Name of this worker process.
    pub fn worker_name(&self) -> &str {
        &self.worker_name
    }

    /// A job exhausted its attempts.
    pub async fn job_failed(&self, delivery: &Delivery, error: &str) {
        let subject = format!(
            "{SUBJECT_PREFIX} Job {} failed on {}",
            delivery.job_id, delivery.queue
        );
        let html = self.job_body("Report job failed", delivery, error);
        self.send(subject, html).await;
    }

    /// A job task panicked.
    pub async fn job_panicked(&self, delivery: &Delivery, message: &str) {
        let subject = format!(
            "{SUBJECT_PREFIX} Job {} panicked on {}",
            delivery.job_id, delivery.queue
        );
        let html = self.job_body("Report job panicked", delivery, message);
        self.send(subject, html).await;
    }

    /// The lease of a job vanished while it was processed.
    ///
    /// Returns `false` without sending when the report turns out to be
    /// READY, since the work was completed.
    pub async fn lease_lost(&self, delivery: &Delivery, error: &str) -> bool {
        if self.report_is_ready(delivery).await {
            warn!(
                job_id = %delivery.job_id,
                error,
                "Lease lost after the report became READY; no alert sent"
            );
            return false;
        }

        let subject = format!(
            "{SUBJECT_PREFIX} Job {} lease lost on {}",
            delivery.job_id, delivery.queue
        );
        let html = self.job_body("Report job lease lost", delivery, error);
        self.send(subject, html).await;
        true
    }

    /// A job's lease expired on its last attempt and the queue gave up on it.
    ///
    /// Like [`Self::lease_lost`], stays quiet when the report is READY.
    pub async fn job_stalled(&self, delivery: &Delivery, error: &str) -> bool {
        if self.report_is_ready(delivery).await {
            warn!(job_id = %delivery.job_id, error, "Stalled job already produced a READY report");
            return false;
        }
        self.job_failed(delivery, error).await;
        true
    }

    /// A connection state transition of the queue backend.
    pub async fn connection_changed(&self, signal: &SupervisorSignal) {
        let (subject, html) = match signal {
            SupervisorSignal::WentDown(message) => (
                format!("{SUBJECT_PREFIX} Queue connection lost on {}", self.worker_name),
                format!(
                    "<h2>Queue connection lost</h2>{}<p>{}</p>",
                    self.identity_table(),
                    escape_html(message)
                ),
            ),
            SupervisorSignal::Recovered => (
                format!(
                    "{SUBJECT_PREFIX} Queue connection restored on {}",
                    self.worker_name
                ),
                format!(
                    "<h2>Queue connection restored</h2>{}",
                    self.identity_table()
                ),
            ),
        };
        self.send(subject, html).await;
    }

    /// The process is about to exit because of `what` (a panic or a fatal
    /// error).
    pub async fn process_failure(&self, what: &str, message: &str) {
        let subject = format!("{SUBJECT_PREFIX} Worker {} {what}", self.worker_name);
        let html = format!(
            "<h2>Worker {}</h2>{}<pre>{}</pre>",
            escape_html(what),
            self.identity_table(),
            escape_html(message)
        );
        self.send(subject, html).await;
    }

    async fn report_is_ready(&self, delivery: &Delivery) -> bool {
        let Ok(job) = serde_json::from_value::<ReportJob>(delivery.payload.clone()) else {
            return false;
        };
        match self.store.find_report(job.report_id).await {
            Ok(Some(report)) => report.status == ReportStatusKind::Ready,
            Ok(None) => false,
            Err(e) => {
                warn!(report_id = %job.report_id, error = %e, "Could not re-check report state");
                false
            }
        }
    }

    fn identity_table(&self) -> String {
        format!(
            "<table><tr><th>Worker</th><td>{}</td></tr><tr><th>Queue</th><td>{}</td></tr></table>",
            escape_html(&self.worker_name),
            escape_html(&self.queue_name)
        )
    }

    fn job_body(&self, title: &str, delivery: &Delivery, error: &str) -> String {
        let payload = serde_json::to_string_pretty(&delivery.payload)
            .unwrap_or_else(|_| delivery.payload.to_string());
        format!(
            "<h2>{}</h2><table>\
             <tr><th>Worker</th><td>{}</td></tr>\
             <tr><th>Queue</th><td>{}</td></tr>\
             <tr><th>Job</th><td>{}</td></tr>\
             <tr><th>Attempts</th><td>{} of {}</td></tr>\
             <tr><th>Error</th><td>{}</td></tr>\
             </table><h3>Payload</h3><pre>{}</pre>",
            escape_html(title),
            escape_html(&self.worker_name),
            escape_html(&delivery.queue),
            escape_html(&delivery.job_id),
            delivery.attempt,
            delivery.max_attempts,
            escape_html(error),
            escape_html(&payload)
        )
    }

    async fn send(&self, subject: String, html: String) {
        let message = EmailMessage {
            to: self.admin_email.clone(),
            subject,
            html,
        };
        match self.transport.send(&message).await {
            Ok(()) => info!(
                subject = %message.subject,
                transport = self.transport.transport_type(),
                "Alert sent"
            ),
            Err(e) => error!(subject = %message.subject, error = %e, "Failed to send alert"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Utc;
    use taskhub_core::error::AppError;
    use taskhub_core::result::AppResult;
    use taskhub_core::types::ReportId;
    use taskhub_database::MemoryReportStore;

    #[derive(Debug, Default)]
    struct Recording {
        sent: Mutex<Vec<EmailMessage>>,
        fail: bool,
    }

    #[async_trait]
    impl EmailTransport for Recording {
        fn transport_type(&self) -> &str {
            "recording"
        }

        async fn send(&self, message: &EmailMessage) -> AppResult<()> {
            if self.fail {
                return Err(AppError::external_service("mail API down"));
            }
            self.sent.lock().expect("lock").push(message.clone());
            Ok(())
        }
    }

    fn delivery() -> Delivery {
        Delivery {
            queue: "report-generation".to_string(),
            job_id: "job-1".to_string(),
            name: "generate-report".to_string(),
            payload: serde_json::json!({ "reportId": ReportId::new(), "note": "<b>" }),
            attempt: 1,
            max_attempts: 1,
            token: "t".to_string(),
            reserved_at: Utc::now(),
        }
    }

    fn notifier(transport: Arc<Recording>) -> FailureNotifier {
        FailureNotifier::new(
            transport,
            Arc::new(MemoryReportStore::new()),
            "ops@example.com",
            "worker-1",
            "report-generation",
        )
    }

    #[tokio::test]
    async fn test_job_failed_body_contains_error_and_escaped_payload() {
        let transport = Arc::new(Recording::default());
        notifier(transport.clone())
            .job_failed(&delivery(), "Failed to launch <chromium>")
            .await;

        let sent = transport.sent.lock().expect("lock");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "ops@example.com");
        assert!(sent[0].subject.contains("job-1"));
        assert!(sent[0].html.contains("Failed to launch &lt;chromium&gt;"));
        assert!(sent[0].html.contains("&quot;note&quot;: &quot;&lt;b&gt;&quot;"));
        assert!(sent[0].html.contains("1 of 1"));
    }

    #[tokio::test]
    async fn test_transport_errors_are_swallowed() {
        let transport = Arc::new(Recording {
            fail: true,
            ..Recording::default()
        });
        notifier(transport.clone()).job_failed(&delivery(), "boom").await;
        assert!(transport.sent.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn test_lease_lost_for_unknown_report_alerts() {
        let transport = Arc::new(Recording::default());
        let sent = notifier(transport.clone())
            .lease_lost(&delivery(), "Missing lock for job job-1")
            .await;
        assert!(sent);
        let sent = transport.sent.lock().expect("lock");
        assert!(sent[0].subject.contains("lease lost"));
    }
}
