//! HTML templates of the report documents.
//!
//! Pages are styled for A4 print with background graphics. Every
//! interpolated value goes through [`escape_html`].

use taskhub_entity::report::{BatchOutcome, Report};
use taskhub_entity::snapshot::SnapshotStats;
use taskhub_entity::user::User;

use crate::trend::TrendPoint;

const STYLE: &str = r#"
@page { size: A4; margin: 16mm; }
* { -webkit-print-color-adjust: exact; print-color-adjust: exact; box-sizing: border-box; }
body { font-family: "Helvetica Neue", Arial, sans-serif; color: #1f2933; font-size: 12px; }
h1 { font-size: 20px; margin: 0 0 4px; }
.meta { color: #52606d; margin-bottom: 16px; }
.cards { display: flex; flex-wrap: wrap; gap: 8px; margin-bottom: 16px; }
.card { background: #eef2ff; border-radius: 6px; padding: 8px 12px; min-width: 120px; }
.card .label { color: #52606d; font-size: 10px; text-transform: uppercase; }
.card .value { font-size: 18px; font-weight: 600; }
table { width: 100%; border-collapse: collapse; }
th, td { text-align: left; padding: 4px 6px; border-bottom: 1px solid #e4e7eb; }
th { background: #f5f7fa; }
.bar { background: #4c6ef5; height: 10px; border-radius: 2px; }
.failed { color: #c92a2a; }
"#;

/// Data of a per-user report page.
#[derive(Debug, Clone, Copy)]
pub struct UserReportView<'a> {
    /// Parent report.
    pub report: &'a Report,
    /// Subject of the page.
    pub user: &'a User,
    /// Aggregated figures.
    pub stats: &'a SnapshotStats,
    /// Completed tasks per day.
    pub trend: &'a [TrendPoint],
}

/// One line of the team summary.
#[derive(Debug, Clone, Copy)]
pub struct SummaryRow<'a> {
    /// The user.
    pub user: &'a User,
    /// Their figures.
    pub stats: &'a SnapshotStats,
}

/// Data of the team summary document.
#[derive(Debug, Clone, Copy)]
pub struct SummaryView<'a> {
    /// The report.
    pub report: &'a Report,
    /// Users with a stored snapshot.
    pub rows: &'a [SummaryRow<'a>],
    /// Per-user results of the run.
    pub outcome: &'a BatchOutcome,
}

/// Escape text for HTML element and attribute content.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\"><head><meta charset=\"utf-8\">\
         <title>{}</title><style>{STYLE}</style></head><body>{body}</body></html>\n",
        escape_html(title)
    )
}

fn meta_line(report: &Report) -> String {
    format!(
        "<div class=\"meta\">{} report, {} to {}</div>",
        report.report_type, report.from_date, report.to_date
    )
}

fn card(label: &str, value: impl std::fmt::Display) -> String {
    format!(
        "<div class=\"card\"><div class=\"label\">{}</div><div class=\"value\">{}</div></div>",
        escape_html(label),
        escape_html(&value.to_string())
    )
}

fn trend_table(trend: &[TrendPoint]) -> String {
    let max = trend.iter().map(|p| p.count).max().unwrap_or(0).max(1);
    let mut rows = String::new();
    for point in trend {
        let width = point.count * 100 / max;
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td><div class=\"bar\" style=\"width:{width}%\"></div></td></tr>",
            point.date, point.count
        ));
    }
    format!(
        "<h2>Completed tasks per day</h2><table><thead><tr><th>Date</th><th>Done</th>\
         <th></th></tr></thead><tbody>{rows}</tbody></table>"
    )
}

/// HTML of one user's report page.
pub fn user_report_html(view: &UserReportView<'_>) -> String {
    let stats = view.stats;
    let mut body = format!(
        "<h1>{}</h1>{}<div class=\"cards\">",
        escape_html(&view.user.display_name),
        meta_line(view.report)
    );
    body.push_str(&card("Total tasks", stats.total_tasks));
    body.push_str(&card("Completed", stats.completed_tasks));
    body.push_str(&card("To do", stats.todo_tasks));
    body.push_str(&card("Working", stats.working_tasks));
    body.push_str(&card("Total hours", stats.total_hours));
    body.push_str(&card("Avg daily hours", format!("{:.2}", stats.avg_daily_hours)));
    body.push_str(&card("Completion rate", format!("{}%", stats.completion_rate)));
    body.push_str(&card("Productivity", format!("{:.1}", stats.productivity_score)));
    body.push_str("</div>");
    body.push_str(&trend_table(view.trend));

    page(&format!("Report: {}", view.user.display_name), &body)
}

/// HTML of the team summary document.
pub fn summary_html(view: &SummaryView<'_>) -> String {
    let mut body = format!("<h1>Team report</h1>{}", meta_line(view.report));
    body.push_str(
        "<table><thead><tr><th>Employee</th><th>Tasks</th><th>Done</th><th>To do</th>\
         <th>Working</th><th>Hours</th><th>Avg/day</th><th>Completion</th></tr></thead><tbody>",
    );
    for row in view.rows {
        let s = row.stats;
        body.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>\
             <td>{:.2}</td><td>{}%</td></tr>",
            escape_html(&row.user.display_name),
            s.total_tasks,
            s.completed_tasks,
            s.todo_tasks,
            s.working_tasks,
            s.total_hours,
            s.avg_daily_hours,
            s.completion_rate
        ));
    }
    body.push_str("</tbody></table>");

    if !view.outcome.failed.is_empty() {
        body.push_str("<h2 class=\"failed\">Not included</h2><ul>");
        for failure in &view.outcome.failed {
            body.push_str(&format!(
                "<li class=\"failed\">{}: {}</li>",
                failure.user_id,
                escape_html(&failure.error)
            ));
        }
        body.push_str("</ul>");
    }

    page("Team report", &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use taskhub_core::types::{DateRange, TenantId, UserId};
    use taskhub_entity::report::{CreateReport, ReportScope, ReportType};
    use taskhub_entity::user::UserRole;

    fn report() -> Report {
        CreateReport {
            tenant_id: TenantId::new(),
            report_type: ReportType::Weekly,
            scope: ReportScope::Team,
            requested_by: UserId::new(),
            employee_ids: Vec::new(),
            range: DateRange::unchecked(
                NaiveDate::from_ymd_opt(2024, 1, 1).expect("date"),
                NaiveDate::from_ymd_opt(2024, 1, 2).expect("date"),
            ),
        }
        .into_report(Utc::now())
    }

    fn user(name: &str) -> User {
        User {
            id: UserId::new(),
            tenant_id: TenantId::new(),
            email: "a@example.com".to_string(),
            display_name: name.to_string(),
            role: UserRole::Operator,
            manager_id: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn stats() -> SnapshotStats {
        SnapshotStats {
            total_tasks: 3,
            completed_tasks: 2,
            todo_tasks: 1,
            working_tasks: 0,
            total_minutes: 600.0,
            total_hours: 10,
            avg_daily_hours: 2.0,
            completion_rate: 67,
            productivity_score: 77.0,
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_user_page_is_a4_and_escaped() {
        let report = report();
        let user = user("<script>alert(1)</script>");
        let stats = stats();
        let trend = [TrendPoint {
            date: report.from_date,
            count: 2,
        }];
        let html = user_report_html(&UserReportView {
            report: &report,
            user: &user,
            stats: &stats,
            trend: &trend,
        });

        assert!(html.contains("size: A4"));
        assert!(html.contains("print-color-adjust: exact"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("67%"));
        assert!(html.contains("width:100%"));
    }

    #[test]
    fn test_summary_lists_failures() {
        let report = report();
        let alice = user("Alice");
        let stats = stats();
        let mut outcome = BatchOutcome::default();
        outcome.record_success(alice.id);
        outcome.record_failure(UserId::new(), "Render timed out after 30 seconds");

        let rows = [SummaryRow {
            user: &alice,
            stats: &stats,
        }];
        let html = summary_html(&SummaryView {
            report: &report,
            rows: &rows,
            outcome: &outcome,
        });
        assert!(html.contains("Alice"));
        assert!(html.contains("Not included"));
        assert!(html.contains("Render timed out"));
    }
}
