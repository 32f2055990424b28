//! Resolution of the users covered by a report.

use taskhub_core::error::AppError;
use taskhub_core::result::AppResult;
use taskhub_core::types::UserId;
use taskhub_database::ReportStore;
use taskhub_entity::report::{Report, ReportScope};
use taskhub_entity::user::{User, UserRole};

/// Users covered by `report` when generated with `scope` and
/// `employee_ids`.
///
/// The requester's role decides the TEAM membership. For EMPLOYEE scope
/// every listed id must exist in the tenant; ids the requester may not
/// see are dropped. An empty list means the requester alone.
pub async fn resolve_scope(
    store: &dyn ReportStore,
    report: &Report,
    scope: ReportScope,
    employee_ids: &[UserId],
) -> AppResult<Vec<User>> {
    let requester = store
        .find_user(report.requested_by)
        .await?
        .filter(|user| user.tenant_id == report.tenant_id)
        .ok_or_else(|| {
            AppError::not_found(format!(
                "Requesting user {} not found in tenant {}",
                report.requested_by, report.tenant_id
            ))
        })?;

    match scope {
        ReportScope::Team => match requester.role {
            UserRole::ProjectManager => {
                store
                    .list_team_members(
                        report.tenant_id,
                        &[UserRole::Manager, UserRole::Operator],
                        None,
                    )
                    .await
            }
            UserRole::Manager => {
                store
                    .list_team_members(report.tenant_id, &[UserRole::Operator], Some(requester.id))
                    .await
            }
            UserRole::Operator => Err(AppError::authorization(format!(
                "User {} with role {} cannot generate TEAM reports",
                requester.id, requester.role
            ))),
        },
        ReportScope::Employee => {
            if employee_ids.is_empty() {
                return Ok(vec![requester]);
            }

            let mut wanted = employee_ids.to_vec();
            wanted.sort();
            wanted.dedup();

            let users = store.find_users(report.tenant_id, &wanted).await?;
            if let Some(missing) = wanted
                .iter()
                .find(|id| !users.iter().any(|user| user.id == **id))
            {
                return Err(AppError::not_found(format!(
                    "Employee {missing} not found in tenant {}",
                    report.tenant_id
                )));
            }

            Ok(users
                .into_iter()
                .filter(|user| requester.can_see(user))
                .collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use taskhub_core::error::ErrorKind;
    use taskhub_core::types::{DateRange, TenantId};
    use taskhub_database::MemoryReportStore;
    use taskhub_entity::report::{CreateReport, ReportType};

    struct Fixture {
        store: MemoryReportStore,
        tenant: TenantId,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: MemoryReportStore::new(),
                tenant: TenantId::new(),
            }
        }

        fn user(&self, name: &str, role: UserRole, manager: Option<UserId>) -> User {
            let user = User {
                id: UserId::new(),
                tenant_id: self.tenant,
                email: format!("{}@example.com", name.to_lowercase()),
                display_name: name.to_string(),
                role,
                manager_id: manager,
                is_active: true,
                created_at: Utc::now(),
            };
            self.store.insert_user(user.clone()).expect("seed user");
            user
        }

        fn report(&self, requester: &User, scope: ReportScope, ids: Vec<UserId>) -> Report {
            let date = |d| NaiveDate::from_ymd_opt(2024, 1, d).expect("date");
            let report = CreateReport {
                tenant_id: self.tenant,
                report_type: ReportType::Weekly,
                scope,
                requested_by: requester.id,
                employee_ids: ids,
                range: DateRange::unchecked(date(1), date(7)),
            }
            .into_report(Utc::now());
            self.store.insert_report(report.clone()).expect("seed report");
            report
        }

        async fn resolve(&self, report: &Report) -> AppResult<Vec<User>> {
            resolve_scope(&self.store, report, report.scope, &report.employee_ids).await
        }
    }

    fn names(users: &[User]) -> Vec<&str> {
        users.iter().map(|u| u.display_name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_manager_team_is_own_active_operators() {
        let fx = Fixture::new();
        let manager = fx.user("Maya", UserRole::Manager, None);
        fx.user("Ada", UserRole::Operator, Some(manager.id));
        fx.user("Ben", UserRole::Operator, Some(manager.id));
        fx.user("Cyd", UserRole::Operator, Some(UserId::new()));
        let mut inactive = fx.user("Dov", UserRole::Operator, Some(manager.id));
        inactive.is_active = false;
        fx.store.insert_user(inactive).expect("seed");

        let report = fx.report(&manager, ReportScope::Team, Vec::new());
        let users = fx.resolve(&report).await.expect("scope");
        assert_eq!(names(&users), vec!["Ada", "Ben"]);
    }

    #[tokio::test]
    async fn test_project_manager_team_is_managers_and_operators() {
        let fx = Fixture::new();
        let pm = fx.user("Pat", UserRole::ProjectManager, None);
        let manager = fx.user("Maya", UserRole::Manager, None);
        fx.user("Ada", UserRole::Operator, Some(manager.id));

        let report = fx.report(&pm, ReportScope::Team, Vec::new());
        let users = fx.resolve(&report).await.expect("scope");
        assert_eq!(names(&users), vec!["Ada", "Maya"]);
    }

    #[tokio::test]
    async fn test_operator_team_is_forbidden() {
        let fx = Fixture::new();
        let op = fx.user("Olga", UserRole::Operator, None);
        let report = fx.report(&op, ReportScope::Team, Vec::new());
        let err = fx.resolve(&report).await.expect_err("forbidden");
        assert_eq!(err.kind, ErrorKind::Authorization);
    }

    #[tokio::test]
    async fn test_empty_employee_list_means_requester() {
        let fx = Fixture::new();
        let op = fx.user("Olga", UserRole::Operator, None);
        let report = fx.report(&op, ReportScope::Employee, Vec::new());
        let users = fx.resolve(&report).await.expect("scope");
        assert_eq!(names(&users), vec!["Olga"]);
    }

    #[tokio::test]
    async fn test_unknown_employee_fails() {
        let fx = Fixture::new();
        let manager = fx.user("Maya", UserRole::Manager, None);
        let own = fx.user("Ada", UserRole::Operator, Some(manager.id));
        let report = fx.report(&manager, ReportScope::Employee, vec![own.id, UserId::new()]);
        let err = fx.resolve(&report).await.expect_err("unknown id");
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_invisible_employees_are_dropped() {
        let fx = Fixture::new();
        let manager = fx.user("Maya", UserRole::Manager, None);
        let own = fx.user("Ada", UserRole::Operator, Some(manager.id));
        let other = fx.user("Cyd", UserRole::Operator, Some(UserId::new()));
        let report = fx.report(
            &manager,
            ReportScope::Employee,
            vec![other.id, own.id, manager.id],
        );
        let users = fx.resolve(&report).await.expect("scope");
        assert_eq!(names(&users), vec!["Ada", "Maya"]);
    }

    #[tokio::test]
    async fn test_missing_requester_fails() {
        let fx = Fixture::new();
        let ghost = User {
            id: UserId::new(),
            tenant_id: fx.tenant,
            email: "ghost@example.com".to_string(),
            display_name: "Ghost".to_string(),
            role: UserRole::Manager,
            manager_id: None,
            is_active: true,
            created_at: Utc::now(),
        };
        let report = fx.report(&ghost, ReportScope::Team, Vec::new());
        let err = fx.resolve(&report).await.expect_err("missing requester");
        assert_eq!(err.kind, ErrorKind::NotFound);
    }
}
